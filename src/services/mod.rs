pub mod content_resolver;
pub mod request_builder;
pub mod uploader;

pub use content_resolver::{ContentResolver, RemoteRef, ResolvedContent};
pub use uploader::Uploader;
