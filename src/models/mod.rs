pub mod outcome;
pub mod upload;

pub use outcome::{Outcome, OutcomeRecord};
pub use upload::UploadMetadata;
