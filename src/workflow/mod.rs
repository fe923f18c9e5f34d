pub mod sample_ctx;
pub mod upload_flow;

pub use sample_ctx::SampleCtx;
pub use upload_flow::UploadFlow;
