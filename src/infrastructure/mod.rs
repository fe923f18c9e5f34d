//! 基础设施层
//!
//! 持有进程级共享资源，只暴露能力

pub mod http_client;
pub mod work_tracker;

pub use http_client::build_client;
pub use work_tracker::WorkTracker;
