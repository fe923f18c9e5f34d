//! 样本处理上下文
//!
//! 封装"哪个 worker 正在处理哪个样本"这一信息

use std::fmt::Display;

/// 样本处理上下文
#[derive(Debug, Clone)]
pub struct SampleCtx {
    /// worker 编号（仅用于日志显示）
    pub worker_id: usize,

    /// 样本标识
    pub sample: String,
}

impl SampleCtx {
    pub fn new(worker_id: usize, sample: String) -> Self {
        Self { worker_id, sample }
    }
}

impl Display for SampleCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[worker #{} 样本 {}]", self.worker_id, self.sample)
    }
}
