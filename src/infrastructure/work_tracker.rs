//! 工作单元计数 - 基础设施层
//!
//! 每个进入流水线的样本登记一次，结果落盘后完成一次；
//! 编排层在发现阶段结束后等待计数归零

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// 未完成工作单元计数器
#[derive(Debug, Default)]
pub struct WorkTracker {
    outstanding: AtomicUsize,
    registered: AtomicUsize,
    idle: Notify,
}

impl WorkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个工作单元，必须在投递之前调用
    pub fn register(&self) {
        self.registered.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    /// 完成一个工作单元
    pub fn complete(&self) {
        let previous = self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "complete() without matching register()");
        if previous == 1 {
            self.idle.notify_waiters();
        }
    }

    /// 当前未完成数量
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// 累计登记数量
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    /// 等待所有已登记的工作单元完成
    ///
    /// 只有在不会再有新的登记之后调用才有意义
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // 先注册等待，再检查计数，避免错过通知
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}
