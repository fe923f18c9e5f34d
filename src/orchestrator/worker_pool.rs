//! Worker 池 - 编排层
//!
//! 固定数量的 worker 共享一个有界工作队列，
//! 每取出一个样本就跑一遍上传流程，并把唯一的结果交给账本写入任务

use crate::models::Outcome;
use crate::workflow::{SampleCtx, UploadFlow};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error};

/// 启动 `count` 个 worker
///
/// 队列关闭且取空后 worker 自行退出
pub fn spawn_workers(
    count: usize,
    queue: mpsc::Receiver<String>,
    flow: Arc<UploadFlow>,
    outcomes: mpsc::Sender<Outcome>,
) -> JoinSet<()> {
    let queue = Arc::new(Mutex::new(queue));
    let mut workers = JoinSet::new();

    for worker_id in 1..=count {
        debug!("启动 worker #{}", worker_id);
        workers.spawn(worker_loop(
            worker_id,
            queue.clone(),
            flow.clone(),
            outcomes.clone(),
        ));
    }

    workers
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    flow: Arc<UploadFlow>,
    outcomes: mpsc::Sender<Outcome>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(sample) = next else {
            break;
        };

        let ctx = SampleCtx::new(worker_id, sample);
        let outcome = flow.run(&ctx).await;

        if outcomes.send(outcome).await.is_err() {
            error!("{} 账本写入任务已退出，worker 停止", ctx);
            break;
        }
    }
    debug!("worker #{} 退出", worker_id);
}
