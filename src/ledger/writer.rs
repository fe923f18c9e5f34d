//! 结果写入任务
//!
//! 唯一持有账本文件句柄的任务，所有 `Outcome` 通过同一个通道汇入这里

use crate::error::LedgerError;
use crate::infrastructure::WorkTracker;
use crate::ledger::Ledger;
use crate::models::Outcome;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// 运行统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// 账本路径
    pub ledger_path: PathBuf,
    /// 上传成功
    pub uploaded: usize,
    /// 上传失败
    pub failed: usize,
    /// 恢复运行时跳过
    pub skipped: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.uploaded + self.failed + self.skipped
    }
}

/// 启动结果写入任务
///
/// 所有发送端关闭后任务结束，并返回统计信息。写入失败时立刻返回错误
pub fn spawn_writer(
    ledger: Ledger,
    outcomes: mpsc::Receiver<Outcome>,
    tracker: Arc<WorkTracker>,
) -> JoinHandle<Result<RunSummary, LedgerError>> {
    tokio::spawn(write_outcomes(ledger, outcomes, tracker))
}

async fn write_outcomes(
    mut ledger: Ledger,
    mut outcomes: mpsc::Receiver<Outcome>,
    tracker: Arc<WorkTracker>,
) -> Result<RunSummary, LedgerError> {
    let mut summary = RunSummary::default();

    while let Some(outcome) = outcomes.recv().await {
        let record = outcome.record();
        match &outcome {
            Outcome::Finished { result: Ok(()), .. } => {
                debug!("✅ 记录: {}", record);
                summary.uploaded += 1;
                ledger.append(&record).await?;
            }
            Outcome::Finished { result: Err(_), .. } => {
                debug!("❌ 记录: {}", record);
                summary.failed += 1;
                ledger.append(&record).await?;
            }
            // 账本里已有这条 200 记录，不再重复写入
            Outcome::AlreadyUploaded { .. } => {
                summary.skipped += 1;
            }
        }
        tracker.complete();
    }

    summary.ledger_path = ledger.close().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use crate::error::SampleError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_one_line_per_finished_outcome() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::create(dir.path(), &RunOptions::default())
            .await
            .unwrap();
        let tracker = Arc::new(WorkTracker::new());
        let (tx, rx) = mpsc::channel(4);
        let handle = spawn_writer(ledger, rx, tracker.clone());

        for _ in 0..3 {
            tracker.register();
        }
        tx.send(Outcome::Finished {
            sample: "a.txt".into(),
            result: Ok(()),
        })
        .await
        .unwrap();
        tx.send(Outcome::Finished {
            sample: "b.txt".into(),
            result: Err(SampleError::Rejected { status: 500 }),
        })
        .await
        .unwrap();
        tx.send(Outcome::AlreadyUploaded {
            sample: "c.txt".into(),
        })
        .await
        .unwrap();

        tracker.wait_idle().await;
        drop(tx);
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 3);

        let contents = std::fs::read_to_string(&summary.ledger_path).unwrap();
        let records: Vec<&str> = contents.lines().skip(1).collect();
        assert_eq!(records, vec!["a.txt\t200", "b.txt\t500"]);
    }
}
