//! 批量样本处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源管理和并发调度。
//!
//! ## 核心功能
//!
//! 1. **启动前检查**：恢复账本、解析配置、打开样本来源、创建新账本
//! 2. **并发控制**：固定数量的 worker，有界工作队列
//! 3. **完成计数**：`WorkTracker` 确保每个登记的样本都有结果落盘
//! 4. **资源管理**：唯一持有账本的写入任务在所有结果落盘后关闭账本
//! 5. **全局统计**：汇总所有样本的处理结果
//!
//! ## 失败处理
//!
//! 单个样本的失败只会变成一条记录；只有配置错误和账本错误会终止运行

use crate::config::{Args, Config, RunOptions};
use crate::discovery::{ContentClassifier, Discovery, DiscoveryStats, Dispatch, FileCommandClassifier};
use crate::error::{AppError, AppResult, LedgerError};
use crate::infrastructure::{build_client, WorkTracker};
use crate::ledger::{spawn_writer, Ledger, RunSummary, SkipSet};
use crate::models::Outcome;
use crate::orchestrator::worker_pool;
use crate::utils::logging::{log_startup, print_final_stats};
use crate::utils::prompt;
use crate::workflow::UploadFlow;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    client: Client,
    ledger: Ledger,
    discovery: Discovery,
}

impl App {
    /// 初始化应用
    ///
    /// 使用系统 `file` 命令识别内容类型，未给出 `--pw` 时在终端提示输入
    pub async fn initialize(args: Args) -> AppResult<Self> {
        Self::initialize_with(args, Arc::new(FileCommandClassifier::new()), || {
            prompt::read_password("请输入网关密码: ")
        })
        .await
    }

    /// 使用自定义识别器和密码来源初始化应用
    pub async fn initialize_with<F>(
        args: Args,
        classifier: Arc<dyn ContentClassifier>,
        prompt_password: F,
    ) -> AppResult<Self>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        // 恢复运行：先读账本，拿到上次的参数和已成功样本
        let (persisted, resumed, skip): (Option<RunOptions>, Option<Ledger>, SkipSet) =
            match &args.resume {
                Some(path) => {
                    let replay = Ledger::resume(path).await?;
                    (Some(replay.options), Some(replay.ledger), replay.skip)
                }
                None => (None, None, SkipSet::new()),
            };

        let config = Config::resolve(args, persisted, prompt_password)?;
        log_startup(&config);

        let client = build_client(config.options.insecure)?;
        let discovery = Discovery::prepare(&config.options, classifier, Arc::new(skip))?;

        // 所有检查通过后才创建新账本
        let ledger = match resumed {
            Some(ledger) => ledger,
            None => Ledger::create(&config.log_dir, &config.options).await?,
        };

        Ok(Self {
            config,
            client,
            ledger,
            discovery,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> AppResult<RunSummary> {
        if !self.discovery.has_sources() {
            warn!("⚠️ 没有指定 --file 或 --dir，没有需要上传的样本");
        }

        let workers = self.config.workers;
        let tracker = Arc::new(WorkTracker::new());
        let (queue_tx, queue_rx) = mpsc::channel::<String>(workers);
        let (outcome_tx, outcome_rx) = mpsc::channel::<Outcome>(workers * 2);

        let mut writer = spawn_writer(self.ledger, outcome_rx, tracker.clone());

        // worker 在发现阶段开始之前启动
        info!("📤 正在上传样本...");
        let flow = Arc::new(UploadFlow::new(&self.config, self.client));
        let mut pool = worker_pool::spawn_workers(workers, queue_rx, flow, outcome_tx.clone());

        let dispatch = Dispatch {
            queue: queue_tx,
            outcomes: outcome_tx,
            tracker: tracker.clone(),
        };
        let discovery = self.discovery;
        // 任务结束时 dispatch 被释放，工作队列随之关闭
        let mut discovery_task = tokio::task::spawn_blocking(move || discovery.run(&dispatch));

        // 等待发现阶段结束；期间账本写入失败则立即退出
        let discovered: AppResult<DiscoveryStats> = tokio::select! {
            discovered = &mut discovery_task => discovered
                .map_err(AppError::from)
                .and_then(|stats| stats.map_err(AppError::from)),
            written = &mut writer => return writer_exit(written),
        };
        // 发现阶段中途失败时，已登记的样本仍然要处理完并落盘
        match &discovered {
            Ok(stats) => info!(
                "✓ 发现阶段完成: 投递 {} 个, 跳过 {} 个, 过滤 {} 个, 出错 {} 个",
                stats.queued, stats.skipped, stats.filtered, stats.errors
            ),
            Err(e) => error!("❌ 发现阶段中止: {}，等待已投递的样本完成", e),
        }

        // 等待所有登记的样本都有结果落盘
        tokio::select! {
            _ = tracker.wait_idle() => {}
            written = &mut writer => return writer_exit(written),
        }
        debug!("所有工作单元已完成: {}", tracker.registered());

        while let Some(joined) = pool.join_next().await {
            joined?;
        }

        let summary = writer_exit(writer.await)?;
        debug_assert_eq!(summary.total(), tracker.registered());

        print_final_stats(&summary);
        discovered?;
        Ok(summary)
    }
}

/// 账本写入任务的退出结果
fn writer_exit(
    joined: Result<Result<RunSummary, LedgerError>, JoinError>,
) -> AppResult<RunSummary> {
    joined?.map_err(AppError::from)
}
