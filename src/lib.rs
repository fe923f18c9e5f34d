//! # Sample Pusher
//!
//! 把样本批量上传到网关的命令行工具，支持通过进度账本断点续传
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有进程级共享资源，只暴露能力
//! - `build_client` - 全局唯一的 HTTP 客户端
//! - `WorkTracker` - 工作单元完成计数
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个样本
//! - `ContentResolver` - 本地文件 / 备用内容服务器获取内容
//! - `request_builder` - 构建 multipart 上传请求
//! - `Uploader` - 发送到网关并读完响应
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个样本"的完整处理流程
//! - `SampleCtx` - 上下文封装（worker 编号 + 样本标识）
//! - `UploadFlow` - 流程编排（获取内容 → 上传 → 结果）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 发现、队列、worker 池与账本的调度
//! - `orchestrator/worker_pool` - 固定数量的 worker
//!
//! 另外：
//! - `discovery/` - 样本列表与目录遍历
//! - `ledger/` - 进度账本（首行参数 + 每行结果）及唯一写入任务
//!
//! ## 模块结构

pub mod config;
pub mod discovery;
pub mod error;
pub mod infrastructure;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Args, Config, RunOptions};
pub use error::{AppError, AppResult};
pub use ledger::{Ledger, RunSummary};
pub use models::{Outcome, OutcomeRecord, UploadMetadata};
pub use orchestrator::App;
pub use workflow::{SampleCtx, UploadFlow};
