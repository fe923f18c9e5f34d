//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量样本处理器
//! - 管理应用生命周期（初始化、运行、收尾）
//! - 启动账本写入任务、worker 池和发现阶段
//! - 等待所有工作单元完成后关闭账本
//! - 输出全局统计信息
//!
//! ### `worker_pool` - Worker 池
//! - 固定数量的 worker 从有界队列中取样本
//! - 每个样本交给 `workflow::UploadFlow`，结果交给账本写入任务
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (发现 → 队列 → worker → 账本)
//!     ↓
//! worker_pool (处理队列中的样本)
//!     ↓
//! workflow::UploadFlow (处理单个样本)
//!     ↓
//! services (能力层：内容获取 / 请求构建 / 上传)
//!     ↓
//! infrastructure (基础设施：HTTP 客户端 / 完成计数)
//! ```

pub mod batch_processor;
pub mod worker_pool;

// 重新导出主要类型
pub use batch_processor::App;
