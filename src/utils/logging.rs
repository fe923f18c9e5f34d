/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use crate::config::Config;
use crate::ledger::RunSummary;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化 tracing，默认级别 `sample_pusher=info`，可用 `RUST_LOG` 覆盖
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "sample_pusher=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 样本上传模式");
    info!("🌐 网关: {}", config.options.gateway_uri);
    if let Some(cfs) = config.fallback_base() {
        info!("🗄️ 备用内容服务器: {}", cfs);
    }
    info!("📊 worker 数量: {}", config.workers);
    if let Some(resume) = &config.resume {
        info!("🔁 恢复账本: {}", resume.display());
    }
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summary: &RunSummary) {
    info!("{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.uploaded, summary.total());
    info!("⏭️ 跳过（已上传）: {}", summary.skipped);
    info!("❌ 失败: {}", summary.failed);
    info!("{}", "=".repeat(60));
    info!("账本已保存至: {}", summary.ledger_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
