//! HTTP 客户端 - 基础设施层
//!
//! 启动时创建一次，上传与备用内容下载共用同一个连接池

use crate::error::ConfigError;
use reqwest::{Client, Response};
use tracing::{debug, warn};

/// 构建共享 HTTP 客户端
///
/// # 参数
/// - `insecure`: 为 true 时跳过 TLS 证书校验
pub fn build_client(insecure: bool) -> Result<Client, ConfigError> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));

    if insecure {
        warn!("⚠️ 已关闭 TLS 证书校验 (--insecure)");
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().map_err(ConfigError::HttpClient)
}

/// 读完并丢弃响应体，使连接可以复用
///
/// 返回响应体文本，仅用于日志
pub async fn drain(response: Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!("读取响应体失败: {}", e);
            String::new()
        }
    }
}
