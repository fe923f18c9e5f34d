//! 样本上传 - 业务能力层
//!
//! 只负责"把一个样本发给网关"，不关心队列和账本

use crate::error::SampleError;
use crate::infrastructure::http_client::drain;
use crate::models::UploadMetadata;
use crate::services::content_resolver::ResolvedContent;
use crate::services::request_builder::{build_form, build_request};
use crate::utils::logging::truncate_text;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

/// 网关上传服务
#[derive(Debug, Clone)]
pub struct Uploader {
    client: Client,
    upload_url: String,
}

impl Uploader {
    pub fn new(client: Client, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            upload_url: upload_url.into(),
        }
    }

    /// 上传一个样本
    ///
    /// 响应体总是被完整读完；状态码非 200 时返回 `SampleError::Rejected`
    pub async fn upload(
        &self,
        metadata: &UploadMetadata,
        sample: &str,
        content: ResolvedContent,
    ) -> Result<(), SampleError> {
        let form = build_form(metadata, sample, content)?;
        let response = build_request(&self.client, &self.upload_url, form)
            .send()
            .await?;

        let status = response.status();
        let body = drain(response).await;

        info!("📤 已上传: {} | 状态码: {}", sample, status.as_u16());
        debug!("网关响应: {}", truncate_text(&body, 200));

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(SampleError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
