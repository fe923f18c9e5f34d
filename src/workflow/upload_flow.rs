//! 样本上传流程 - 流程层
//!
//! 核心职责：定义"一个样本"的完整处理流程
//!
//! 流程顺序：
//! 1. 获取内容（本地文件 → 备用内容服务器）
//! 2. 构建 multipart 请求并上传
//! 3. 产出唯一一条 `Outcome`

use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SampleError;
use crate::models::{Outcome, UploadMetadata};
use crate::services::{ContentResolver, Uploader};
use crate::workflow::sample_ctx::SampleCtx;

/// 样本上传流程
///
/// - 不持有队列和账本
/// - 任何失败都只变成该样本的失败结果
pub struct UploadFlow {
    resolver: ContentResolver,
    uploader: Uploader,
    metadata: Arc<UploadMetadata>,
}

impl UploadFlow {
    pub fn new(config: &Config, client: reqwest::Client) -> Self {
        Self {
            resolver: ContentResolver::new(client.clone(), config.fallback_base()),
            uploader: Uploader::new(client, config.upload_url()),
            metadata: Arc::new(config.metadata.clone()),
        }
    }

    /// 处理单个样本
    pub async fn run(&self, ctx: &SampleCtx) -> Outcome {
        debug!("{} 开始处理", ctx);
        let result = self.upload(&ctx.sample).await;
        if let Err(e) = &result {
            warn!("{} ⚠️ {}", ctx, e);
        }
        Outcome::Finished {
            sample: ctx.sample.clone(),
            result,
        }
    }

    async fn upload(&self, sample: &str) -> Result<(), SampleError> {
        let content = self.resolver.resolve(sample).await?;
        self.uploader.upload(&self.metadata, sample, content).await
    }
}
