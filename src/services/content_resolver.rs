//! 样本内容获取 - 业务能力层
//!
//! 先按本地路径打开；不是本地文件时，把标识解码成远程对象引用，
//! 再从备用内容服务器 `GET <cfs>/<objectId>` 下载

use crate::error::ContentError;
use crate::infrastructure::http_client::drain;
use reqwest::multipart::Part;
use reqwest::{Body, Client, Response, StatusCode};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// 远程对象引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// 24 位十六进制对象 ID（小写）
    pub object_id: String,
}

#[derive(Deserialize)]
struct RawRef {
    #[serde(rename = "_id")]
    id: RawObjectId,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawObjectId {
    Plain(String),
    Extended {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl RemoteRef {
    /// 解码样本标识
    ///
    /// 支持：
    /// - `{"_id": "<24 hex>", "md5": "..."}`（其他字段忽略）
    /// - `{"_id": {"$oid": "<24 hex>"}}`
    /// - 单独的 24 位十六进制对象 ID
    pub fn parse(identifier: &str) -> Result<Self, ContentError> {
        let trimmed = identifier.trim();
        let raw_id = if trimmed.starts_with('{') {
            let raw: RawRef = serde_json::from_str(trimmed)
                .map_err(|e| ContentError::malformed(identifier, e.to_string()))?;
            match raw.id {
                RawObjectId::Plain(id) | RawObjectId::Extended { oid: id } => id,
            }
        } else {
            trimmed.to_string()
        };

        if raw_id.len() != 24 || !raw_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ContentError::malformed(
                identifier,
                format!("'{}' 不是 24 位十六进制对象 ID", raw_id),
            ));
        }

        Ok(Self {
            object_id: raw_id.to_ascii_lowercase(),
        })
    }

    /// 备用内容服务器上的下载地址
    pub fn url(&self, fallback_base: &str) -> String {
        format!("{}/{}", fallback_base.trim_end_matches('/'), self.object_id)
    }
}

/// 已获取到的样本内容
#[derive(Debug)]
pub enum ResolvedContent {
    /// 本地文件，句柄随上传流一起释放
    Local { file: File, len: u64 },
    /// 备用内容服务器的响应，响应体尚未读取
    Remote { url: String, response: Response },
}

impl ResolvedContent {
    /// 转换为 multipart 文件部分
    ///
    /// 两种来源都以流的形式写入请求体；长度已知时一并声明
    pub fn into_part(self) -> Part {
        match self {
            ResolvedContent::Local { file, len } => {
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            }
            ResolvedContent::Remote { url, response } => {
                debug!("转发备用内容服务器响应: {}", url);
                match response.content_length() {
                    Some(len) => Part::stream_with_length(response, len),
                    None => Part::stream(response),
                }
            }
        }
    }
}

/// 样本内容获取服务
#[derive(Debug, Clone)]
pub struct ContentResolver {
    client: Client,
    fallback_base: Option<String>,
}

impl ContentResolver {
    pub fn new(client: Client, fallback_base: Option<&str>) -> Self {
        Self {
            client,
            fallback_base: fallback_base.map(str::to_string),
        }
    }

    /// 获取样本内容
    pub async fn resolve(&self, identifier: &str) -> Result<ResolvedContent, ContentError> {
        if let Some(local) = open_local(identifier).await {
            debug!("使用本地文件: {}", identifier);
            return Ok(local);
        }

        debug!("非本地文件，尝试备用内容服务器: {}", identifier);
        let remote = RemoteRef::parse(identifier)?;
        let base = self
            .fallback_base
            .as_deref()
            .ok_or_else(|| ContentError::NoFallback {
                identifier: identifier.to_string(),
            })?;

        let url = remote.url(base);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ContentError::Fetch {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            drain(response).await;
            return Err(ContentError::NotRetrievable {
                url,
                status: status.as_u16(),
            });
        }

        Ok(ResolvedContent::Remote { url, response })
    }
}

/// 打开本地普通文件，目录或打不开的路径返回 None
async fn open_local(identifier: &str) -> Option<ResolvedContent> {
    let file = File::open(identifier).await.ok()?;
    let metadata = file.metadata().await.ok()?;
    metadata.is_file().then(|| ResolvedContent::Local {
        file,
        len: metadata.len(),
    })
}
