//! 程序配置
//!
//! - `Args`：命令行参数
//! - `RunOptions`：需要写入账本首行、恢复时还原的那部分参数
//! - `Config`：启动时一次性解析完成的不可变配置，显式传给各层

use crate::error::ConfigError;
use crate::models::UploadMetadata;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 命令行参数
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "sample-pusher",
    about = "Upload samples to a gateway, resumable through a progress ledger"
)]
pub struct Args {
    /// Ledger of a previous, unfinished run. All other options except --workers
    /// are taken from the ledger.
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// File with one sample identifier per line (local path or remote object reference)
    #[arg(long)]
    pub file: Option<String>,

    /// Directory of samples to upload
    #[arg(long)]
    pub dir: Option<String>,

    /// Walk --dir recursively
    #[arg(long)]
    pub rec: bool,

    /// Only upload files whose content type contains this substring
    #[arg(long, default_value = "")]
    pub mime: String,

    /// Number of parallel workers
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// URI of the upload gateway
    #[arg(long, default_value = "")]
    pub gateway: String,

    /// Username forwarded to the gateway
    #[arg(long, default_value = "")]
    pub user: String,

    /// Password forwarded to the gateway; prompted for when omitted
    #[arg(long, env = "SAMPLE_PUSHER_PASSWORD", hide_env_values = true)]
    pub pw: Option<String>,

    /// Fallback content server for samples that are not available locally
    #[arg(long, default_value = "")]
    pub cfs: String,

    /// Comment of the submitter
    #[arg(long, default_value = "")]
    pub comment: String,

    /// Source information for the samples
    #[arg(long, default_value = "")]
    pub src: String,

    /// Tags as a JSON array of strings, e.g. '["apt","dropper"]'
    #[arg(long, default_value = "")]
    pub tags: String,

    /// Disable TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Directory new ledgers are written to
    #[arg(long, default_value = "log")]
    pub log_dir: PathBuf,
}

/// 写入账本首行的运行参数
///
/// 字段名与已有账本保持一致；读取时缺失的字段取默认值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct RunOptions {
    pub crits_file_server: String,
    pub directory: String,
    pub comment: String,
    pub source: String,
    pub mimetype_pattern: String,
    pub recursive: bool,
    pub insecure: bool,
    #[serde(rename = "FPath")]
    pub file_path: String,
    pub tags_str: String,
    #[serde(rename = "GatewayURI")]
    pub gateway_uri: String,
    pub username: String,
}

impl RunOptions {
    /// 从命令行参数采集
    pub fn from_args(args: &Args) -> Self {
        Self {
            crits_file_server: args.cfs.clone(),
            directory: args.dir.clone().unwrap_or_default(),
            comment: args.comment.clone(),
            source: args.src.clone(),
            mimetype_pattern: args.mime.clone(),
            recursive: args.rec,
            insecure: args.insecure,
            file_path: args.file.clone().unwrap_or_default(),
            tags_str: args.tags.clone(),
            gateway_uri: args.gateway.clone(),
            username: args.user.clone(),
        }
    }

    /// 解析标签 JSON，空字符串表示没有标签
    pub fn parse_tags(&self) -> Result<Vec<String>, ConfigError> {
        if self.tags_str.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.tags_str).map_err(|source| ConfigError::InvalidTags {
            raw: self.tags_str.clone(),
            source,
        })
    }
}

/// 解析完成的运行配置
#[derive(Debug, Clone)]
pub struct Config {
    /// 写入账本的参数（恢复时来自账本）
    pub options: RunOptions,
    /// 恢复所用的账本
    pub resume: Option<PathBuf>,
    /// 并行 worker 数量
    pub workers: usize,
    /// 新账本所在目录
    pub log_dir: PathBuf,
    /// 上传元数据
    pub metadata: UploadMetadata,
}

impl Config {
    /// 由命令行参数与（可选的）账本参数构建配置
    ///
    /// - `persisted`: 恢复时账本首行中的参数，存在时覆盖命令行（`--workers` 除外）
    /// - `prompt_password`: 未给出 `--pw` 时调用
    pub fn resolve<F>(
        args: Args,
        persisted: Option<RunOptions>,
        prompt_password: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        if args.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(args.workers));
        }

        let options = persisted.unwrap_or_else(|| RunOptions::from_args(&args));
        if options.gateway_uri.trim().is_empty() {
            return Err(ConfigError::MissingGateway);
        }
        let tags = options.parse_tags()?;

        let password = match args.pw {
            Some(pw) => pw,
            None => prompt_password().map_err(ConfigError::PasswordPrompt)?,
        };

        let metadata = UploadMetadata {
            source: options.source.clone(),
            comment: options.comment.clone(),
            tags,
            timestamp: chrono::Local::now(),
            username: options.username.clone(),
            password,
        };

        Ok(Self {
            options,
            resume: args.resume,
            workers: args.workers,
            log_dir: args.log_dir,
            metadata,
        })
    }

    /// 网关上传地址 `<gateway>/samples/`
    pub fn upload_url(&self) -> String {
        format!("{}/samples/", self.options.gateway_uri.trim_end_matches('/'))
    }

    /// 备用内容服务器，未配置时为 None
    pub fn fallback_base(&self) -> Option<&str> {
        let base = self.options.crits_file_server.trim();
        (!base.is_empty()).then_some(base)
    }
}
