//! 错误类型
//!
//! 按层次划分：
//! - 致命错误（启动前检查 / 账本）：`ConfigError`、`LedgerError`，经 `AppError` 向上传播
//! - 单样本错误：`ContentError`、`SampleError`，只会变成一条失败记录，不会中断进程
//! - 发现阶段错误：`DiscoveryError`，记录日志后跳过该文件

use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型（只包含会终止进程的错误）
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 账本读写错误
    #[error("账本错误: {0}")]
    Ledger(#[from] LedgerError),
    /// 发现阶段无法继续（工作队列已关闭等）
    #[error("发现错误: {0}")]
    Discovery(#[from] DiscoveryError),
    /// 后台任务异常退出
    #[error("后台任务失败: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未指定网关地址
    #[error("必须指定 --gateway（或通过 --resume 恢复）")]
    MissingGateway,
    /// Worker 数量非法
    #[error("worker 数量必须 >= 1，当前为 {0}")]
    InvalidWorkerCount(usize),
    /// 标签 JSON 解析失败
    #[error("无法解析标签列表 '{raw}': {source}")]
    InvalidTags {
        raw: String,
        source: serde_json::Error,
    },
    /// 样本列表文件无法读取
    #[error("无法打开样本列表文件 {path}: {source}")]
    ListFileUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 样本目录无法读取
    #[error("无法访问样本目录 {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 读取密码失败
    #[error("读取密码失败: {0}")]
    PasswordPrompt(#[source] std::io::Error),
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 账本错误，全部是致命错误
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("无法打开账本 {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("无法创建账本 {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("账本 {path} 为空，缺少运行参数头")]
    MissingHeader { path: PathBuf },
    #[error("账本 {path} 的运行参数头无法解析: {source}")]
    InvalidHeader {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("账本第 {line_no} 行格式错误: {line:?}")]
    InvalidRecord { line_no: usize, line: String },
    #[error("运行参数序列化失败: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("写入账本失败: {0}")]
    Write(#[source] std::io::Error),
}

/// 发现阶段错误
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// 内容类型识别失败（只跳过该文件）
    #[error("无法识别 {path} 的内容类型: {reason}")]
    Classify { path: PathBuf, reason: String },
    /// 目录遍历失败（只跳过该条目）
    #[error("目录遍历失败: {0}")]
    Walk(#[from] walkdir::Error),
    /// 读取样本列表时出错
    #[error("读取样本列表 {path} 失败: {source}")]
    ListRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// 文件名不是合法 UTF-8，无法作为样本标识（只跳过该文件）
    #[error("文件名不是合法 UTF-8，已跳过: {}", .0.display())]
    NonUtf8Path(PathBuf),
    /// 下游通道已关闭，无法继续投递
    #[error("工作队列已关闭，无法投递样本 {0}")]
    QueueClosed(String),
}

/// 样本内容获取错误
#[derive(Debug, Error)]
pub enum ContentError {
    /// 非本地文件，且无法解码成远程对象引用
    #[error("无法解析样本标识 {identifier:?}: {reason}")]
    MalformedIdentifier { identifier: String, reason: String },
    /// 未配置备用内容服务器
    #[error("样本 {identifier} 不在本地，且未配置 --cfs")]
    NoFallback { identifier: String },
    /// 请求备用内容服务器失败
    #[error("请求 {url} 失败: {source}")]
    Fetch { url: String, source: reqwest::Error },
    /// 备用内容服务器返回非 200
    #[error("内容不可获取 ({url} 返回 {status})")]
    NotRetrievable { url: String, status: u16 },
}

/// 单个样本处理失败的原因
#[derive(Debug, Error)]
pub enum SampleError {
    #[error(transparent)]
    Content(#[from] ContentError),
    /// 请求未能发出或响应中断
    #[error("上传请求发送失败: {0}")]
    Send(#[from] reqwest::Error),
    /// 网关返回非 200
    #[error("网关拒绝上传 (状态码 {status})")]
    Rejected { status: u16 },
}

/// 请求无法发出时写入账本的状态码
pub const SENTINEL_STATUS: u16 = 0;

impl SampleError {
    /// 写入账本的状态码
    pub fn status_code(&self) -> u16 {
        match self {
            SampleError::Rejected { status } => *status,
            _ => SENTINEL_STATUS,
        }
    }
}

// ========== 便捷构造函数 ==========

impl ContentError {
    pub fn malformed(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        ContentError::MalformedIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
