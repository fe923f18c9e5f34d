//! 进度账本
//!
//! 文件格式：
//!
//! ```text
//! {"GatewayURI":"http://gw", ...}   <- 第 1 行：运行参数 JSON
//! /srv/a.bin\t200                    <- 之后每行一条结果
//! /srv/b.bin\t0
//! ```
//!
//! 新运行创建以时间戳命名的新文件；恢复运行时以读写方式打开原文件并追加。

pub mod writer;

pub use writer::{spawn_writer, RunSummary};

use crate::config::RunOptions;
use crate::error::LedgerError;
use crate::models::OutcomeRecord;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

/// 已成功上传的样本集合，启动时构建后不再修改
pub type SkipSet = HashSet<String>;

/// 打开的账本文件
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    file: File,
}

/// 恢复运行时从账本读出的内容
#[derive(Debug)]
pub struct Replay {
    pub ledger: Ledger,
    pub options: RunOptions,
    pub skip: SkipSet,
}

impl Ledger {
    /// 在 `log_dir` 下创建新账本，并写入运行参数头
    pub async fn create(log_dir: &Path, options: &RunOptions) -> Result<Self, LedgerError> {
        tokio::fs::create_dir_all(log_dir)
            .await
            .map_err(|source| LedgerError::Create {
                path: log_dir.to_path_buf(),
                source,
            })?;

        let stem = chrono::Local::now()
            .format("sample-pusher_%Y-%m-%d_%H-%M-%S")
            .to_string();
        let (path, file) = create_unique(log_dir, &stem).await?;
        info!("📝 记录进度到: {}", path.display());

        let mut ledger = Self { path, file };
        let header = serde_json::to_string(options).map_err(LedgerError::Serialize)?;
        ledger.write_raw(format!("{header}\n").as_bytes()).await?;
        Ok(ledger)
    }

    /// 打开已有账本用于恢复
    ///
    /// 解析运行参数头和所有状态为 200 的记录；文件不会被截断，后续记录追加在末尾
    pub async fn resume(path: &Path) -> Result<Replay, LedgerError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| LedgerError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .await
            .map_err(|source| LedgerError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let (options, skip) = replay(path, &contents)?;
        info!(
            "🔁 从 {} 恢复运行，{} 个样本已上传成功",
            path.display(),
            skip.len()
        );

        let mut ledger = Self {
            path: path.to_path_buf(),
            file,
        };
        if !contents.ends_with('\n') {
            ledger.write_raw(b"\n").await?;
        }

        Ok(Replay {
            ledger,
            options,
            skip,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条结果记录
    pub async fn append(&mut self, record: &OutcomeRecord) -> Result<(), LedgerError> {
        self.write_raw(record.to_line().as_bytes()).await
    }

    /// 刷盘并关闭
    pub async fn close(mut self) -> Result<PathBuf, LedgerError> {
        self.file.flush().await.map_err(LedgerError::Write)?;
        self.file.sync_all().await.map_err(LedgerError::Write)?;
        Ok(self.path)
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), LedgerError> {
        self.file.write_all(bytes).await.map_err(LedgerError::Write)?;
        self.file.flush().await.map_err(LedgerError::Write)
    }
}

/// 同一秒内多次启动时在文件名后追加序号
async fn create_unique(log_dir: &Path, stem: &str) -> Result<(PathBuf, File), LedgerError> {
    let mut attempt = 0usize;
    loop {
        let name = if attempt == 0 {
            format!("{stem}.log")
        } else {
            format!("{stem}_{attempt}.log")
        };
        let path = log_dir.join(name);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(LedgerError::Create { path, source }),
        }
    }
}

/// 解析账本内容，得到运行参数和跳过集合
fn replay(path: &Path, contents: &str) -> Result<(RunOptions, SkipSet), LedgerError> {
    let mut lines = contents.split_inclusive('\n');

    let header = lines
        .next()
        .map(|line| line.trim_end_matches(['\n', '\r']))
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| LedgerError::MissingHeader {
            path: path.to_path_buf(),
        })?;
    let options: RunOptions =
        serde_json::from_str(header).map_err(|source| LedgerError::InvalidHeader {
            path: path.to_path_buf(),
            source,
        })?;

    let mut skip = SkipSet::new();
    for (idx, raw) in lines.enumerate() {
        let line_no = idx + 2;
        let line = raw.trim_end_matches('\n');
        if line.trim().is_empty() {
            continue;
        }
        if !raw.ends_with('\n') {
            // 上次运行中断时写了一半的行
            warn!("⚠️ 忽略账本末尾未写完的记录 (第 {} 行): {:?}", line_no, line);
            continue;
        }
        match OutcomeRecord::parse_line(line) {
            Some(record) if record.is_success() => {
                skip.insert(record.sample);
            }
            Some(_) => {}
            None => {
                return Err(LedgerError::InvalidRecord {
                    line_no,
                    line: line.to_string(),
                })
            }
        }
    }

    Ok((options, skip))
}
