//! 样本处理结果
//!
//! worker 与发现阶段产出 `Outcome`，由唯一的账本写入任务消费

use crate::error::SampleError;
use std::fmt::Display;

/// 账本中的一条记录：`<样本标识>\t<状态码>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub sample: String,
    pub status: u16,
}

impl OutcomeRecord {
    pub fn new(sample: impl Into<String>, status: u16) -> Self {
        Self {
            sample: sample.into(),
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// 序列化为账本行（含换行符）
    pub fn to_line(&self) -> String {
        format!("{}\t{}\n", self.sample, self.status)
    }

    /// 从账本行解析，按最后一个 TAB 切分
    pub fn parse_line(line: &str) -> Option<Self> {
        let (sample, status) = line.rsplit_once('\t')?;
        let status = status.trim_end_matches('\r').parse().ok()?;
        Some(Self::new(sample, status))
    }
}

impl Display for OutcomeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.sample, self.status)
    }
}

/// 单个工作单元的结果
#[derive(Debug)]
pub enum Outcome {
    /// worker 处理完毕（成功或失败）
    Finished {
        sample: String,
        result: Result<(), SampleError>,
    },
    /// 恢复运行时已在账本中标记为成功，未进入工作队列
    AlreadyUploaded { sample: String },
}

impl Outcome {
    pub fn sample(&self) -> &str {
        match self {
            Outcome::Finished { sample, .. } | Outcome::AlreadyUploaded { sample } => sample,
        }
    }

    pub fn record(&self) -> OutcomeRecord {
        match self {
            Outcome::Finished { sample, result } => {
                let status = match result {
                    Ok(()) => 200,
                    Err(e) => e.status_code(),
                };
                OutcomeRecord::new(sample.as_str(), status)
            }
            Outcome::AlreadyUploaded { sample } => OutcomeRecord::new(sample.as_str(), 200),
        }
    }
}
