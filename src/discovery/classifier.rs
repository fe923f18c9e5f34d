//! 内容类型识别
//!
//! 识别本身由外部程序完成，这里只定义接口和默认实现

use crate::error::DiscoveryError;
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// 内容类型识别器
pub trait ContentClassifier: Send + Sync {
    /// 返回文件的内容类型，例如 `image/png`
    fn classify(&self, path: &Path) -> Result<String, DiscoveryError>;
}

/// 调用系统 `file` 命令（libmagic）识别 MIME 类型
#[derive(Debug, Clone)]
pub struct FileCommandClassifier {
    program: OsString,
}

impl FileCommandClassifier {
    pub fn new() -> Self {
        Self::with_program("file")
    }

    /// 使用自定义的 `file` 可执行文件
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FileCommandClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentClassifier for FileCommandClassifier {
    fn classify(&self, path: &Path) -> Result<String, DiscoveryError> {
        let classify_err = |reason: String| DiscoveryError::Classify {
            path: path.to_path_buf(),
            reason,
        };

        let output = Command::new(&self.program)
            .args(["--brief", "--mime-type", "-L"])
            .arg(path)
            .output()
            .map_err(|e| classify_err(format!("无法执行 {:?}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(classify_err(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let mime = String::from_utf8_lossy(&output.stdout).trim().to_string();
        // libmagic 出错时也可能以 0 退出，并把错误信息写到 stdout
        if !mime.contains('/') {
            return Err(classify_err(mime));
        }
        Ok(mime)
    }
}

/// 内容类型是否满足过滤条件，空模式接受所有类型
pub fn admits(pattern: &str, content_type: &str) -> bool {
    content_type.contains(pattern)
}
