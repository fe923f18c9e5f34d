use chrono::{DateTime, Local, SecondsFormat};
use std::fmt;
use std::path::Path;

/// 上传元数据
///
/// 启动时构建一次，所有 worker 只读共享
#[derive(Clone)]
pub struct UploadMetadata {
    /// 样本来源
    pub source: String,
    /// 提交者备注
    pub comment: String,
    /// 标签（按命令行给出的顺序）
    pub tags: Vec<String>,
    /// 本次运行的提交时间
    pub timestamp: DateTime<Local>,
    pub username: String,
    pub password: String,
}

impl UploadMetadata {
    /// 生成某个样本的全部表单字段
    ///
    /// 每个标签单独一个 `tags` 字段
    pub fn form_fields(&self, sample: &str) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("source", self.source.clone()),
            ("name", display_name(sample)),
            (
                "date",
                self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("comment", self.comment.clone()),
        ];
        fields.extend(self.tags.iter().map(|tag| ("tags", tag.clone())));
        fields.push(("username", self.username.clone()));
        fields.push(("password", self.password.clone()));
        fields
    }
}

impl fmt::Debug for UploadMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadMetadata")
            .field("source", &self.source)
            .field("comment", &self.comment)
            .field("tags", &self.tags)
            .field("timestamp", &self.timestamp)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// 样本的显示名：标识的最后一段路径
pub fn display_name(sample: &str) -> String {
    Path::new(sample)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| sample.to_string())
}
