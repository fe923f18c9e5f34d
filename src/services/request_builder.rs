//! 上传请求构建 - 业务能力层
//!
//! 每个样本一个 multipart/form-data 请求：
//! - 文件部分 `sample`，文件名为原始样本标识
//! - 其余为元数据字段，见 `UploadMetadata::form_fields`

use crate::error::SampleError;
use crate::models::UploadMetadata;
use crate::services::content_resolver::ResolvedContent;
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder};

/// 文件部分的字段名
pub const SAMPLE_FIELD: &str = "sample";

/// 构建表单
pub fn build_form(
    metadata: &UploadMetadata,
    sample: &str,
    content: ResolvedContent,
) -> Result<Form, SampleError> {
    let part = content
        .into_part()
        .file_name(sample.to_string())
        .mime_str("application/octet-stream")?;

    let form = metadata
        .form_fields(sample)
        .into_iter()
        .fold(Form::new().part(SAMPLE_FIELD, part), |form, (key, value)| {
            form.text(key, value)
        });
    Ok(form)
}

/// 构建发往网关的上传请求（POST）
pub fn build_request(client: &Client, upload_url: &str, form: Form) -> RequestBuilder {
    client.post(upload_url).multipart(form)
}
