#![allow(dead_code)]

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use sample_pusher::Args;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn tracing_init() {
    sample_pusher::utils::logging::init();
}

/// 网关收到的一次上传
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub file_name: Option<String>,
    pub content: Vec<u8>,
    pub fields: Vec<(String, String)>,
}

impl ReceivedUpload {
    pub fn field(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// 假网关：记录所有上传，按显示名返回指定状态码（默认 200）
#[derive(Clone, Default)]
pub struct FakeGateway {
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
    statuses: Arc<Mutex<HashMap<String, u16>>>,
}

impl FakeGateway {
    /// 显示名为 `name` 的样本返回 `status`
    pub fn respond_with(&self, name: &str, status: u16) {
        self.statuses
            .lock()
            .unwrap()
            .insert(name.to_string(), status);
    }

    pub fn uploads(&self) -> Vec<ReceivedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    /// 所有上传的显示名（`name` 字段），已排序
    pub fn uploaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .uploads()
            .iter()
            .filter_map(|u| u.field("name").first().map(|n| n.to_string()))
            .collect();
        names.sort();
        names
    }

    /// 启动并返回基础地址
    pub async fn start(&self) -> String {
        serve(
            Router::new()
                .route("/samples/", post(upload))
                .with_state(self.clone()),
        )
        .await
    }
}

async fn upload(State(gateway): State<FakeGateway>, mut multipart: Multipart) -> StatusCode {
    let mut received = ReceivedUpload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "sample" {
            received.file_name = field.file_name().map(str::to_string);
            received.content = field.bytes().await.unwrap().to_vec();
        } else {
            let value = field.text().await.unwrap();
            received.fields.push((name, value));
        }
    }

    let status = received
        .field("name")
        .first()
        .and_then(|name| gateway.statuses.lock().unwrap().get(*name).copied())
        .unwrap_or(200);
    gateway.uploads.lock().unwrap().push(received);
    StatusCode::from_u16(status).unwrap()
}

/// 假备用内容服务器：`GET /<objectId>`
#[derive(Clone, Default)]
pub struct FakeContentServer {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeContentServer {
    pub fn insert(&self, object_id: &str, content: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(object_id.to_string(), content.to_vec());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn start(&self) -> String {
        serve(
            Router::new()
                .route("/:id", get(fetch))
                .with_state(self.clone()),
        )
        .await
    }
}

async fn fetch(
    State(server): State<FakeContentServer>,
    Path(id): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    server.requests.lock().unwrap().push(id.clone());
    server
        .objects
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// 一个当前没有服务监听的地址
pub fn unreachable_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub fn args(list: &[&str]) -> Args {
    let mut argv = vec!["sample-pusher"];
    argv.extend_from_slice(list);
    Args::try_parse_from(argv).unwrap()
}

pub fn no_prompt() -> std::io::Result<String> {
    panic!("tests always pass --pw")
}

/// 账本中首行之后的所有记录
pub fn ledger_records(path: &std::path::Path) -> Vec<(String, u16)> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| {
            let (sample, status) = line.rsplit_once('\t').unwrap();
            (sample.to_string(), status.parse().unwrap())
        })
        .collect()
}

/// 写入样本列表文件，返回其路径
pub fn write_list(dir: &std::path::Path, samples: &[String]) -> String {
    let path = dir.join("samples.txt");
    let mut contents = samples.join("\n");
    contents.push('\n');
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

/// 按扩展名给出内容类型，避免依赖系统 `file` 命令
pub struct ExtensionClassifier;

impl sample_pusher::discovery::ContentClassifier for ExtensionClassifier {
    fn classify(
        &self,
        path: &std::path::Path,
    ) -> Result<String, sample_pusher::error::DiscoveryError> {
        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some("exe") => "application/x-dosexec",
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        };
        Ok(content_type.to_string())
    }
}

pub fn classifier() -> Arc<dyn sample_pusher::discovery::ContentClassifier> {
    Arc::new(ExtensionClassifier)
}
