//! 样本发现
//!
//! 两个来源按顺序拼接：
//! 1. 样本列表文件，每行一个标识，原样使用
//! 2. 目录遍历，每个普通文件经内容类型过滤后加入
//!
//! 运行在阻塞线程上，工作队列满时阻塞，形成背压

pub mod classifier;

pub use classifier::{admits, ContentClassifier, FileCommandClassifier};

use crate::config::RunOptions;
use crate::error::{ConfigError, DiscoveryError};
use crate::infrastructure::WorkTracker;
use crate::ledger::SkipSet;
use crate::models::Outcome;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 已打开的样本列表文件
#[derive(Debug)]
struct SampleList {
    path: PathBuf,
    reader: BufReader<File>,
}

/// 发现阶段
pub struct Discovery {
    list: Option<SampleList>,
    directory: Option<PathBuf>,
    recursive: bool,
    mime_pattern: String,
    classifier: Arc<dyn ContentClassifier>,
    skip: Arc<SkipSet>,
}

/// 发现阶段的投递端
pub struct Dispatch {
    pub queue: mpsc::Sender<String>,
    pub outcomes: mpsc::Sender<Outcome>,
    pub tracker: Arc<WorkTracker>,
}

/// 发现统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// 投递到工作队列
    pub queued: usize,
    /// 恢复运行时跳过
    pub skipped: usize,
    /// 被内容类型过滤掉
    pub filtered: usize,
    /// 识别或遍历出错
    pub errors: usize,
}

impl Dispatch {
    /// 登记并投递到工作队列
    fn enqueue(&self, sample: String) -> Result<(), DiscoveryError> {
        self.tracker.register();
        self.queue.blocking_send(sample).map_err(|e| {
            self.tracker.complete();
            DiscoveryError::QueueClosed(e.0)
        })
    }

    /// 登记并直接产出一条“已上传”结果，不经过 worker
    fn short_circuit(&self, sample: String) -> Result<(), DiscoveryError> {
        self.tracker.register();
        self.outcomes
            .blocking_send(Outcome::AlreadyUploaded { sample })
            .map_err(|e| {
                self.tracker.complete();
                DiscoveryError::QueueClosed(e.0.sample().to_string())
            })
    }
}

impl Discovery {
    /// 启动前检查：打开样本列表、确认目录可访问
    pub fn prepare(
        options: &RunOptions,
        classifier: Arc<dyn ContentClassifier>,
        skip: Arc<SkipSet>,
    ) -> Result<Self, ConfigError> {
        let list = match options.file_path.as_str() {
            "" => None,
            path => {
                let path = PathBuf::from(path);
                let file = File::open(&path).map_err(|source| ConfigError::ListFileUnreadable {
                    path: path.clone(),
                    source,
                })?;
                Some(SampleList {
                    path,
                    reader: BufReader::new(file),
                })
            }
        };

        let directory = match options.directory.as_str() {
            "" => None,
            dir => Some(absolute_dir(dir)?),
        };

        Ok(Self {
            list,
            directory,
            recursive: options.recursive,
            mime_pattern: options.mimetype_pattern.clone(),
            classifier,
            skip,
        })
    }

    /// 是否有任何样本来源
    pub fn has_sources(&self) -> bool {
        self.list.is_some() || self.directory.is_some()
    }

    /// 执行发现（阻塞调用）
    pub fn run(mut self, dispatch: &Dispatch) -> Result<DiscoveryStats, DiscoveryError> {
        let mut stats = DiscoveryStats::default();

        if let Some(list) = self.list.take() {
            info!("📄 读取样本列表: {}", list.path.display());
            let SampleList { path, mut reader } = list;
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let read = reader
                    .read_until(b'\n', &mut buf)
                    .map_err(|source| DiscoveryError::ListRead {
                        path: path.clone(),
                        source,
                    })?;
                if read == 0 {
                    break;
                }
                let sample = list_line(&buf);
                if self.skip.contains(&sample) {
                    info!("⏭️ 跳过 {}，已上传成功", sample);
                    dispatch.short_circuit(sample)?;
                    stats.skipped += 1;
                } else {
                    dispatch.enqueue(sample)?;
                    stats.queued += 1;
                }
            }
        }

        if let Some(root) = &self.directory {
            info!(
                "📁 扫描目录: {} ({})",
                root.display(),
                if self.recursive { "递归" } else { "仅顶层" }
            );
            for entry in walk(root, self.recursive) {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("⚠️ {}", e);
                        stats.errors += 1;
                        continue;
                    }
                };
                let Some(sample) = path.to_str().map(str::to_string) else {
                    warn!("⚠️ {}", DiscoveryError::NonUtf8Path(path));
                    stats.errors += 1;
                    continue;
                };

                if self.skip.contains(&sample) {
                    info!("⏭️ 跳过 {}，已上传成功", sample);
                    dispatch.short_circuit(sample)?;
                    stats.skipped += 1;
                    continue;
                }

                match self.admit(&path) {
                    Ok(Some(content_type)) => {
                        info!("➕ 加入 {} ({})", sample, content_type);
                        dispatch.enqueue(sample)?;
                        stats.queued += 1;
                    }
                    Ok(None) => stats.filtered += 1,
                    Err(e) => {
                        warn!("⚠️ 跳过 {}: {}", sample, e);
                        stats.errors += 1;
                    }
                }
            }
        }

        debug!("发现阶段结束: {:?}", stats);
        Ok(stats)
    }

    /// 内容类型过滤
    ///
    /// 返回 `Some(类型)` 表示接受；模式为空时不调用识别器
    fn admit(&self, path: &Path) -> Result<Option<String>, DiscoveryError> {
        if self.mime_pattern.is_empty() {
            return Ok(Some("*".to_string()));
        }
        let content_type = self.classifier.classify(path)?;
        if admits(&self.mime_pattern, &content_type) {
            Ok(Some(content_type))
        } else {
            info!("➖ 跳过 {} ({})", path.display(), content_type);
            Ok(None)
        }
    }
}

/// 样本列表中的一行，去掉行尾换行符；非 UTF-8 字节按替换字符处理
fn list_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// 目录的绝对路径，不解析符号链接
fn absolute_dir(dir: &str) -> Result<PathBuf, ConfigError> {
    let unreadable = |source| ConfigError::DirectoryUnreadable {
        path: PathBuf::from(dir),
        source,
    };
    let path = std::path::absolute(dir).map_err(unreadable)?;
    let metadata = std::fs::metadata(&path).map_err(unreadable)?;
    if !metadata.is_dir() {
        return Err(unreadable(std::io::Error::other("不是目录")));
    }
    Ok(path)
}

/// 遍历目录下的普通文件
///
/// 非递归模式只看根目录的直接子文件，不进入任何子目录
pub fn walk(
    root: &Path,
    recursive: bool,
) -> impl Iterator<Item = Result<PathBuf, DiscoveryError>> {
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    walker.into_iter().filter_map(|entry| match entry {
        Ok(entry) => {
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            is_file.then(|| Ok(entry.into_path()))
        }
        Err(e) => Some(Err(DiscoveryError::Walk(e))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// 按扩展名返回类型，并记录被询问过的文件
    #[derive(Default)]
    struct ExtensionClassifier {
        asked: Mutex<Vec<PathBuf>>,
    }

    impl ContentClassifier for ExtensionClassifier {
        fn classify(&self, path: &Path) -> Result<String, DiscoveryError> {
            self.asked.lock().unwrap().push(path.to_path_buf());
            let types = HashMap::from([("png", "image/png"), ("jpg", "image/jpeg"), ("txt", "text/plain")]);
            match path.extension().and_then(|e| e.to_str()) {
                Some("broken") => Err(DiscoveryError::Classify {
                    path: path.to_path_buf(),
                    reason: "unreadable".to_string(),
                }),
                Some(ext) => Ok(types
                    .get(ext)
                    .copied()
                    .unwrap_or("application/octet-stream")
                    .to_string()),
                None => Ok("application/octet-stream".to_string()),
            }
        }
    }

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("top.png"), b"png").unwrap();
        std::fs::write(dir.path().join("top.txt"), b"txt").unwrap();
        std::fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        std::fs::write(dir.path().join("nested/inner.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("nested/deeper/deep.png"), b"png").unwrap();
        dir
    }

    fn names(paths: &[String]) -> Vec<String> {
        let mut names: Vec<String> = paths
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn options(dir: &Path, recursive: bool, mime: &str) -> RunOptions {
        RunOptions {
            directory: dir.to_string_lossy().into_owned(),
            recursive,
            mimetype_pattern: mime.to_string(),
            ..Default::default()
        }
    }

    /// 在阻塞线程上运行发现，收集队列内容和短路结果
    async fn discover(
        discovery: Discovery,
    ) -> (DiscoveryStats, Vec<String>, Vec<String>, Arc<WorkTracker>) {
        let (queue_tx, mut queue_rx) = mpsc::channel(64);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(64);
        let tracker = Arc::new(WorkTracker::new());
        let dispatch = Dispatch {
            queue: queue_tx,
            outcomes: outcome_tx,
            tracker: tracker.clone(),
        };

        let stats = tokio::task::spawn_blocking(move || discovery.run(&dispatch))
            .await
            .unwrap()
            .unwrap();

        let mut queued = Vec::new();
        while let Ok(sample) = queue_rx.try_recv() {
            queued.push(sample);
        }
        let mut skipped = Vec::new();
        while let Ok(outcome) = outcome_rx.try_recv() {
            skipped.push(outcome.sample().to_string());
        }
        (stats, queued, skipped, tracker)
    }

    #[test]
    fn non_recursive_walk_never_descends() {
        let dir = tree();
        let found: Vec<String> = walk(dir.path(), false)
            .map(|p| p.unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names(&found), vec!["top.png", "top.txt"]);
    }

    #[test]
    fn recursive_walk_visits_all_depths() {
        let dir = tree();
        let found: Vec<String> = walk(dir.path(), true)
            .map(|p| p.unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names(&found),
            vec!["deep.png", "inner.jpg", "top.png", "top.txt"]
        );
    }

    #[tokio::test]
    async fn empty_filter_admits_every_file_without_classifying() {
        let dir = tree();
        let classifier = Arc::new(ExtensionClassifier::default());
        let discovery = Discovery::prepare(
            &options(dir.path(), true, ""),
            classifier.clone(),
            Arc::new(SkipSet::new()),
        )
        .unwrap();

        let (stats, queued, _, tracker) = discover(discovery).await;
        assert_eq!(stats.queued, 4);
        assert_eq!(queued.len(), 4);
        assert_eq!(tracker.registered(), 4);
        assert!(classifier.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_filter_admits_only_images() {
        let dir = tree();
        let discovery = Discovery::prepare(
            &options(dir.path(), true, "image"),
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .unwrap();

        let (stats, queued, _, _) = discover(discovery).await;
        assert_eq!(names(&queued), vec!["deep.png", "inner.jpg", "top.png"]);
        assert_eq!(stats.filtered, 1);
    }

    #[tokio::test]
    async fn classifier_failure_skips_only_that_file() {
        let dir = tree();
        std::fs::write(dir.path().join("bad.broken"), b"?").unwrap();
        let discovery = Discovery::prepare(
            &options(dir.path(), false, "image"),
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .unwrap();

        let (stats, queued, _, _) = discover(discovery).await;
        assert_eq!(stats.errors, 1);
        assert_eq!(names(&queued), vec!["top.png"]);
    }

    #[tokio::test]
    async fn list_is_read_verbatim_and_resume_skips_short_circuit() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("samples.txt");
        std::fs::write(&list, "a.txt\nb.txt\na.txt\n5f1d7a0c9b1e8a0012345678\n").unwrap();

        let skip: SkipSet = ["a.txt".to_string()].into_iter().collect();
        let discovery = Discovery::prepare(
            &RunOptions {
                file_path: list.to_string_lossy().into_owned(),
                ..Default::default()
            },
            Arc::new(ExtensionClassifier::default()),
            Arc::new(skip),
        )
        .unwrap();

        let (stats, queued, skipped, tracker) = discover(discovery).await;
        assert_eq!(queued, vec!["b.txt", "5f1d7a0c9b1e8a0012345678"]);
        assert_eq!(skipped, vec!["a.txt", "a.txt"]);
        assert_eq!(stats.skipped, 2);
        // 每一行都登记了一个工作单元
        assert_eq!(tracker.registered(), 4);
    }

    #[tokio::test]
    async fn resume_skip_happens_before_classification() {
        let dir = tree();
        let top = std::path::absolute(dir.path().join("top.png")).unwrap();
        let skip: SkipSet = [top.to_string_lossy().into_owned()].into_iter().collect();
        let classifier = Arc::new(ExtensionClassifier::default());
        let discovery = Discovery::prepare(
            &options(dir.path(), false, "image"),
            classifier.clone(),
            Arc::new(skip),
        )
        .unwrap();

        let (stats, queued, skipped, _) = discover(discovery).await;
        assert!(queued.is_empty());
        assert_eq!(names(&skipped), vec!["top.png"]);
        assert_eq!(stats.filtered, 1);
        assert!(!classifier.asked.lock().unwrap().contains(&top));
    }

    #[tokio::test]
    async fn invalid_utf8_list_line_is_still_dispatched() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("samples.txt");
        std::fs::write(&list, b"a.bin\n\xff\xfe-bad\r\nb.bin").unwrap();

        let discovery = Discovery::prepare(
            &RunOptions {
                file_path: list.to_string_lossy().into_owned(),
                ..Default::default()
            },
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .unwrap();

        let (stats, queued, _, tracker) = discover(discovery).await;
        assert_eq!(queued, vec!["a.bin", "\u{FFFD}\u{FFFD}-bad", "b.bin"]);
        assert_eq!(stats.queued, 3);
        assert_eq!(tracker.registered(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_file_name_is_skipped_with_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.bin"), b"ok").unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xffname.bin")), b"?").unwrap();

        let discovery = Discovery::prepare(
            &options(dir.path(), false, ""),
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .unwrap();

        let (stats, queued, _, tracker) = discover(discovery).await;
        assert_eq!(names(&queued), vec!["good.bin"]);
        assert_eq!(stats.errors, 1);
        assert_eq!(tracker.registered(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn directory_identifiers_keep_symlinked_root() {
        let real = tree();
        let links = TempDir::new().unwrap();
        let link = links.path().join("samples-link");
        std::os::unix::fs::symlink(real.path(), &link).unwrap();

        let discovery = Discovery::prepare(
            &options(&link, false, ""),
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .unwrap();

        let (_, queued, _, _) = discover(discovery).await;
        assert_eq!(queued.len(), 2);
        assert!(queued.iter().all(|sample| Path::new(sample).starts_with(&link)));
    }

    #[test]
    fn regular_file_is_not_a_sample_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let err = Discovery::prepare(
            &options(&file, false, ""),
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::DirectoryUnreadable { .. }));
    }

    #[test]
    fn unreadable_list_file_fails_preflight() {
        let err = Discovery::prepare(
            &RunOptions {
                file_path: "/definitely/not/here.txt".to_string(),
                ..Default::default()
            },
            Arc::new(ExtensionClassifier::default()),
            Arc::new(SkipSet::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::ListFileUnreadable { .. }));
    }
}
