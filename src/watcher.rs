//! 文件监控模块
//!
//! 使用 notify crate 监控工作空间文件变化，驱动仓库状态缓存刷新：
//! - 单工作空间监控
//! - debouncer 聚合原始事件（默认 500ms）
//! - 有界队列 + 合并窗口：同一仓库的一批事件只触发一次 refresh
//! - 自动忽略 node_modules、.git/objects 等大目录

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::cache::StatusCache;
use crate::repo::{resolve_repository_root, RepositoryRoot};

/// 文件变化事件（创建、修改、删除），路径为绝对路径
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    PathsChanged(Vec<PathBuf>),
}

impl WatchEvent {
    fn into_paths(self) -> Vec<PathBuf> {
        match self {
            WatchEvent::PathsChanged(paths) => paths,
        }
    }
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Path does not exist: {0}")]
    MissingPath(String),
    #[error("Failed to create debouncer: {0}")]
    Debouncer(String),
    #[error("Failed to watch path: {0}")]
    Watch(String),
}

/// 需要忽略的目录列表
const IGNORE_DIRS: &[&str] = &[
    "node_modules",
    ".git/objects",
    ".git/logs",
    "target",
    "build",
    "dist",
    ".next",
    ".nuxt",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "venv",
    ".venv",
    "vendor",
    ".cargo",
];

/// 工作空间文件监控器
pub struct WorkspaceWatcher {
    /// 当前监控的路径
    watch_path: Option<PathBuf>,
    /// 防抖监控器
    debouncer: Option<Debouncer<RecommendedWatcher>>,
    /// 事件发送通道（有界）
    event_tx: mpsc::Sender<WatchEvent>,
}

impl WorkspaceWatcher {
    pub fn new(event_tx: mpsc::Sender<WatchEvent>) -> Self {
        Self {
            watch_path: None,
            debouncer: None,
            event_tx,
        }
    }

    /// 订阅工作空间监控
    /// 如果已有订阅，会先取消之前的订阅
    pub fn subscribe(&mut self, path: PathBuf, debounce: Duration) -> Result<(), WatchError> {
        self.unsubscribe();

        if !path.exists() {
            return Err(WatchError::MissingPath(path.display().to_string()));
        }
        let path = path.canonicalize().unwrap_or(path);

        info!("Subscribing to workspace: path={}", path.display());

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer =
            new_debouncer(debounce, tx).map_err(|e| WatchError::Debouncer(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Watch(e.to_string()))?;

        // 启动事件处理线程；debouncer 被丢弃时通道关闭，线程退出
        let event_tx = self.event_tx.clone();
        let root_path = path.clone();
        std::thread::spawn(move || {
            Self::event_loop(rx, event_tx, root_path);
        });

        self.watch_path = Some(path);
        self.debouncer = Some(debouncer);

        Ok(())
    }

    /// 取消订阅
    pub fn unsubscribe(&mut self) {
        if let Some(ref path) = self.watch_path {
            info!("Unsubscribing from workspace: path={}", path.display());
        }

        // 丢弃 debouncer 会自动停止监控
        self.debouncer = None;
        self.watch_path = None;
    }

    pub fn is_subscribed(&self) -> bool {
        self.debouncer.is_some()
    }

    pub fn watch_path(&self) -> Option<&Path> {
        self.watch_path.as_deref()
    }

    fn event_loop(
        rx: std::sync::mpsc::Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
        event_tx: mpsc::Sender<WatchEvent>,
        root_path: PathBuf,
    ) {
        loop {
            match rx.recv() {
                Ok(Ok(events)) => {
                    if let Some(event) = Self::collect_event(events, &root_path) {
                        Self::forward(&event_tx, event);
                    }
                }
                Ok(Err(e)) => {
                    warn!("Watch error: {}", e);
                }
                Err(_) => {
                    debug!("Watch channel closed, exiting event loop");
                    break;
                }
            }
        }
    }

    /// 过滤忽略目录并去重
    fn collect_event(events: Vec<DebouncedEvent>, root_path: &Path) -> Option<WatchEvent> {
        let paths: BTreeSet<PathBuf> = events
            .into_iter()
            .map(|event| event.path)
            .filter(|path| !Self::should_ignore(path, root_path))
            .collect();

        if paths.is_empty() {
            None
        } else {
            Some(WatchEvent::PathsChanged(paths.into_iter().collect()))
        }
    }

    /// 队列满时丢弃事件（下一次变化会再次触发刷新）
    fn forward(event_tx: &mpsc::Sender<WatchEvent>, event: WatchEvent) {
        match event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Refresh queue full, dropping file change event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Refresh queue closed");
            }
        }
    }

    /// 检查路径是否应该被忽略
    fn should_ignore(path: &Path, root_path: &Path) -> bool {
        let rel_path = match path.strip_prefix(root_path) {
            Ok(p) => p,
            Err(_) => return false,
        };

        // 检查父目录中是否包含需要忽略的目录（文件名本身不参与匹配，如 build.rs）
        let mut components: Vec<_> = rel_path.components().collect();
        components.pop();
        for component in components {
            if let std::path::Component::Normal(name) = component {
                let name_str = name.to_string_lossy();
                if IGNORE_DIRS.iter().any(|dir| name_str == *dir) {
                    return true;
                }
            }
        }

        // 检查完整路径是否匹配忽略模式（如 .git/objects），按路径段对齐
        let rel_str = rel_path.to_string_lossy().replace('\\', "/");
        IGNORE_DIRS.iter().any(|dir| {
            rel_str == *dir
                || rel_str
                    .strip_prefix(dir)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// 刷新工作线程：消费 `WatchEvent`，按仓库根合并后刷新缓存
///
/// After the first event of a batch the worker waits `coalesce`, drains the
/// queue, resolves each distinct parent directory to its repository root and
/// refreshes every distinct root once. Ends when all senders are dropped.
pub fn spawn_refresh_worker(
    cache: StatusCache,
    mut rx: mpsc::Receiver<WatchEvent>,
    coalesce: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(first) = rx.recv().await {
            let mut paths = first.into_paths();
            if !coalesce.is_zero() {
                tokio::time::sleep(coalesce).await;
            }
            while let Ok(more) = rx.try_recv() {
                paths.extend(more.into_paths());
            }

            let roots = resolve_roots(&paths);
            debug!(
                "Coalesced {} changed paths into {} refreshes",
                paths.len(),
                roots.len()
            );

            let mut refreshes = JoinSet::new();
            for root in roots {
                let cache = cache.clone();
                refreshes.spawn(async move { cache.refresh(&root).await });
            }
            while let Some(joined) = refreshes.join_next().await {
                if let Err(e) = joined {
                    warn!("Status refresh task failed: {}", e);
                }
            }
        }
        debug!("Refresh queue closed, worker exiting");
    })
}

/// Distinct repository roots for a batch of changed paths
fn resolve_roots(paths: &[PathBuf]) -> BTreeSet<RepositoryRoot> {
    let dirs: BTreeSet<&Path> = paths
        .iter()
        .map(|p| p.parent().unwrap_or(p.as_path()))
        .collect();

    dirs.into_iter().filter_map(resolve_repository_root).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::CountingSource;
    use std::fs;
    use std::sync::Arc;

    #[test]
    fn test_should_ignore() {
        let root = PathBuf::from("/project");

        // 应该忽略的路径
        assert!(WorkspaceWatcher::should_ignore(
            &PathBuf::from("/project/node_modules/foo.js"),
            &root
        ));
        assert!(WorkspaceWatcher::should_ignore(
            &PathBuf::from("/project/.git/objects/ab/cd1234"),
            &root
        ));
        assert!(WorkspaceWatcher::should_ignore(
            &PathBuf::from("/project/target/debug/main"),
            &root
        ));

        // 不应该忽略的路径
        assert!(!WorkspaceWatcher::should_ignore(
            &PathBuf::from("/project/src/main.rs"),
            &root
        ));
        assert!(!WorkspaceWatcher::should_ignore(
            &PathBuf::from("/project/.git/index"),
            &root
        ));
        assert!(!WorkspaceWatcher::should_ignore(
            &PathBuf::from("/project/.git/HEAD"),
            &root
        ));
    }

    #[test]
    fn test_files_named_like_ignored_dirs_are_watched() {
        let root = PathBuf::from("/project");
        for file in [
            "build.rs",
            "targets.md",
            "distribution.txt",
            "vendored_notes.md",
            "src/target",
            ".git/objects_note",
        ] {
            assert!(
                !WorkspaceWatcher::should_ignore(&root.join(file), &root),
                "{file} should trigger a refresh"
            );
        }
        assert!(WorkspaceWatcher::should_ignore(&root.join("node_modules"), &root));
        assert!(WorkspaceWatcher::should_ignore(
            &root.join("crates/app/target/debug/app"),
            &root
        ));
    }

    #[test]
    fn test_forward_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        WorkspaceWatcher::forward(&tx, WatchEvent::PathsChanged(vec!["/a".into()]));
        WorkspaceWatcher::forward(&tx, WatchEvent::PathsChanged(vec!["/b".into()]));

        assert_eq!(
            rx.try_recv().unwrap(),
            WatchEvent::PathsChanged(vec!["/a".into()])
        );
        assert!(rx.try_recv().is_err());
    }

    fn make_repo(tmp: &tempfile::TempDir, name: &str) -> PathBuf {
        let root = tmp.path().canonicalize().unwrap().join(name);
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        root
    }

    #[test]
    fn test_resolve_roots_dedups() {
        let tmp = tempfile::tempdir().unwrap();
        let a = make_repo(&tmp, "a");
        let b = make_repo(&tmp, "b");

        let roots = resolve_roots(&[
            a.join("src/one.rs"),
            a.join("src/two.rs"),
            a.join("README.md"),
            b.join("src/three.rs"),
        ]);
        let roots: Vec<PathBuf> = roots.into_iter().map(RepositoryRoot::into_path).collect();
        assert_eq!(roots, vec![a, b]);
    }

    #[tokio::test]
    async fn test_burst_for_one_root_collapses_to_one_refresh() {
        let tmp = tempfile::tempdir().unwrap();
        let root = make_repo(&tmp, "repo");

        let source = Arc::new(CountingSource::default());
        let cache = StatusCache::new(source.clone());
        let (tx, rx) = mpsc::channel(16);

        for i in 0..5 {
            tx.send(WatchEvent::PathsChanged(vec![root.join(format!("src/f{}.rs", i))]))
                .await
                .unwrap();
        }
        drop(tx);

        spawn_refresh_worker(cache.clone(), rx, Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(source.calls(), 1);
        let resolved = resolve_repository_root(&root).unwrap();
        assert!(cache.summary(&resolved).is_some());
    }

    #[tokio::test]
    async fn test_paths_outside_repositories_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let plain = tmp.path().canonicalize().unwrap().join("plain");
        fs::create_dir_all(&plain).unwrap();
        if resolve_repository_root(&plain).is_some() {
            return;
        }

        let source = Arc::new(CountingSource::default());
        let cache = StatusCache::new(source.clone());
        let (tx, rx) = mpsc::channel(4);
        tx.send(WatchEvent::PathsChanged(vec![plain.join("x.txt")]))
            .await
            .unwrap();
        drop(tx);

        spawn_refresh_worker(cache, rx, Duration::ZERO).await.unwrap();
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_watcher_reports_file_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let root = make_repo(&tmp, "watched");

        let (tx, mut rx) = mpsc::channel(16);
        let mut watcher = WorkspaceWatcher::new(tx);
        watcher
            .subscribe(root.clone(), Duration::from_millis(50))
            .unwrap();
        assert!(watcher.is_subscribed());

        fs::write(root.join("src/new.rs"), "fn main() {}\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no file change event")
            .expect("channel closed");
        let WatchEvent::PathsChanged(paths) = event;
        assert!(paths.iter().any(|p| p.ends_with("src/new.rs")), "{paths:?}");

        watcher.unsubscribe();
        assert!(!watcher.is_subscribed());
    }

    #[test]
    fn test_subscribe_missing_path() {
        let (tx, _rx) = mpsc::channel(1);
        let mut watcher = WorkspaceWatcher::new(tx);
        let err = watcher
            .subscribe(PathBuf::from("/definitely/not/here"), Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, WatchError::MissingPath(_)));
    }
}
