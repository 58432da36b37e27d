//! Manifest watcher - 파일 시스템 이벤트로 매니페스트 변경 감지
//!
//! 편집기는 파일을 새로 만들어 바꿔치기하는 경우가 많아서 파일 자체가 아니라
//! 상위 디렉토리를 감시하고 이름으로 거른다.

use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// 매니페스트 하나를 감시
pub struct ManifestWatcher {
    path: PathBuf,
    events: mpsc::Receiver<()>,
    debounce: Duration,
    _watcher: RecommendedWatcher,
}

impl ManifestWatcher {
    /// 감시 시작. `debounce` 동안 들어온 이벤트는 한 번의 변경으로 합친다.
    pub fn start(path: &Path, debounce: Duration) -> anyhow::Result<Self> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .with_context(|| format!("{} is not a file path", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        // 가득 차 있으면 이미 변경이 대기 중이다
        let (tx, events) = mpsc::channel(16);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if touches(&event, &file_name) => {
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => warn!("Manifest watch error: {}", e),
        })
        .context("Failed to create manifest watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;
        debug!("Watching {} in {}", path.display(), dir.display());

        Ok(Self {
            path,
            events,
            debounce,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 다음 변경까지 대기. 감시가 끊기면 `None`
    pub async fn changed(&mut self) -> Option<()> {
        self.events.recv().await?;
        tokio::time::sleep(self.debounce).await;
        while self.events.try_recv().is_ok() {}
        debug!("Manifest {} changed", self.path.display());
        Some(())
    }
}

/// 매니페스트 파일에 대한 내용 변경 이벤트인지
fn touches(event: &Event, file_name: &OsString) -> bool {
    !matches!(event.kind, EventKind::Access(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_touches_only_the_manifest() {
        let name = OsString::from("plugins.xml");

        assert!(touches(&event(EventKind::Modify(ModifyKind::Any), "/app/plugins.xml"), &name));
        assert!(touches(&event(EventKind::Create(CreateKind::File), "/app/plugins.xml"), &name));
        assert!(!touches(&event(EventKind::Modify(ModifyKind::Any), "/app/other.xml"), &name));
        assert!(!touches(&event(EventKind::Access(AccessKind::Any), "/app/plugins.xml"), &name));
    }

    #[tokio::test]
    async fn test_detects_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.xml");
        std::fs::write(&path, "<plugins/>").unwrap();

        let mut watcher = ManifestWatcher::start(&path, Duration::from_millis(50)).unwrap();
        assert_eq!(watcher.path(), path);

        std::fs::write(&path, "<plugins><plugin/></plugins>").unwrap();

        let changed = tokio::time::timeout(Duration::from_secs(10), watcher.changed()).await;
        assert_eq!(changed.ok().flatten(), Some(()));
    }

    #[tokio::test]
    async fn test_ignores_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.xml");
        std::fs::write(&path, "<plugins/>").unwrap();

        let mut watcher = ManifestWatcher::start(&path, Duration::from_millis(10)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

        let changed = tokio::time::timeout(Duration::from_millis(500), watcher.changed()).await;
        assert!(changed.is_err());
    }
}
