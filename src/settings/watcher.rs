use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{Event, RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::settings::{Result, SettingsError};

/// API 정의 파일 변경 이벤트
#[derive(Debug, PartialEq, Clone)]
pub enum ConfigEvent {
    Modified(PathBuf),
    Created(PathBuf),
    Deleted(PathBuf),
}

impl ConfigEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::Modified(p) | Self::Created(p) | Self::Deleted(p) => p,
        }
    }

    /// 다시 읽을 필요가 있는 이벤트인지
    pub fn requires_reload(&self) -> bool {
        !matches!(self, Self::Deleted(_))
    }
}

/// API 정의 파일 감시자
///
/// 편집기가 파일을 새로 쓰는 경우도 잡기 위해 부모 디렉토리를 감시하고
/// 파일 이름으로 걸러냅니다.
pub struct ConfigWatcher {
    target: PathBuf,
    event_tx: mpsc::Sender<ConfigEvent>,
    event_rx: mpsc::Receiver<ConfigEvent>,
    watcher: Option<RecommendedWatcher>,
}

impl ConfigWatcher {
    pub fn new<P: Into<PathBuf>>(target: P) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            target: target.into(),
            event_tx,
            event_rx,
            watcher: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    #[cfg(test)]
    pub fn get_sender(&self) -> mpsc::Sender<ConfigEvent> {
        self.event_tx.clone()
    }

    pub fn start(&mut self) -> Result<()> {
        let event_tx = self.event_tx.clone();
        let file_name: OsString = self
            .target
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| SettingsError::WatchError(format!("파일 경로가 아님: {}", self.target.display())))?;

        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: NotifyResult<Event>| {
            match res {
                Ok(event) => {
                    use notify::EventKind::*;

                    for path in event.paths {
                        if path.file_name() != Some(file_name.as_os_str()) {
                            continue;
                        }
                        let config_event = match event.kind {
                            Modify(_) => ConfigEvent::Modified(path),
                            Create(_) => ConfigEvent::Created(path),
                            Remove(_) => ConfigEvent::Deleted(path),
                            _ => continue,
                        };
                        debug!(event = ?config_event, "API 정의 파일 변경 감지");
                        let _ = event_tx.blocking_send(config_event);
                    }
                }
                Err(e) => error!("감시 오류: {}", e),
            }
        })
        .map_err(|e| SettingsError::WatchError(e.to_string()))?;

        let dir = match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        debug!("경로 감시 시작: {}", dir.display());
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| SettingsError::WatchError(e.to_string()))?;

        self.watcher = Some(watcher);
        Ok(())
    }

    /// 다음 이벤트를 기다립니다.
    pub async fn watch(&mut self) -> Option<ConfigEvent> {
        self.event_rx.recv().await
    }
}
