//! Alert state file

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::AlertState;

const NOTIFIED: &str = "True";
const ARMED: &str = "False";

/// Reads and writes the "already notified" flag
///
/// The file holds the literal `True` or `False`, so volumes written by earlier
/// deployments keep working.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, `None` when the file does not exist yet
    pub async fn load(&self) -> Result<Option<AlertState>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let trimmed = content.trim();
        if trimmed != NOTIFIED && trimmed != ARMED {
            warn!(
                path = %self.path.display(),
                content = trimmed,
                "Unrecognized state file content, treating as not notified"
            );
        }

        let updated_at = fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        let state = AlertState {
            notified: trimmed == NOTIFIED,
            updated_at,
        };

        debug!(path = %self.path.display(), notified = state.notified, "Loaded alert state");
        Ok(Some(state))
    }

    /// Persist the flag atomically (temp file + rename)
    pub async fn save(&self, notified: bool) -> Result<AlertState> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, if notified { NOTIFIED } else { ARMED }).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        info!(path = %self.path.display(), notified, "Alert state written");

        Ok(AlertState {
            notified,
            updated_at: Some(Utc::now()),
        })
    }

    /// Put back a state previously returned by [`load`](Self::load)
    ///
    /// `None` removes the file, so a store that did not exist before is
    /// missing again afterwards.
    pub async fn restore(&self, prior: Option<AlertState>) -> Result<()> {
        match prior {
            Some(state) => {
                self.save(state.notified).await?;
            }
            None => match fs::remove_file(&self.path).await {
                Ok(()) => info!(path = %self.path.display(), "Alert state removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
