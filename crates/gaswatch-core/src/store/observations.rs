//! Append-only observation log (JSON Lines)

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::PriceObservation;

/// How far back from the end of the log to look for the last record
const TAIL_WINDOW: u64 = 8 * 1024;

/// One JSON object per line, never rewritten in place
#[derive(Debug, Clone)]
pub struct ObservationLog {
    path: PathBuf,
}

impl ObservationLog {
    /// Create a log backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one observation
    ///
    /// Fails with [`Error::Validation`] if the last recorded observation has
    /// the same timestamp; nothing is written in that case. A torn final line
    /// left by an interrupted write is closed off first, so the new record
    /// always starts on a line of its own.
    pub async fn append(&self, observation: &PriceObservation) -> Result<()> {
        if let Some(last) = self.last().await? {
            if last.timestamp == observation.timestamp {
                return Err(Error::validation(format!(
                    "an observation at {} is already recorded",
                    observation.timestamp.to_rfc3339()
                )));
            }
        }

        let mut line = Vec::new();
        if self.ends_mid_line().await? {
            warn!(path = %self.path.display(), "Log ends with a partial line, starting a new one");
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, observation)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.sync_data().await?;

        info!(
            path = %self.path.display(),
            run_id = %observation.run_id,
            value = observation.value,
            "Observation recorded"
        );
        Ok(())
    }

    /// Every readable observation, oldest first
    ///
    /// Lines that do not parse are skipped with a warning.
    pub async fn read_all(&self) -> Result<Vec<PriceObservation>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let observations: Vec<PriceObservation> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| self.parse_line(index + 1, line))
            .collect();

        debug!(path = %self.path.display(), count = observations.len(), "Read observation log");
        Ok(observations)
    }

    /// The `limit` most recent observations, oldest first
    pub async fn tail(&self, limit: usize) -> Result<Vec<PriceObservation>> {
        let mut all = self.read_all().await?;
        let skip = all.len().saturating_sub(limit);
        Ok(all.split_off(skip))
    }

    /// The most recent readable observation, without reading the whole log
    pub async fn last(&self) -> Result<Option<PriceObservation>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        let start = len.saturating_sub(TAIL_WINDOW);
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::with_capacity((len - start) as usize);
        file.read_to_end(&mut buf).await?;

        let window = String::from_utf8_lossy(&buf);
        // The window may start mid-line; drop everything before the first break.
        let complete = if start == 0 {
            Some(&window[..])
        } else {
            window.find('\n').map(|i| &window[i + 1..])
        };

        if let Some(complete) = complete {
            for line in complete.lines().rev().filter(|line| !line.trim().is_empty()) {
                match serde_json::from_str(line) {
                    Ok(observation) => return Ok(Some(observation)),
                    Err(e) => warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Skipping unreadable line at the end of the log"
                    ),
                }
            }
            if start == 0 {
                return Ok(None);
            }
        }

        // No readable record fits in the window.
        Ok(self.read_all().await?.pop())
    }

    async fn ends_mid_line(&self) -> Result<bool> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if file.metadata().await?.len() == 0 {
            return Ok(false);
        }

        file.seek(SeekFrom::End(-1)).await?;
        Ok(file.read_u8().await? != b'\n')
    }

    fn parse_line(&self, number: usize, line: &str) -> Option<PriceObservation> {
        match serde_json::from_str(line) {
            Ok(observation) => Some(observation),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    line = number,
                    error = %e,
                    "Skipping unreadable log line"
                );
                None
            }
        }
    }
}
