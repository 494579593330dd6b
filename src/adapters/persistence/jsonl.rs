//! JSONL Sink - Append-only Daily Observation Files
//!
//! Persists observations to daily JSONL files in the format
//! `observations/YYYY-MM-DD.jsonl` (date of the cycle timestamp). Each line
//! is a self-contained JSON record. Natural keys of every stored row are
//! kept in memory and rebuilt from disk on open, so duplicates are
//! detected across restarts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::error::PriceError;
use crate::domain::observation::{ObservationKey, PriceObservation};
use crate::ports::sink::ObservationSink;

/// Append-only JSONL observation store with daily file rotation.
pub struct JsonlSink {
    /// Directory holding the daily files.
    dir: PathBuf,
    /// Keys already on disk. The lock also serialises appends.
    keys: Mutex<HashSet<ObservationKey>>,
}

impl JsonlSink {
    /// Open (or create) the store under `data_dir/observations`.
    ///
    /// # Errors
    /// Fails if the directory cannot be created or existing files cannot
    /// be read.
    pub async fn open(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir).join("observations");
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let keys: HashSet<ObservationKey> = load_observations(&dir)
            .await?
            .iter()
            .map(PriceObservation::key)
            .collect();

        info!(dir = %dir.display(), stored = keys.len(), "JSONL sink opened");

        Ok(Self {
            dir,
            keys: Mutex::new(keys),
        })
    }

    fn file_for(&self, observation: &PriceObservation) -> PathBuf {
        let date = observation.timestamp.format("%Y-%m-%d");
        self.dir.join(format!("{date}.jsonl"))
    }

    async fn append(&self, observation: &PriceObservation) -> Result<()> {
        let mut json =
            serde_json::to_string(observation).context("Failed to serialize observation")?;
        json.push('\n');

        let path = self.file_for(observation);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write observation")?;
        file.flush().await.context("Failed to flush observation log")?;

        Ok(())
    }
}

async fn load_observations(dir: &Path) -> Result<Vec<PriceObservation>> {
    let mut observations = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "jsonl") {
            continue;
        }
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PriceObservation>(line) {
                Ok(observation) => observations.push(observation),
                Err(e) => warn!(
                    file = %path.display(),
                    error = %e,
                    "Skipping malformed observation record"
                ),
            }
        }
    }

    observations.sort_by_key(|o| o.timestamp);
    Ok(observations)
}

#[async_trait]
impl ObservationSink for JsonlSink {
    #[instrument(skip(self, observation), fields(key = %observation.key()))]
    async fn persist(&self, observation: &PriceObservation) -> Result<(), PriceError> {
        let key = observation.key();
        let mut keys = self.keys.lock().await;
        if keys.contains(&key) {
            return Err(PriceError::DuplicateObservation(key.to_string()));
        }

        self.append(observation)
            .await
            .map_err(|e| PriceError::SinkFailure(format!("{e:#}")))?;
        keys.insert(key);
        debug!("Observation appended");
        Ok(())
    }

    async fn is_healthy(&self) -> bool {
        let probe = self.dir.join(".health_check");
        let result = fs::write(&probe, b"ok").await;
        let _ = fs::remove_file(&probe).await;
        result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;

    fn temp_dir() -> String {
        std::env::temp_dir()
            .join(format!("lst-jsonl-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    fn observation(network: &str) -> PriceObservation {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        PriceObservation::secondary(ts, "rETH", network, dec!(1.1), dec!(0.047619))
    }

    #[tokio::test]
    async fn test_appends_to_daily_file() {
        let dir = temp_dir();
        let sink = JsonlSink::open(&dir).await.unwrap();
        sink.persist(&observation("ethereum")).await.unwrap();
        sink.persist(&observation("arbitrum")).await.unwrap();

        let file = Path::new(&dir).join("observations").join("2024-03-01.jsonl");
        let content = fs::read_to_string(file).await.unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(load_observations(&sink.dir).await.unwrap()[0].price, dec!(1.1));
        assert!(sink.is_healthy().await);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let dir = temp_dir();
        let sink = JsonlSink::open(&dir).await.unwrap();
        sink.persist(&observation("ethereum")).await.unwrap();

        let err = sink.persist(&observation("ethereum")).await.unwrap_err();
        assert!(matches!(err, PriceError::DuplicateObservation(_)));
        assert_eq!(load_observations(&sink.dir).await.unwrap().len(), 1);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_duplicate_detected_after_reopen() {
        let dir = temp_dir();
        {
            let sink = JsonlSink::open(&dir).await.unwrap();
            sink.persist(&observation("base")).await.unwrap();
        }

        let reopened = JsonlSink::open(&dir).await.unwrap();
        let err = reopened.persist(&observation("base")).await.unwrap_err();
        assert_eq!(err.kind(), "duplicate_observation");

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_malformed_lines_skipped_on_open() {
        let dir = temp_dir();
        let obs_dir = Path::new(&dir).join("observations");
        fs::create_dir_all(&obs_dir).await.unwrap();
        fs::write(obs_dir.join("2024-03-01.jsonl"), "{not json}\n\n")
            .await
            .unwrap();

        let sink = JsonlSink::open(&dir).await.unwrap();
        assert!(load_observations(&sink.dir).await.unwrap().is_empty());

        let _ = fs::remove_dir_all(&dir).await;
    }
}
