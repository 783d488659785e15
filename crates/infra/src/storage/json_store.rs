//! JSON file repository for the submission queue
//!
//! Writes are atomic: the document is written to `<file>.tmp`, fsynced and
//! renamed over `<file>`, then its SHA-256 is written to `<file>.sha256`.
//! On load a checksum mismatch is only logged; the document is still decoded
//! leniently. A document that cannot be decoded at all is moved aside to
//! `<file>.corrupt-<unix-ts>` and the queue starts empty.
//!
//! One repository owns a queue file at a time: `open` takes an exclusive
//! lock on `<file>.lock` that is held until the last clone is dropped.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fs2::FileExt;
use linkstash_common::SharedClock;
use linkstash_core::SubmissionRepository;
use linkstash_domain::{
    decode_queue_document, encode_queue_document, LinkstashError, PendingSubmission, Result,
};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::InfraError;

/// Durable repository backed by a single JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
    clock: SharedClock,
    _lock: Arc<std::fs::File>,
}

impl JsonFileRepository {
    /// Open the queue at `path`, taking the exclusive lock beside it.
    ///
    /// # Errors
    ///
    /// `LinkstashError::Storage` when another repository, in this or another
    /// process, already holds the lock, or the lock file cannot be created.
    pub fn open(path: impl Into<PathBuf>, clock: SharedClock) -> Result<Self> {
        let path = path.into();
        let lock = acquire_lock(&with_suffix(&path, ".lock"))?;
        debug!(path = %path.display(), "acquired queue lock");
        Ok(Self { path, clock, _lock: Arc::new(lock) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checksum_path(&self) -> PathBuf {
        with_suffix(&self.path, ".sha256")
    }

    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, ".lock")
    }

    fn temp_path(&self) -> PathBuf {
        with_suffix(&self.path, ".tmp")
    }

    /// Move an undecodable document out of the way so the next save starts
    /// fresh. Returns where it went.
    async fn quarantine(&self) -> Result<PathBuf> {
        let stamp = self.clock.now().timestamp();
        let target = with_suffix(&self.path, &format!(".corrupt-{stamp}"));
        fs::rename(&self.path, &target).await.map_err(io_error)?;
        Ok(target)
    }
}

#[async_trait]
impl SubmissionRepository for JsonFileRepository {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<PendingSubmission>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("queue file does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(io_error(err)),
        };

        if let Ok(expected) = fs::read_to_string(self.checksum_path()).await {
            if expected.trim() != checksum(&data) {
                warn!("queue file checksum mismatch, file may be corrupted");
            }
        }

        match decode_queue_document(&data, self.clock.now()) {
            Ok(loaded) => {
                if loaded.dropped > 0 || loaded.repaired > 0 {
                    warn!(
                        dropped = loaded.dropped,
                        repaired = loaded.repaired,
                        "queue file contained malformed records"
                    );
                }
                info!(entries = loaded.entries.len(), "loaded queue file");
                Ok(loaded.entries)
            }
            Err(err) => {
                let moved_to = self.quarantine().await?;
                error!(
                    error = %err,
                    moved_to = %moved_to.display(),
                    "queue file unreadable, starting with an empty queue"
                );
                Ok(Vec::new())
            }
        }
    }

    #[instrument(skip(self, entries), fields(entry_count = entries.len()))]
    async fn save(&self, entries: &[PendingSubmission]) -> Result<()> {
        let data = encode_queue_document(entries, self.clock.now())?;
        let temp_path = self.temp_path();

        if let Some(parent) = temp_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .map_err(io_error)?;
        file.write_all(&data).await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        fs::rename(&temp_path, &self.path).await.map_err(io_error)?;

        // The document is already durable; a stale checksum only costs a
        // warning on the next load.
        if let Err(err) = fs::write(self.checksum_path(), checksum(&data)).await {
            warn!(error = %err, "failed to write queue checksum");
        }

        debug!(bytes = data.len(), "persisted queue file");
        Ok(())
    }
}

fn acquire_lock(lock_path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
        .map_err(io_error)?;
    file.try_lock_exclusive().map_err(|err| {
        LinkstashError::Storage(format!(
            "queue lock {} is held by another linkstash process: {err}",
            lock_path.display()
        ))
    })?;
    Ok(file)
}

fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn io_error(err: std::io::Error) -> LinkstashError {
    InfraError::from(err).into()
}

#[cfg(test)]
mod tests {
    use linkstash_common::{Clock, MockClock};
    use linkstash_domain::SubmissionStatus;
    use tempfile::TempDir;

    use super::*;

    fn repository(dir: &TempDir, clock: &MockClock) -> JsonFileRepository {
        JsonFileRepository::open(dir.path().join("queue.json"), clock.shared()).unwrap()
    }

    fn entry(url: &str, clock: &MockClock) -> PendingSubmission {
        PendingSubmission::new(url, Some("note"), Some("Safari"), clock.now())
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir, &MockClock::new());
        assert!(repo.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_preserves_entries() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new();
        let repo = repository(&dir, &clock);
        let first = entry("https://example.com/a", &clock);
        clock.advance(std::time::Duration::from_secs(1));
        let entries = vec![first, entry("https://example.com/b", &clock)];

        repo.save(&entries).await.unwrap();

        assert_eq!(repo.load().await.unwrap(), entries);
        assert!(repo.checksum_path().exists());
        assert!(!dir.path().join("queue.json.tmp").exists());

        let document: serde_json::Value =
            serde_json::from_slice(&std::fs::read(repo.path()).unwrap()).unwrap();
        assert_eq!(document["version"], 1);
        assert_eq!(document["submissions"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new();
        let repo =
            JsonFileRepository::open(dir.path().join("nested/deeper/queue.json"), clock.shared())
                .unwrap();
        assert!(repo.lock_path().exists());

        repo.save(&[entry("https://example.com/a", &clock)]).await.unwrap();
        assert_eq!(repo.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_open_is_refused_until_first_is_dropped() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new();
        let first = repository(&dir, &clock);
        let clone = first.clone();

        let err = JsonFileRepository::open(first.path(), clock.shared()).unwrap_err();
        assert!(matches!(err, LinkstashError::Storage(ref m) if m.contains("queue.json.lock")));

        drop(first);
        assert!(JsonFileRepository::open(clone.path(), clock.shared()).is_err());

        drop(clone);
        let reopened = repository(&dir, &clock);
        reopened.save(&[entry("https://example.com/a", &clock)]).await.unwrap();
        assert_eq!(reopened.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn checksum_mismatch_still_loads() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new();
        let repo = repository(&dir, &clock);
        repo.save(&[entry("https://example.com/a", &clock)]).await.unwrap();

        std::fs::write(repo.checksum_path(), "deadbeef").unwrap();

        assert_eq!(repo.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_file_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new();
        let repo = repository(&dir, &clock);
        std::fs::write(repo.path(), b"{ this is not json").unwrap();

        assert!(repo.load().await.unwrap().is_empty());

        assert!(!repo.path().exists());
        let quarantined = dir.path().join(format!("queue.json.corrupt-{}", clock.now().timestamp()));
        assert_eq!(std::fs::read(quarantined).unwrap(), b"{ this is not json");
    }

    #[tokio::test]
    async fn malformed_records_are_sanitized_on_load() {
        let dir = TempDir::new().unwrap();
        let clock = MockClock::new();
        let repo = repository(&dir, &clock);
        let document = serde_json::json!([
            {"url": "https://example.com/ok", "status": "queued"},
            {"url": "   "},
            "garbage",
            {"url": "https://example.com/odd", "status": "teleported", "attempt_count": -3}
        ]);
        std::fs::write(repo.path(), serde_json::to_vec(&document).unwrap()).unwrap();

        let entries = repo.load().await.unwrap();

        assert_eq!(entries.len(), 2);
        let odd = entries.iter().find(|e| e.url == "https://example.com/odd").unwrap();
        assert_eq!(odd.status, SubmissionStatus::Failed);
        assert!(!odd.can_retry);
        assert_eq!(odd.attempt_count, 0);
    }
}
