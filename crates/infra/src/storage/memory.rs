use async_trait::async_trait;
use linkstash_core::SubmissionRepository;
use linkstash_domain::{PendingSubmission, Result};
use parking_lot::Mutex;

/// Repository that keeps the last saved snapshot in memory only.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    entries: Mutex<Vec<PendingSubmission>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository, as if `entries` had been saved earlier.
    pub fn with_entries(entries: Vec<PendingSubmission>) -> Self {
        Self { entries: Mutex::new(entries) }
    }

    pub fn snapshot(&self) -> Vec<PendingSubmission> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn load(&self) -> Result<Vec<PendingSubmission>> {
        Ok(self.entries.lock().clone())
    }

    async fn save(&self, entries: &[PendingSubmission]) -> Result<()> {
        *self.entries.lock() = entries.to_vec();
        Ok(())
    }
}
