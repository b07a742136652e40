use async_trait::async_trait;
use pkg_types::lease::{AuthoritativeRecord, LeaseId};
use pkg_types::validate::validate_record;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transport for the authoritative bulk endpoint.
/// One call serves one chunk of at most `batch_size` ids.
#[async_trait]
pub trait LeaseSource: Send + Sync {
    async fn fetch_chunk(&self, ids: &[LeaseId]) -> anyhow::Result<Vec<AuthoritativeRecord>>;
}

/// A chunk that failed to load and was skipped for this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Position of the chunk in partition order
    pub index: usize,
    pub lease_ids: Vec<LeaseId>,
    pub reason: String,
}

/// Result of one fetch across all chunks.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Valid records from every chunk that succeeded, in chunk order
    pub records: Vec<AuthoritativeRecord>,
    pub failures: Vec<ChunkFailure>,
    pub chunks_requested: usize,
}

impl FetchOutcome {
    pub fn chunks_succeeded(&self) -> usize {
        self.chunks_requested - self.failures.len()
    }
}

/// Splits the tracked ids into bounded chunks and loads each independently.
///
/// Chunks are requested one after another. A failed or malformed chunk is
/// logged and skipped so it cannot hold back the others.
pub struct BatchFetcher {
    source: Arc<dyn LeaseSource>,
    batch_size: usize,
}

impl BatchFetcher {
    pub fn new(source: Arc<dyn LeaseSource>, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Deduplicate (keeping first occurrence) and split into chunks of at most `batch_size`.
    pub fn partition(&self, ids: &[LeaseId]) -> Vec<Vec<LeaseId>> {
        let mut seen = HashSet::new();
        let unique: Vec<LeaseId> = ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();
        unique
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    pub async fn fetch(&self, ids: &[LeaseId]) -> FetchOutcome {
        let chunks = self.partition(ids);
        let mut outcome = FetchOutcome {
            chunks_requested: chunks.len(),
            ..Default::default()
        };

        for (index, chunk) in chunks.into_iter().enumerate() {
            match self.source.fetch_chunk(&chunk).await {
                Ok(records) => {
                    debug!(
                        "Chunk {} returned {} records for {} ids",
                        index,
                        records.len(),
                        chunk.len()
                    );
                    for record in records {
                        match validate_record(&record) {
                            Ok(()) => outcome.records.push(record),
                            Err(e) => warn!("Chunk {}: dropping invalid record: {}", index, e),
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        "Chunk {} ({} ids) failed, skipping: {:#}",
                        index,
                        chunk.len(),
                        e
                    );
                    outcome.failures.push(ChunkFailure {
                        index,
                        lease_ids: chunk,
                        reason: format!("{:#}", e),
                    });
                }
            }
        }
        outcome
    }
}
