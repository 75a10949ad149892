//! Write-back of server responses into the local store.
//!
//! The server's answer is authoritative: inserted and updated records are
//! upserted as returned, deleted records are removed by the key the server
//! echoed back. Responses are validated in full before anything is written,
//! and the whole transaction lands in a single batch.

use ferry_core::KeyExtractor;
use ferry_mutation::MutationType;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::pipeline::MutationResponse;
use crate::store::{LocalWriter, WriteBatch};

/// Folds replay responses into the local store.
#[derive(Debug, Clone, Default)]
pub struct ApplyWrite {
    key_extractor: KeyExtractor,
}

impl ApplyWrite {
    pub fn new(key_extractor: KeyExtractor) -> Self {
        Self { key_extractor }
    }

    /// Validate `responses` and turn them into one write batch.
    pub fn batch(&self, responses: &[MutationResponse]) -> SyncResult<WriteBatch> {
        let mut batch = WriteBatch::new();

        for MutationResponse {
            mutation_type,
            response,
        } in responses
        {
            if response.data.is_empty() {
                return Err(SyncError::empty_response(*mutation_type));
            }

            for record in &response.data {
                match mutation_type {
                    MutationType::Delete => {
                        let key = self
                            .key_extractor
                            .extract(record)
                            .map_err(|e| SyncError::missing_key(*mutation_type, e))?;
                        batch.delete(key);
                    }
                    MutationType::Insert | MutationType::Update => batch.upsert(record.clone()),
                }
            }
        }

        Ok(batch)
    }

    /// Apply `responses` to `store` in exactly one batch.
    pub fn apply_write(
        &self,
        responses: &[MutationResponse],
        store: &dyn LocalWriter,
    ) -> SyncResult<()> {
        let batch = self.batch(responses)?;
        debug!(responses = responses.len(), ops = batch.len(), "applying write batch");
        store.write_batch(batch)
    }
}
