//! Capture result correlation.

use crate::backend::Backend;
use crate::error::AppResult;
use crate::experiment::{DataEntry, EntryId, ExperimentId, SharedStore};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What happened to a successful capture.
#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    /// The entry was prepended to the selected experiment.
    Merged(DataEntry),
    /// The capture succeeded but there was no matching local experiment to
    /// merge it into (nothing selected, or the selection moved on).
    Discarded(EntryId),
}

/// Triggers a capture and merges the resulting entry into the store.
pub struct CaptureCorrelator {
    backend: Arc<dyn Backend>,
    store: SharedStore,
}

impl CaptureCorrelator {
    pub fn new(backend: Arc<dyn Backend>, store: SharedStore) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Capture now and correlate the result with `selected`.
    ///
    /// Network failures are logged and returned; the store is left untouched
    /// and nothing is retried. A record whose experiment is no longer
    /// selected (or no longer known) by the time it arrives is dropped.
    pub async fn capture_and_correlate(
        &self,
        selected: Option<ExperimentId>,
    ) -> AppResult<Correlation> {
        let receipt = match self.backend.trigger_capture().await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!("Error capturing data: {}", e);
                return Err(e);
            }
        };
        info!("Data captured: entry {}", receipt.id);

        let Some(experiment_id) = selected else {
            debug!("No experiment selected, not resolving entry {}", receipt.id);
            return Ok(Correlation::Discarded(receipt.id));
        };

        let entry = match self.backend.fetch_entry(&experiment_id, &receipt.id).await {
            Ok(entry) => entry,
            Err(e) => {
                error!("Error fetching data entry details: {}", e);
                return Err(e);
            }
        };

        let merged = self
            .store
            .write()
            .await
            .merge_capture(&experiment_id, entry.clone());
        if merged {
            debug!("Entry {} merged into experiment {}", entry.id, experiment_id);
            Ok(Correlation::Merged(entry))
        } else {
            debug!(
                "Experiment {} no longer selected, discarding entry {}",
                experiment_id, entry.id
            );
            Ok(Correlation::Discarded(entry.id))
        }
    }
}
