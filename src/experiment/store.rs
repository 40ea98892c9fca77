//! Client-side experiment collection.
//!
//! Mutations are short critical sections behind a `tokio::sync::RwLock`; no
//! caller holds the lock across a backend request.

use super::model::{DataEntry, Experiment, ExperimentId};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store handle shared by the session, the capture scheduler and its
/// correlation tasks.
pub type SharedStore = Arc<RwLock<ExperimentStore>>;

/// Experiments known to the client, the selection pointer and the most
/// recently merged capture.
#[derive(Debug, Default)]
pub struct ExperimentStore {
    experiments: Vec<Experiment>,
    selected: Option<ExperimentId>,
    last_captured: Option<DataEntry>,
}

impl ExperimentStore {
    /// Empty store with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a store for sharing between tasks.
    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// All experiments in backend order.
    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Replace the collection with a fresh listing from the backend.
    pub fn replace_all(&mut self, experiments: Vec<Experiment>) {
        self.experiments = experiments;
    }

    /// Append a newly created experiment.
    pub fn insert(&mut self, experiment: Experiment) {
        self.experiments.push(experiment);
    }

    /// Drop an experiment locally. Clears the selection if it pointed at it.
    pub fn remove(&mut self, id: &ExperimentId) -> Option<Experiment> {
        let index = self.experiments.iter().position(|e| &e.id == id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(self.experiments.remove(index))
    }

    pub fn get(&self, id: &ExperimentId) -> Option<&Experiment> {
        self.experiments.iter().find(|e| &e.id == id)
    }

    /// Point the selection at `id`. The experiment does not have to be known
    /// locally yet.
    pub fn select(&mut self, id: ExperimentId) {
        self.selected = Some(id);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&ExperimentId> {
        self.selected.as_ref()
    }

    /// Entries of the selected experiment, if it is known and carries any.
    pub fn selected_entries(&self) -> Option<&[DataEntry]> {
        let id = self.selected.as_ref()?;
        self.get(id)?.data_entries.as_deref()
    }

    pub fn last_captured(&self) -> Option<&DataEntry> {
        self.last_captured.as_ref()
    }

    /// Merge a captured entry into `experiment_id`, newest first.
    ///
    /// Returns false without touching anything when the experiment is no
    /// longer selected, is unknown, or holds no entry sequence.
    pub fn merge_capture(&mut self, experiment_id: &ExperimentId, entry: DataEntry) -> bool {
        if self.selected.as_ref() != Some(experiment_id) {
            return false;
        }
        let Some(entries) = self
            .experiments
            .iter_mut()
            .find(|e| &e.id == experiment_id)
            .and_then(|e| e.data_entries.as_mut())
        else {
            return false;
        };
        entries.insert(0, entry.clone());
        self.last_captured = Some(entry);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::model::EntryId;
    use chrono::Utc;

    fn experiment(id: &str, entries: Option<Vec<DataEntry>>) -> Experiment {
        Experiment {
            id: ExperimentId::new(id),
            name: format!("exp {id}"),
            description: String::new(),
            data_entries: entries,
        }
    }

    fn entry(id: &str) -> DataEntry {
        DataEntry {
            id: EntryId::new(id),
            timestamp: Utc::now(),
            temperature: Some(20.0),
            humidity: Some(45.0),
            experiment_id: None,
            image_filename: None,
        }
    }

    #[test]
    fn test_merge_prepends_newest_first() {
        let mut store = ExperimentStore::new();
        store.replace_all(vec![experiment("1", Some(vec![entry("10")]))]);
        store.select(ExperimentId::new("1"));

        assert!(store.merge_capture(&ExperimentId::new("1"), entry("11")));

        let ids: Vec<_> = store
            .selected_entries()
            .unwrap()
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["11", "10"]);
        assert_eq!(store.last_captured().unwrap().id.as_str(), "11");
    }

    #[test]
    fn test_merge_skips_experiment_without_entries() {
        let mut store = ExperimentStore::new();
        store.replace_all(vec![experiment("1", None)]);
        store.select(ExperimentId::new("1"));

        assert!(!store.merge_capture(&ExperimentId::new("1"), entry("11")));
        assert!(store.last_captured().is_none());
    }

    #[test]
    fn test_merge_skips_when_selection_moved() {
        let mut store = ExperimentStore::new();
        store.replace_all(vec![
            experiment("1", Some(vec![])),
            experiment("2", Some(vec![])),
        ]);
        store.select(ExperimentId::new("2"));

        assert!(!store.merge_capture(&ExperimentId::new("1"), entry("11")));
        assert!(store.experiments().iter().all(|e| e
            .data_entries
            .as_ref()
            .is_some_and(|entries| entries.is_empty())));
    }

    #[test]
    fn test_remove_clears_matching_selection() {
        let mut store = ExperimentStore::new();
        store.replace_all(vec![experiment("1", None), experiment("2", None)]);
        store.select(ExperimentId::new("1"));

        assert!(store.remove(&ExperimentId::new("1")).is_some());
        assert!(store.selected().is_none());
        assert!(store.remove(&ExperimentId::new("1")).is_none());
        assert_eq!(store.experiments().len(), 1);
    }
}
