//! Model registry
//!
//! Front door for versioned artifacts. Wraps the file store with an
//! in-memory cache of loaded models, serialises publishes so version
//! numbers stay monotonic, and hands out per-dataset training locks so two
//! jobs cannot train on the same dataset at once.

use crate::artifact::{ArtifactDescription, ModelArtifact};
use crate::store::ArtifactStore;
use ahash::{AHashMap, AHashSet};
use fitscore_core::{Error, Result};
use fitscore_model::{Dataset, TrainedModel};
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct ModelRegistry {
    store: ArtifactStore,
    /// Loaded models by version. Artifacts are immutable once published,
    /// so cached entries never go stale.
    models: RwLock<AHashMap<u64, Arc<ModelArtifact>>>,
    /// Dataset versions with a training job in flight.
    in_flight: Arc<Mutex<AHashSet<u64>>>,
    /// Serialises version assignment across concurrent publishes.
    publish_lock: Mutex<()>,
}

impl ModelRegistry {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = ArtifactStore::open(root)?;
        let datasets = store.dataset_versions()?.len();
        let models = store.model_versions()?.len();
        info!(
            root = %store.root().display(),
            datasets,
            models,
            "registry opened"
        );
        Ok(Self {
            store,
            models: RwLock::new(AHashMap::new()),
            in_flight: Arc::new(Mutex::new(AHashSet::new())),
            publish_lock: Mutex::new(()),
        })
    }

    pub fn publish_dataset(&self, dataset: Dataset) -> Result<u64> {
        let _guard = self.publish_lock.lock();
        let version = self.store.put_dataset(dataset)?;
        info!(version, "dataset published");
        Ok(version)
    }

    pub fn dataset(&self, version: u64) -> Result<Dataset> {
        self.store.get_dataset(version)
    }

    pub fn publish_model(&self, dataset_version: u64, trained: TrainedModel) -> Result<Arc<ModelArtifact>> {
        let _guard = self.publish_lock.lock();
        let artifact = Arc::new(self.store.put_model(dataset_version, trained)?);
        self.models
            .write()
            .insert(artifact.version, Arc::clone(&artifact));
        info!(version = artifact.version, dataset_version, "model published");
        Ok(artifact)
    }

    /// Resolve a model by version, or the latest published one when no
    /// version is pinned.
    pub fn model(&self, version: Option<u64>) -> Result<Arc<ModelArtifact>> {
        let version = match version {
            Some(v) => v,
            None => self
                .store
                .latest_model_version()?
                .ok_or_else(|| Error::Training("no model has been published yet".to_string()))?,
        };

        if let Some(cached) = self.models.read().get(&version) {
            return Ok(Arc::clone(cached));
        }

        let artifact = Arc::new(self.store.get_model(version)?);
        self.models.write().insert(version, Arc::clone(&artifact));
        Ok(artifact)
    }

    pub fn latest_model_version(&self) -> Result<Option<u64>> {
        self.store.latest_model_version()
    }

    pub fn list_datasets(&self) -> Result<Vec<ArtifactDescription>> {
        self.store.list_datasets()
    }

    pub fn list_models(&self) -> Result<Vec<ArtifactDescription>> {
        self.store.list_models()
    }

    /// Claim the training lock for a dataset. Fails with a conflict when a
    /// job already holds it; the lock is released when the guard drops.
    pub fn begin_training(&self, dataset_version: u64) -> Result<TrainingGuard> {
        let mut in_flight = self.in_flight.lock();
        if !in_flight.insert(dataset_version) {
            return Err(Error::RegistryConflict(dataset_version));
        }
        Ok(TrainingGuard {
            in_flight: Arc::clone(&self.in_flight),
            dataset_version,
        })
    }
}

/// Holds the training lock for one dataset version.
pub struct TrainingGuard {
    in_flight: Arc<Mutex<AHashSet<u64>>>,
    dataset_version: u64,
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.dataset_version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitscore_core::normalize::{candidate_from_json, outcome_from_json, vacancy_from_json};
    use fitscore_model::{DatasetBuilder, DatasetConfig, GbdtParams, ModelTrainer};
    use serde_json::json;
    use tempfile::TempDir;

    fn trainable_dataset() -> Dataset {
        let candidates: Vec<_> = (0..10)
            .map(|i| {
                candidate_from_json(&json!({
                    "id": format!("c-{i}"),
                    "seniority_level": if i % 2 == 0 { "senior" } else { "junior" },
                    "skills": if i % 2 == 0 { vec!["rust"] } else { vec!["cobol"] },
                    "experience_years": i,
                    "resume_text": "engineer"
                }))
                .unwrap()
            })
            .collect();
        let vacancies = vec![vacancy_from_json(&json!({
            "id": "v-1",
            "title": "Senior Engineer",
            "required_skills": ["rust"],
            "description": "systems work"
        }))
        .unwrap()];
        let outcomes: Vec<_> = (0..10)
            .map(|i| {
                outcome_from_json(&json!({
                    "candidate_id": format!("c-{i}"),
                    "vacancy_id": "v-1",
                    "status": if i % 2 == 0 { "hired" } else { "declined" }
                }))
                .unwrap()
            })
            .collect();
        DatasetBuilder::new(DatasetConfig::default())
            .build(&candidates, &vacancies, &outcomes)
            .unwrap()
    }

    #[test]
    fn test_publish_and_resolve_latest() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();

        let dataset = trainable_dataset();
        let dataset_version = registry.publish_dataset(dataset.clone()).unwrap();
        let trained = ModelTrainer::new(GbdtParams::default())
            .train(&dataset)
            .unwrap();
        let published = registry.publish_model(dataset_version, trained).unwrap();
        assert_eq!(published.version, 1);

        let latest = registry.model(None).unwrap();
        assert_eq!(latest.version, 1);
        let pinned = registry.model(Some(1)).unwrap();
        assert_eq!(pinned.dataset_version, dataset_version);
    }

    #[test]
    fn test_resolve_with_no_models_fails() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();
        assert!(registry.model(None).is_err());
        assert!(matches!(
            registry.model(Some(3)),
            Err(Error::ModelNotFound(3))
        ));
    }

    #[test]
    fn test_training_lock_conflicts_and_releases() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::open(dir.path()).unwrap();

        let guard = registry.begin_training(5).unwrap();
        assert!(matches!(
            registry.begin_training(5),
            Err(Error::RegistryConflict(5))
        ));
        // A different dataset is unaffected.
        let other = registry.begin_training(6).unwrap();
        drop(other);
        drop(guard);
        assert!(registry.begin_training(5).is_ok());
    }

    #[test]
    fn test_versions_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let dataset = trainable_dataset();
        {
            let registry = ModelRegistry::open(dir.path()).unwrap();
            let dv = registry.publish_dataset(dataset.clone()).unwrap();
            let trained = ModelTrainer::new(GbdtParams::default())
                .train(&dataset)
                .unwrap();
            registry.publish_model(dv, trained).unwrap();
        }
        let registry = ModelRegistry::open(dir.path()).unwrap();
        assert_eq!(registry.latest_model_version().unwrap(), Some(1));
        assert_eq!(registry.model(None).unwrap().version, 1);
        assert_eq!(registry.dataset(1).unwrap().stats.total_examples, 10);
    }
}
