//! Training jobs
//!
//! Asynchronous training on dedicated worker threads. A job claims the
//! dataset's training lock up front, runs the trainer with a cooperative
//! cancellation flag, and publishes on success. Poll by job id; a failed or
//! cancelled job leaves the registry exactly as it was.

use crate::registry::ModelRegistry;
use fitscore_core::{Error, Result};
use fitscore_model::{GbdtParams, ModelTrainer, ValidationMetrics};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed {
        model_version: u64,
        metrics: ValidationMetrics,
    },
    Failed {
        error: String,
    },
    Cancelled,
}

struct JobEntry {
    status: JobStatus,
    cancel: Arc<AtomicBool>,
}

pub struct TrainingJobManager {
    registry: Arc<ModelRegistry>,
    jobs: Arc<RwLock<HashMap<Uuid, JobEntry>>>,
}

impl TrainingJobManager {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start a training job for a published dataset. Returns the job id
    /// immediately; progress is observed through `status`. Fails up front
    /// when the dataset is missing or already being trained on.
    pub fn submit(&self, dataset_version: u64, params: GbdtParams) -> Result<Uuid> {
        let guard = self.registry.begin_training(dataset_version)?;
        let dataset = self.registry.dataset(dataset_version)?;

        let id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));
        self.jobs.write().insert(
            id,
            JobEntry {
                status: JobStatus::Pending,
                cancel: Arc::clone(&cancel),
            },
        );

        let registry = Arc::clone(&self.registry);
        let jobs = Arc::clone(&self.jobs);
        let spawned = thread::Builder::new()
            .name(format!("train-{id}"))
            .spawn(move || {
                // Lock lives for the whole job.
                let _guard = guard;
                set_status(&jobs, id, JobStatus::Running);
                info!(job = %id, dataset_version, "training job started");

                let result = ModelTrainer::new(params).train_with_cancel(&dataset, &cancel);
                let status = match result {
                    Ok(trained) => match registry.publish_model(dataset_version, trained) {
                        Ok(artifact) => {
                            info!(job = %id, version = artifact.version, "training job completed");
                            JobStatus::Completed {
                                model_version: artifact.version,
                                metrics: artifact.trained.metrics.clone(),
                            }
                        }
                        Err(e) => {
                            error!(job = %id, "publish failed: {e}");
                            JobStatus::Failed {
                                error: e.to_string(),
                            }
                        }
                    },
                    Err(_) if cancel.load(Ordering::Relaxed) => {
                        info!(job = %id, "training job cancelled");
                        JobStatus::Cancelled
                    }
                    Err(e) => {
                        error!(job = %id, "training job failed: {e}");
                        JobStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                set_status(&jobs, id, status);
            });

        if let Err(e) = spawned {
            self.jobs.write().remove(&id);
            return Err(Error::Io(e));
        }
        Ok(id)
    }

    pub fn status(&self, id: Uuid) -> Option<JobStatus> {
        self.jobs.read().get(&id).map(|entry| entry.status.clone())
    }

    /// Request cancellation. Returns false when the job is unknown or has
    /// already reached a terminal state.
    pub fn cancel(&self, id: Uuid) -> bool {
        let jobs = self.jobs.read();
        match jobs.get(&id) {
            Some(entry)
                if matches!(entry.status, JobStatus::Pending | JobStatus::Running) =>
            {
                entry.cancel.store(true, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }
}

fn set_status(jobs: &RwLock<HashMap<Uuid, JobEntry>>, id: Uuid, status: JobStatus) {
    if let Some(entry) = jobs.write().get_mut(&id) {
        entry.status = status;
    }
}
