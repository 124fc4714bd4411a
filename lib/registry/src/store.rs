//! Artifact store
//!
//! Gzipped JSON files under a root directory, one subdirectory per artifact
//! family. Writes go through a temp file and an atomic rename that refuses
//! to overwrite, so a version on disk is always complete and never mutated.

use crate::artifact::{ArtifactDescription, DatasetArtifact, ModelArtifact};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use fitscore_core::{Error, Result};
use fitscore_model::Dataset;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const DATASET_DIR: &str = "datasets";
const MODEL_DIR: &str = "models";

/// File-backed store for versioned artifacts.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the directory layout if
    /// needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(DATASET_DIR))?;
        fs::create_dir_all(root.join(MODEL_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dataset_path(&self, version: u64) -> PathBuf {
        self.root
            .join(DATASET_DIR)
            .join(format!("dataset-{version:06}.json.gz"))
    }

    fn model_path(&self, version: u64) -> PathBuf {
        self.root
            .join(MODEL_DIR)
            .join(format!("model-{version:06}.json.gz"))
    }

    /// Store a dataset under the next free version and return that version.
    pub fn put_dataset(&self, dataset: Dataset) -> Result<u64> {
        let version = self.next_version(DATASET_DIR)?;
        let artifact = DatasetArtifact { version, dataset };
        self.write_gz(&self.dataset_path(version), &artifact)?;
        debug!(version, "dataset stored");
        Ok(version)
    }

    pub fn get_dataset(&self, version: u64) -> Result<Dataset> {
        let path = self.dataset_path(version);
        if !path.exists() {
            return Err(Error::DatasetNotFound(version));
        }
        let artifact: DatasetArtifact = self.read_gz(&path)?;
        Ok(artifact.dataset)
    }

    /// Store a model artifact under the next free version. The version is
    /// assigned here and stamped into the artifact before it is written.
    pub fn put_model(
        &self,
        dataset_version: u64,
        trained: fitscore_model::TrainedModel,
    ) -> Result<ModelArtifact> {
        let version = self.next_version(MODEL_DIR)?;
        let artifact = ModelArtifact::new(version, dataset_version, trained);
        self.write_gz(&self.model_path(version), &artifact)?;
        debug!(version, dataset_version, "model stored");
        Ok(artifact)
    }

    pub fn get_model(&self, version: u64) -> Result<ModelArtifact> {
        let path = self.model_path(version);
        if !path.exists() {
            return Err(Error::ModelNotFound(version));
        }
        self.read_gz(&path)
    }

    pub fn dataset_versions(&self) -> Result<Vec<u64>> {
        self.versions_in(DATASET_DIR)
    }

    pub fn model_versions(&self) -> Result<Vec<u64>> {
        self.versions_in(MODEL_DIR)
    }

    pub fn latest_model_version(&self) -> Result<Option<u64>> {
        Ok(self.model_versions()?.last().copied())
    }

    pub fn list_datasets(&self) -> Result<Vec<ArtifactDescription>> {
        self.describe_all(DATASET_DIR)
    }

    pub fn list_models(&self) -> Result<Vec<ArtifactDescription>> {
        self.describe_all(MODEL_DIR)
    }

    fn next_version(&self, dir: &str) -> Result<u64> {
        let last = self.versions_in(dir)?.last().copied().unwrap_or(0);
        Ok(last + 1)
    }

    /// Sorted versions parsed from the filenames in one family directory.
    /// Files that do not match the naming pattern are ignored.
    fn versions_in(&self, dir: &str) -> Result<Vec<u64>> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(self.root.join(dir))? {
            let entry = entry?;
            if let Some(version) = parse_version(&entry.file_name().to_string_lossy()) {
                versions.push(version);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn describe_all(&self, dir: &str) -> Result<Vec<ArtifactDescription>> {
        let mut descriptions = Vec::new();
        for version in self.versions_in(dir)? {
            let path = match dir {
                DATASET_DIR => self.dataset_path(version),
                _ => self.model_path(version),
            };
            descriptions.push(describe_file(version, &path)?);
        }
        Ok(descriptions)
    }

    fn write_gz<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value)?;
        let file = AtomicFile::new(path, OverwriteBehavior::DisallowOverwrite);
        file.write(|f| {
            let mut encoder = GzEncoder::new(f, Compression::default());
            encoder.write_all(&json)?;
            encoder.try_finish()
        })
        .map_err(|e| Error::Storage(format!("writing {}: {e}", path.display())))?;
        Ok(())
    }

    fn read_gz<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let file = fs::File::open(path)?;
        let mut decoder = GzDecoder::new(std::io::BufReader::new(file));
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .map_err(|e| Error::Storage(format!("reading {}: {e}", path.display())))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

fn parse_version(filename: &str) -> Option<u64> {
    let stem = filename.strip_suffix(".json.gz")?;
    let (_, digits) = stem.rsplit_once('-')?;
    digits.parse().ok()
}

fn describe_file(version: u64, path: &Path) -> Result<ArtifactDescription> {
    let bytes = fs::read(path)?;
    let metadata = fs::metadata(path)?;
    let created = metadata
        .modified()
        .ok()
        .map(DateTime::<Utc>::from);
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ArtifactDescription {
        version,
        filename,
        size_bytes: bytes.len() as u64,
        sha256: format!("{:x}", hasher.finalize()),
        created,
    })
}
