use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::simulation::{SimulationConfig, SimulationResult};

pub type RunId = Uuid;

/// One persisted simulation run: the aggregated distributions plus enough
/// metadata to tell runs apart when reviewing them later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub created: DateTime<Utc>,
    pub config: SimulationConfig,
    pub result: SimulationResult,
}

#[derive(Debug, Display, From)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    #[display(fmt = "no stored run {}", _0)]
    #[from(ignore)]
    UnknownRun(RunId),
}

impl std::error::Error for StoreError {}

/// Writes simulation runs to a directory, one JSON document per run keyed
/// by run id, so reviewing a run never requires re-solving it.
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(dir: impl Into<PathBuf>) -> RunStore {
        RunStore { dir: dir.into() }
    }

    /// Persists the result under a fresh run id and returns the full record
    pub fn save(
        &self,
        config: &SimulationConfig,
        result: &SimulationResult,
    ) -> Result<RunRecord, StoreError> {
        let record = RunRecord {
            id: Uuid::new_v4(),
            created: Utc::now(),
            config: config.clone(),
            result: result.clone(),
        };

        fs::create_dir_all(&self.dir)?;
        let file = fs::File::create(self.path(record.id))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &record)?;

        info!("saved run {} to {}", record.id, self.dir.display());
        Ok(record)
    }

    pub fn load(&self, id: RunId) -> Result<RunRecord, StoreError> {
        let path = self.path(id);
        if !path.exists() {
            return Err(StoreError::UnknownRun(id));
        }

        let file = fs::File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// The ids of every run stored in the directory
    pub fn list(&self) -> Result<Vec<RunId>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let stem = path.file_stem().and_then(|s| s.to_str());
            if let Some(id) = stem.and_then(|s| Uuid::parse_str(s).ok()) {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    fn path(&self, id: RunId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}
