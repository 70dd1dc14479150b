//! Filesystem layout and batch sizing for a pipeline run.

use std::path::{Path, PathBuf};

use crate::PipelineError;

/// Records per global index batch.
pub const DEFAULT_INDEX_BATCH_SIZE: usize = 10_000;
/// Rows per judge entity chunk.
pub const DEFAULT_JUDGE_BATCH_SIZE: usize = 1_000_000;
/// Title lines above the header of the pending-cases table.
pub const PENDING_CASES_PREAMBLE: usize = 4;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Root holding `data/` and `projects/`.
    pub base_dir: PathBuf,
    /// Raw case archive (`<court>/json/<year>/<case>.json`).
    pub pacer_dir: Option<PathBuf>,
    pub index_batch_size: usize,
    pub judge_batch_size: usize,
    pub pending_preamble_lines: usize,
}

impl Settings {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pacer_dir: None,
            index_batch_size: DEFAULT_INDEX_BATCH_SIZE,
            judge_batch_size: DEFAULT_JUDGE_BATCH_SIZE,
            pending_preamble_lines: PENDING_CASES_PREAMBLE,
        }
    }

    pub fn with_pacer_dir(mut self, pacer_dir: impl Into<PathBuf>) -> Self {
        self.pacer_dir = Some(pacer_dir.into());
        self
    }

    pub fn pacer_dir(&self) -> Result<&Path, PipelineError> {
        self.pacer_dir.as_deref().ok_or(PipelineError::MissingPacerDir)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.base_dir.join("projects")
    }

    pub fn global_index_path(&self) -> PathBuf {
        self.data_dir().join("global_index.csv")
    }

    pub fn courts_path(&self) -> PathBuf {
        self.data_dir().join("courts.csv")
    }

    pub fn cases_pending_path(&self) -> PathBuf {
        self.data_dir().join("cases_pending.csv")
    }

    pub fn judge_entities_path(&self) -> PathBuf {
        self.data_dir().join("judge_entities.csv")
    }

    pub fn judge_index_path(&self) -> PathBuf {
        self.data_dir().join("judge_index.csv")
    }

    pub fn fjc_judges_path(&self) -> PathBuf {
        self.data_dir().join("fjc_judges.csv")
    }
}
