//! Projects: a named scope plus the per-project tables derived from it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::compute::filter_record_batch;
use arrow::datatypes::SchemaRef;
use pacer_core::{Scope, index};
use pacer_store::{TableWriter, WriteMode, read_table, remove_table};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::columns::{column, int};
use crate::judges::{JudgeBatchJoiner, JudgeDataProcessor};
use crate::{PipelineError, Settings};

/// File a project is declared in, under `projects/<name>/`.
pub const PROJECT_FILE: &str = "project.json";

/// On-disk declaration of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    scope: Scope,
    project_dir: PathBuf,
}

/// Which stages [`Project::build`] ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub case_index_rows: Option<usize>,
    pub judge_rows: Option<usize>,
    pub processed_rows: Option<usize>,
}

impl Project {
    pub fn new(name: impl Into<String>, scope: Scope, projects_dir: &Path) -> Self {
        let name = name.into();
        let project_dir = projects_dir.join(&name);
        Self {
            name,
            scope,
            project_dir,
        }
    }

    /// Read a project declaration. The project's tables live under
    /// `<projects_dir>/<name>/data` whatever directory the file sits in.
    pub fn load(path: &Path, projects_dir: &Path) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ProjectConfig =
            serde_json::from_str(&text).map_err(|source| PipelineError::ProjectFile {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(config.name, config.scope, projects_dir))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn data_dir(&self) -> PathBuf {
        self.project_dir.join("data")
    }

    pub fn case_index_path(&self) -> PathBuf {
        self.data_dir().join("case_index.csv")
    }

    pub fn judge_data_path(&self) -> PathBuf {
        self.data_dir().join("judges.csv")
    }

    pub fn processed_judge_data_path(&self) -> PathBuf {
        self.data_dir().join("processed_judges.csv")
    }

    /// Filter the global index through this project's scope.
    ///
    /// Surviving rows keep their global order. The case index is replaced
    /// atomically, so rebuilding for the same scope reproduces it exactly.
    pub fn build_case_index(&self, settings: &Settings) -> Result<usize, PipelineError> {
        let schema: SchemaRef = Arc::new(index::global_index_schema());
        let mut writer = TableWriter::create(
            &self.case_index_path(),
            Arc::clone(&schema),
            WriteMode::Fresh,
        )?;
        let mut scanned = 0;
        for batch in read_table(&settings.global_index_path(), schema, settings.index_batch_size)? {
            let batch = batch?;
            scanned += batch.num_rows();
            let mask = self.scope.mask(&batch)?;
            writer.write(&filter_record_batch(&batch, &mask)?)?;
        }
        let rows = writer.finish()?;
        info!(project = %self.name, scanned, rows, "case index built");
        Ok(rows)
    }

    /// Run the pipeline stages whose outputs are missing.
    ///
    /// `reset` discards the case index first, which forces every later
    /// stage to rebuild as well.
    pub fn build(&self, settings: &Settings, reset: bool) -> Result<BuildReport, PipelineError> {
        let mut report = BuildReport::default();
        if reset {
            for path in [
                self.case_index_path(),
                self.judge_data_path(),
                self.processed_judge_data_path(),
            ] {
                remove_table(&path)?;
            }
        }
        if !self.case_index_path().exists() {
            report.case_index_rows = Some(self.build_case_index(settings)?);
            remove_table(&self.judge_data_path())?;
            remove_table(&self.processed_judge_data_path())?;
        }
        if !self.judge_data_path().exists() {
            report.judge_rows = Some(JudgeBatchJoiner::new(settings).collect(self)?.kept);
        }
        if !self.processed_judge_data_path().exists() {
            report.processed_rows = Some(JudgeDataProcessor::new(settings).process(self)?.cases);
        }
        Ok(report)
    }

    /// Frequency of each NOS code in the case index, most common first.
    ///
    /// Cases without a code are not counted.
    pub fn nos_counts(&self, settings: &Settings) -> Result<Vec<(i64, usize)>, PipelineError> {
        let schema = Arc::new(index::global_index_schema());
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for batch in read_table(&self.case_index_path(), schema, settings.index_batch_size)? {
            let batch = batch?;
            let codes = column::<arrow::array::Int64Array>(
                &batch,
                "case_index",
                index::NATURE_SUIT_CODE,
            )?;
            for row in 0..batch.num_rows() {
                if let Some(code) = int(codes, row) {
                    *counts.entry(code).or_default() += 1;
                }
            }
        }
        let mut counts: Vec<(i64, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_project_name() {
        let project = Project::new("settlement", Scope::default(), Path::new("/srv/projects"));
        assert_eq!(
            project.case_index_path(),
            PathBuf::from("/srv/projects/settlement/data/case_index.csv")
        );
        assert_eq!(
            project.processed_judge_data_path(),
            PathBuf::from("/srv/projects/settlement/data/processed_judges.csv")
        );
    }

    #[test]
    fn load_declaration() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(PROJECT_FILE);
        fs::write(
            &path,
            r#"{"name": "pathways", "scope": {"case_type": "cv", "exclude_nos_codes": [422]}}"#,
        )
        .unwrap();
        let project = Project::load(&path, tmp.path()).unwrap();
        assert_eq!(project.name(), "pathways");
        assert_eq!(project.scope().case_type.as_deref(), Some("cv"));
        assert_eq!(project.project_dir(), tmp.path().join("pathways"));
    }

    #[test]
    fn scope_defaults_to_unrestricted() {
        let config: ProjectConfig = serde_json::from_str(r#"{"name": "all"}"#).unwrap();
        assert!(config.scope.is_unrestricted());
    }

    #[test]
    fn invalid_declaration_reports_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(PROJECT_FILE);
        fs::write(&path, r#"{"name": "x", "scope": {"closed": true}}"#).unwrap();
        let err = Project::load(&path, tmp.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ProjectFile { .. }));
    }
}
