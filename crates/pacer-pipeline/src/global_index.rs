//! Global case index: every case in the archive, one normalized row each.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Date32Array, Int64Array, StringArray};
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use pacer_core::case::{self, CaseRecord, NormalizedCase};
use pacer_core::{dates, index};
use pacer_store::{TableWriter, WriteMode};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::courts::{CourtDirectory, CourtInfo};
use crate::{PipelineError, Settings};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexBuildStats {
    pub files: usize,
    pub batches: usize,
    pub rows: usize,
    /// Case files that could not be read or parsed.
    pub skipped: usize,
}

pub struct GlobalIndexBuilder<'a> {
    settings: &'a Settings,
    courts: &'a CourtDirectory,
}

impl<'a> GlobalIndexBuilder<'a> {
    pub fn new(settings: &'a Settings, courts: &'a CourtDirectory) -> Self {
        Self { settings, courts }
    }

    /// Index every case file under `PACER_DIR` into the global index.
    ///
    /// [`WriteMode::Fresh`] replaces the index once the build completes.
    /// [`WriteMode::Append`] adds to whatever is there, duplicates included,
    /// and leaves a partially extended file behind if the build fails.
    pub fn build(&self, mode: WriteMode) -> Result<IndexBuildStats, PipelineError> {
        let paths = case_paths(self.settings.pacer_dir()?)?;
        self.build_from_paths(&paths, &self.settings.global_index_path(), mode)
    }

    pub fn build_from_paths(
        &self,
        paths: &[PathBuf],
        dest: &Path,
        mode: WriteMode,
    ) -> Result<IndexBuildStats, PipelineError> {
        let schema: SchemaRef = Arc::new(index::global_index_schema());
        let mut writer = TableWriter::create(dest, Arc::clone(&schema), mode)?;
        let batch_size = self.settings.index_batch_size.max(1);
        let total = paths.len().div_ceil(batch_size);
        let mut stats = IndexBuildStats {
            files: paths.len(),
            ..Default::default()
        };

        for (n, chunk) in paths.chunks(batch_size).enumerate() {
            let mut cases = Vec::with_capacity(chunk.len());
            for path in chunk {
                match load_case(path) {
                    Ok(record) => cases.push(case::normalize(record)),
                    Err(reason) => {
                        warn!(path = %path.display(), %reason, "skipping malformed case record");
                        stats.skipped += 1;
                    }
                }
            }

            let batch = index_batch(&schema, &cases, self.courts)
                .map_err(|source| PipelineError::MalformedBatch { batch: n, source })?;
            writer.write(&batch)?;
            stats.batches += 1;
            info!(batch = n + 1, of = total, rows = batch.num_rows(), "indexed batch");
        }

        stats.rows = writer.finish()?;
        info!(
            files = stats.files,
            rows = stats.rows,
            skipped = stats.skipped,
            path = %dest.display(),
            "global index built"
        );
        Ok(stats)
    }
}

/// Case files laid out as `<court>/json/<year>/<case>.json`, in path order.
pub fn case_paths(pacer_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !pacer_dir.is_dir() {
        return Err(PipelineError::Io {
            path: pacer_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }
    let mut paths = Vec::new();
    for entry in WalkDir::new(pacer_dir)
        .min_depth(4)
        .max_depth(4)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("error walking case archive: {e}");
                continue;
            }
        };
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let in_json_dir = path
            .strip_prefix(pacer_dir)
            .ok()
            .and_then(|rel| rel.components().nth(1))
            .is_some_and(|c| c.as_os_str() == "json");
        if entry.file_type().is_file() && is_json && in_json_dir {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn load_case(path: &Path) -> Result<CaseRecord, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}

/// Assemble one index batch: parse dates, derive NOS code and closed flag,
/// and join court metadata.
pub(crate) fn index_batch(
    schema: &SchemaRef,
    cases: &[NormalizedCase],
    courts: &CourtDirectory,
) -> Result<RecordBatch, ArrowError> {
    let court_info: Vec<Option<&CourtInfo>> = cases
        .iter()
        .map(|c| c.court.as_deref().and_then(|code| courts.get(code)))
        .collect();
    let terminating: Vec<Option<i32>> = cases
        .iter()
        .map(|c| date_days(c.terminating_date.as_deref()))
        .collect();

    let text = |f: fn(&NormalizedCase) -> Option<&str>| -> ArrayRef {
        Arc::new(cases.iter().map(f).collect::<StringArray>())
    };
    let date = |f: fn(&NormalizedCase) -> Option<&str>| -> ArrayRef {
        Arc::new(cases.iter().map(|c| date_days(f(c))).collect::<Date32Array>())
    };
    let count = |f: fn(&NormalizedCase) -> usize| -> ArrayRef {
        Arc::new(cases.iter().map(|c| Some(f(c) as i64)).collect::<Int64Array>())
    };
    let court_text = |f: fn(&CourtInfo) -> Option<&str>| -> ArrayRef {
        Arc::new(court_info.iter().map(|c| c.and_then(f)).collect::<StringArray>())
    };
    let court_count = |f: fn(&CourtInfo) -> Option<i64>| -> ArrayRef {
        Arc::new(court_info.iter().map(|c| c.and_then(f)).collect::<Int64Array>())
    };

    let columns: Vec<ArrayRef> = vec![
        Arc::new(cases.iter().map(|c| Some(c.ucid.as_str())).collect::<StringArray>()),
        text(|c| c.case_id.as_deref()),
        text(|c| c.court.as_deref()),
        text(|c| c.case_type.as_deref()),
        text(|c| c.case_name.as_deref()),
        text(|c| c.case_status.as_deref()),
        Arc::new(cases.iter().map(NormalizedCase::flags_text).collect::<StringArray>()),
        text(|c| c.nature_suit.as_deref()),
        text(|c| c.cause.as_deref()),
        text(|c| c.jurisdiction.as_deref()),
        text(|c| c.jury_demand.as_deref()),
        text(|c| c.judge.as_deref()),
        text(|c| c.referred_judge.as_deref()),
        text(|c| c.lead_case_id.as_deref()),
        date(|c| c.filing_date.as_deref()),
        Arc::new(Date32Array::from(terminating.clone())),
        Arc::new(
            cases
                .iter()
                .map(|c| {
                    c.download_timestamp
                        .as_deref()
                        .and_then(dates::parse_timestamp)
                        .map(|ts| ts.format(dates::TIMESTAMP_FORMAT).to_string())
                })
                .collect::<StringArray>(),
        ),
        date(|c| c.first_entry_date.as_deref()),
        date(|c| c.last_entry_date.as_deref()),
        count(|c| c.num_entries),
        count(|c| c.num_parties),
        count(|c| c.num_plaintiffs),
        count(|c| c.num_defendants),
        Arc::new(
            cases
                .iter()
                .map(|c| Some(c.has_pro_se_party))
                .collect::<BooleanArray>(),
        ),
        Arc::new(
            cases
                .iter()
                .map(|c| case::nature_suit_code(c.nature_suit.as_deref()))
                .collect::<Int64Array>(),
        ),
        Arc::new(
            cases
                .iter()
                .zip(&terminating)
                .map(|(c, term)| Some(case::is_closed(term.is_some(), &c.case_flags)))
                .collect::<BooleanArray>(),
        ),
        court_text(|c| c.name.as_deref()),
        court_text(|c| c.circuit.as_deref()),
        court_text(|c| c.district.as_deref()),
        court_count(|c| c.pending_cases_civil),
        court_count(|c| c.pending_cases_criminal),
    ];

    RecordBatch::try_new(Arc::clone(schema), columns)
}

fn date_days(raw: Option<&str>) -> Option<i32> {
    dates::parse_opt_date(raw).map(dates::to_days)
}
