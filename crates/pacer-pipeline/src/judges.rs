//! Judge data stages: collecting a project's judge observations from the
//! global entity table, and summarising them per case.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Int64Array, StringArray};
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use pacer_core::observation::{self, AssignedJudge};
use pacer_core::position::{self, Unresolved};
use pacer_core::{JudgeObservation, JudgeTallies, Resolution, ResolvedPosition, dates, index, judges};
use pacer_store::{TableWriter, TextTableOptions, WriteMode, read_table, read_text_table, remove_table};
use tracing::{debug, info, warn};

use crate::columns::{column, date, int, owned_text, parse_id, strings, text};
use crate::positions::load_histories;
use crate::project::Project;
use crate::{PipelineError, Settings};

/// Columns taken from the entity table, after lowercasing its headers.
const ENTITY_COLUMNS: [&str; 5] = [
    judges::UCID,
    judges::JUDGE_LABEL,
    judges::EXTRACTION_METHOD,
    judges::DOCKET_SOURCE,
    judges::SJID,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub chunks: usize,
    pub scanned: usize,
    pub kept: usize,
}

/// Streams the global entity table and keeps the rows of one project's cases.
pub struct JudgeBatchJoiner<'a> {
    settings: &'a Settings,
}

impl<'a> JudgeBatchJoiner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Rebuild the project's judge table and discard its processed summary.
    pub fn collect(&self, project: &Project) -> Result<JoinStats, PipelineError> {
        let ucids = case_ucids(&project.case_index_path(), self.settings.index_batch_size)?;
        let nids = load_judge_index(&self.settings.judge_index_path())?;

        let dest = project.judge_data_path();
        let schema: SchemaRef = Arc::new(judges::judge_data_schema());
        let mut writer = TableWriter::create(&dest, Arc::clone(&schema), WriteMode::Fresh)?;
        let options = TextTableOptions {
            batch_size: self.settings.judge_batch_size.max(1),
            ..Default::default()
        };
        let mut stats = JoinStats::default();
        let entities = read_text_table(
            &self.settings.judge_entities_path(),
            &options,
            &ENTITY_COLUMNS,
            |h| h.trim().to_lowercase(),
        )?;
        for batch in entities {
            let batch = batch?;
            stats.chunks += 1;
            stats.scanned += batch.num_rows();
            let kept = entity_rows(&batch, &ucids, &nids)?;
            writer.write(&observation_batch(&schema, &kept)?)?;
            debug!(chunk = stats.chunks, rows = batch.num_rows(), kept = kept.len(), "joined chunk");
        }
        stats.kept = writer.finish()?;
        remove_table(&project.processed_judge_data_path())?;

        info!(
            project = project.name(),
            cases = ucids.len(),
            scanned = stats.scanned,
            kept = stats.kept,
            "judge data collected"
        );
        Ok(stats)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Rows in the processed table: cases with at least one typed judge.
    pub cases: usize,
    pub assigned: usize,
    pub discarded_assignments: usize,
    pub resolved: usize,
    pub labels: Vec<String>,
}

/// Summarises a project's judge table into one row per case.
pub struct JudgeDataProcessor<'a> {
    settings: &'a Settings,
}

impl<'a> JudgeDataProcessor<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Tally judges per case and label, resolve each assigned judge's FJC
    /// position, and write the processed table.
    pub fn process(&self, project: &Project) -> Result<ProcessStats, PipelineError> {
        let reference = reference_dates(&project.case_index_path(), self.settings.index_batch_size)?;
        let observations =
            load_observations(&project.judge_data_path(), self.settings.judge_batch_size)?;

        let assigned = observation::assigned_judges(&observations);
        if assigned.discarded > 0 {
            warn!(
                project = project.name(),
                cases = assigned.ambiguous_cases.len(),
                discarded = assigned.discarded,
                "cases with several assigned judges; keeping the first"
            );
        }

        let wanted: HashSet<i64> = assigned
            .rows
            .iter()
            .filter(|a| position::is_eligible(a.judge_label.as_deref(), a.fjc_nid))
            .filter_map(|a| a.fjc_nid)
            .collect();
        let histories = load_histories(&self.settings.fjc_judges_path(), &wanted)?;

        let mut outcomes = ResolutionCounts::default();
        let mut assignments: HashMap<&str, (&AssignedJudge, Resolution)> = HashMap::new();
        for judge in &assigned.rows {
            let resolution = position::resolve_assignment(
                judge.judge_label.as_deref(),
                judge.fjc_nid,
                reference.get(&judge.ucid).copied().flatten(),
                &histories,
            );
            outcomes.record(&resolution);
            assignments.insert(judge.ucid.as_str(), (judge, resolution));
        }
        outcomes.log(project.name());

        let tallies = JudgeTallies::from_observations(&observations);
        let labels = tallies.labels();
        let schema: SchemaRef = Arc::new(judges::processed_judge_schema(&labels));
        let batch = processed_batch(&schema, &tallies, &labels, &assignments)?;

        let mut writer = TableWriter::create(
            &project.processed_judge_data_path(),
            Arc::clone(&schema),
            WriteMode::Fresh,
        )?;
        writer.write(&batch)?;
        let cases = writer.finish()?;

        info!(
            project = project.name(),
            cases,
            assigned = assigned.rows.len(),
            resolved = outcomes.resolved,
            labels = labels.len(),
            "judge data processed"
        );
        Ok(ProcessStats {
            cases,
            assigned: assigned.rows.len(),
            discarded_assignments: assigned.discarded,
            resolved: outcomes.resolved,
            labels,
        })
    }
}

#[derive(Debug, Default)]
struct ResolutionCounts {
    skipped: usize,
    resolved: usize,
    no_reference_date: usize,
    missing_history: usize,
    no_qualifying_slot: usize,
}

impl ResolutionCounts {
    fn record(&mut self, resolution: &Resolution) {
        match resolution {
            Resolution::Skipped => self.skipped += 1,
            Resolution::Resolved(_) => self.resolved += 1,
            Resolution::Unresolved(Unresolved::NoReferenceDate) => self.no_reference_date += 1,
            Resolution::Unresolved(Unresolved::MissingHistory) => self.missing_history += 1,
            Resolution::Unresolved(Unresolved::NoQualifyingSlot) => self.no_qualifying_slot += 1,
        }
    }

    fn log(&self, project: &str) {
        info!(
            project,
            resolved = self.resolved,
            skipped = self.skipped,
            no_reference_date = self.no_reference_date,
            missing_history = self.missing_history,
            no_qualifying_slot = self.no_qualifying_slot,
            "position resolution"
        );
    }
}

fn case_ucids(case_index: &Path, batch_size: usize) -> Result<HashSet<String>, PipelineError> {
    let mut ucids = HashSet::new();
    let schema = Arc::new(index::global_index_schema());
    for batch in read_table(case_index, schema, batch_size)? {
        let batch = batch?;
        let col = strings(&batch, "case_index", index::UCID)?;
        ucids.extend((0..batch.num_rows()).filter_map(|row| owned_text(col, row)));
    }
    Ok(ucids)
}

/// `ucid` → last docket entry date.
fn reference_dates(
    case_index: &Path,
    batch_size: usize,
) -> Result<HashMap<String, Option<NaiveDate>>, PipelineError> {
    let mut out = HashMap::new();
    let schema = Arc::new(index::global_index_schema());
    for batch in read_table(case_index, schema, batch_size)? {
        let batch = batch?;
        let ucids = strings(&batch, "case_index", index::UCID)?;
        let last = column::<Date32Array>(&batch, "case_index", index::LAST_ENTRY_DATE)?;
        for row in 0..batch.num_rows() {
            if let Some(ucid) = owned_text(ucids, row) {
                out.insert(ucid, date(last, row));
            }
        }
    }
    Ok(out)
}

/// `SJID` → FJC `NID`, for judges the registry knows.
fn load_judge_index(path: &Path) -> Result<HashMap<String, i64>, PipelineError> {
    let mut nids = HashMap::new();
    let rows = read_text_table(path, &TextTableOptions::default(), &["SJID", "NID"], |h| {
        h.trim().to_string()
    })?;
    for batch in rows {
        let batch = batch?;
        let sjids = strings(&batch, "judge_index", "SJID")?;
        let ids = strings(&batch, "judge_index", "NID")?;
        for row in 0..batch.num_rows() {
            if let (Some(sjid), Some(nid)) = (text(sjids, row), text(ids, row).and_then(parse_id)) {
                nids.entry(sjid.to_string()).or_insert(nid);
            }
        }
    }
    debug!(judges = nids.len(), "loaded judge index");
    Ok(nids)
}

fn entity_rows(
    batch: &RecordBatch,
    ucids: &HashSet<String>,
    nids: &HashMap<String, i64>,
) -> Result<Vec<JudgeObservation>, PipelineError> {
    let ucid = strings(batch, "judge_entities", judges::UCID)?;
    let label = strings(batch, "judge_entities", judges::JUDGE_LABEL)?;
    let method = strings(batch, "judge_entities", judges::EXTRACTION_METHOD)?;
    let source = strings(batch, "judge_entities", judges::DOCKET_SOURCE)?;
    let sjid = strings(batch, "judge_entities", judges::SJID)?;

    let mut rows = Vec::new();
    for row in 0..batch.num_rows() {
        let Some(case) = text(ucid, row).filter(|u| ucids.contains(*u)) else {
            continue;
        };
        let sjid = owned_text(sjid, row);
        rows.push(JudgeObservation {
            ucid: case.to_string(),
            judge_label: owned_text(label, row),
            extraction_method: owned_text(method, row),
            docket_source: owned_text(source, row),
            fjc_nid: sjid.as_deref().and_then(|s| nids.get(s).copied()),
            sjid,
        });
    }
    Ok(rows)
}

fn observation_batch(
    schema: &SchemaRef,
    rows: &[JudgeObservation],
) -> Result<RecordBatch, ArrowError> {
    let text = |f: fn(&JudgeObservation) -> Option<&str>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<StringArray>())
    };
    RecordBatch::try_new(
        Arc::clone(schema),
        vec![
            text(|o| Some(o.ucid.as_str())),
            text(|o| o.judge_label.as_deref()),
            text(|o| o.extraction_method.as_deref()),
            text(|o| o.docket_source.as_deref()),
            text(|o| o.sjid.as_deref()),
            Arc::new(rows.iter().map(|o| o.fjc_nid).collect::<Int64Array>()),
        ],
    )
}

fn load_observations(path: &Path, batch_size: usize) -> Result<Vec<JudgeObservation>, PipelineError> {
    let schema = Arc::new(judges::judge_data_schema());
    let mut observations = Vec::new();
    for batch in read_table(path, schema, batch_size.max(1))? {
        let batch = batch?;
        let ucid = strings(&batch, "judges", judges::UCID)?;
        let label = strings(&batch, "judges", judges::JUDGE_LABEL)?;
        let method = strings(&batch, "judges", judges::EXTRACTION_METHOD)?;
        let source = strings(&batch, "judges", judges::DOCKET_SOURCE)?;
        let sjid = strings(&batch, "judges", judges::SJID)?;
        let nid = column::<Int64Array>(&batch, "judges", judges::FJC_NID)?;
        for row in 0..batch.num_rows() {
            let Some(case) = owned_text(ucid, row) else {
                continue;
            };
            observations.push(JudgeObservation {
                ucid: case,
                judge_label: owned_text(label, row),
                extraction_method: owned_text(method, row),
                docket_source: owned_text(source, row),
                sjid: owned_text(sjid, row),
                fjc_nid: int(nid, row),
            });
        }
    }
    Ok(observations)
}

/// One row per tallied case, in ucid order, with the assigned judge and its
/// resolved position left-joined on.
fn processed_batch(
    schema: &SchemaRef,
    tallies: &JudgeTallies,
    labels: &[String],
    assignments: &HashMap<&str, (&AssignedJudge, Resolution)>,
) -> Result<RecordBatch, ArrowError> {
    let cases: Vec<&str> = tallies.cases().collect();
    let joined: Vec<Option<&(&AssignedJudge, Resolution)>> =
        cases.iter().map(|ucid| assignments.get(ucid)).collect();
    let positions: Vec<Option<&ResolvedPosition>> = joined
        .iter()
        .map(|a| a.and_then(|(_, resolution)| resolution.position()))
        .collect();

    let judge_text = |f: fn(&AssignedJudge) -> Option<&str>| -> ArrayRef {
        Arc::new(joined.iter().map(|a| a.and_then(|(j, _)| f(j))).collect::<StringArray>())
    };
    let position_text = |f: fn(&ResolvedPosition) -> Option<&str>| -> ArrayRef {
        Arc::new(positions.iter().map(|p| p.and_then(f)).collect::<StringArray>())
    };

    let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(cases.clone()))];
    for label in labels {
        columns.push(Arc::new(Int64Array::from_iter_values(
            cases.iter().map(|ucid| tallies.count(ucid, label)),
        )));
    }
    let assignment_columns: [ArrayRef; 15] = [
        judge_text(|j| j.judge_label.as_deref()),
        judge_text(|j| j.sjid.as_deref()),
        Arc::new(joined.iter().map(|a| a.and_then(|(j, _)| j.fjc_nid)).collect::<Int64Array>()),
        position_text(|p| Some(p.court_type.as_str())),
        position_text(|p| p.court_name.as_deref()),
        position_text(|p| p.appointing_party.as_deref()),
        Arc::new(
            positions
                .iter()
                .map(|p| p.map(|p| dates::to_days(p.commission_date)))
                .collect::<Date32Array>(),
        ),
        Arc::new(
            positions
                .iter()
                .map(|p| p.map(|p| p.position_used as i64))
                .collect::<Int64Array>(),
        ),
        position_text(|p| p.biography.first_name.as_deref()),
        position_text(|p| p.biography.middle_name.as_deref()),
        position_text(|p| p.biography.last_name.as_deref()),
        position_text(|p| p.biography.suffix.as_deref()),
        Arc::new(
            positions
                .iter()
                .map(|p| p.and_then(|p| p.biography.birth_year))
                .collect::<Int64Array>(),
        ),
        position_text(|p| p.biography.gender.as_deref()),
        position_text(|p| p.biography.race_or_ethnicity.as_deref()),
    ];
    columns.extend(assignment_columns);
    RecordBatch::try_new(Arc::clone(schema), columns)
}
