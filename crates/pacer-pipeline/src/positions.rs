//! Loading FJC position histories from the registry export.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use arrow::array::StringArray;
use arrow::record_batch::RecordBatch;
use pacer_core::position::{POSITION_SLOTS, fjc_column};
use pacer_core::{PositionHistory, PositionSlot};
use pacer_store::{TextTableOptions, read_text_table};
use tracing::{debug, info, warn};

use crate::PipelineError;
use crate::columns::{owned_text, parse_id, strings, text};

const TABLE: &str = "fjc_judges";
const NID: &str = "fjc_nid";

const SLOT_FIELDS: [&str; 4] = [
    "fjc_court_type",
    "fjc_court_name",
    "fjc_party_of_appointing_president",
    "fjc_commission_date",
];

const BIOGRAPHY_FIELDS: [&str; 7] = [
    "fjc_first_name",
    "fjc_middle_name",
    "fjc_last_name",
    "fjc_suffix",
    "fjc_birth_year",
    "fjc_gender",
    "fjc_race_or_ethnicity",
];

fn slot_column(field: &str, position: usize) -> String {
    format!("{field}_({position})")
}

fn history_columns() -> Vec<String> {
    let mut columns = vec![NID.to_string()];
    for position in 1..=POSITION_SLOTS {
        columns.extend(SLOT_FIELDS.iter().map(|f| slot_column(f, position)));
    }
    columns.extend(BIOGRAPHY_FIELDS.iter().map(|f| f.to_string()));
    columns
}

/// Load the histories of the judges in `wanted` from the FJC export.
///
/// Rows whose `nid` does not parse are skipped. When an `nid` repeats, the
/// first row wins.
pub fn load_histories(
    path: &Path,
    wanted: &HashSet<i64>,
) -> Result<HashMap<i64, PositionHistory>, PipelineError> {
    let mut histories = HashMap::new();
    if wanted.is_empty() {
        debug!("no eligible judges; registry not read");
        return Ok(histories);
    }

    let columns = history_columns();
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    let mut unparsed = 0usize;
    for batch in read_text_table(path, &TextTableOptions::default(), &columns, fjc_column)? {
        let batch = batch?;
        let nids = strings(&batch, TABLE, NID)?;
        for row in 0..batch.num_rows() {
            let Some(nid) = text(nids, row).and_then(parse_id) else {
                unparsed += 1;
                continue;
            };
            if !wanted.contains(&nid) || histories.contains_key(&nid) {
                continue;
            }
            histories.insert(nid, history_row(&batch, row, nid)?);
        }
    }
    if unparsed > 0 {
        warn!(rows = unparsed, "registry rows without a usable nid");
    }
    info!(
        wanted = wanted.len(),
        found = histories.len(),
        "loaded position histories"
    );
    Ok(histories)
}

fn history_row(batch: &RecordBatch, row: usize, nid: i64) -> Result<PositionHistory, PipelineError> {
    let cell = |name: &str| -> Result<Option<String>, PipelineError> {
        Ok(owned_text(strings(batch, TABLE, name)?, row))
    };

    let mut history = PositionHistory::new(nid);
    for position in 1..=POSITION_SLOTS {
        let slot = PositionSlot {
            court_type: cell(&slot_column(SLOT_FIELDS[0], position))?,
            court_name: cell(&slot_column(SLOT_FIELDS[1], position))?,
            appointing_party: cell(&slot_column(SLOT_FIELDS[2], position))?,
            commission_date: cell(&slot_column(SLOT_FIELDS[3], position))?,
        };
        if slot != PositionSlot::default() {
            history.slots[position - 1] = Some(slot);
        }
    }

    let bio = &mut history.biography;
    bio.first_name = cell("fjc_first_name")?;
    bio.middle_name = cell("fjc_middle_name")?;
    bio.last_name = cell("fjc_last_name")?;
    bio.suffix = cell("fjc_suffix")?;
    bio.birth_year = birth_year(strings(batch, TABLE, "fjc_birth_year")?, row);
    bio.gender = cell("fjc_gender")?;
    bio.race_or_ethnicity = cell("fjc_race_or_ethnicity")?;
    Ok(history)
}

fn birth_year(col: &StringArray, row: usize) -> Option<i64> {
    text(col, row).and_then(parse_id)
}
