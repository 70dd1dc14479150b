//! Typed column access for batches read back from pipeline tables.

use arrow::array::{Array, BooleanArray, Date32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;

use pacer_core::dates;

use crate::PipelineError;

pub(crate) fn column<'a, T: 'static>(
    batch: &'a RecordBatch,
    table: &'static str,
    name: &str,
) -> Result<&'a T, PipelineError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<T>())
        .ok_or_else(|| PipelineError::Column {
            table,
            column: name.to_string(),
        })
}

pub(crate) fn strings<'a>(
    batch: &'a RecordBatch,
    table: &'static str,
    name: &str,
) -> Result<&'a StringArray, PipelineError> {
    column::<StringArray>(batch, table, name)
}

/// Null and blank cells both read as `None`.
pub(crate) fn text(col: &StringArray, row: usize) -> Option<&str> {
    if col.is_null(row) {
        return None;
    }
    let value = col.value(row).trim();
    (!value.is_empty()).then_some(value)
}

pub(crate) fn owned_text(col: &StringArray, row: usize) -> Option<String> {
    text(col, row).map(str::to_string)
}

pub(crate) fn int(col: &Int64Array, row: usize) -> Option<i64> {
    col.is_valid(row).then(|| col.value(row))
}

pub(crate) fn date(col: &Date32Array, row: usize) -> Option<NaiveDate> {
    if col.is_null(row) {
        return None;
    }
    dates::from_days(col.value(row))
}

pub(crate) fn flag(col: &BooleanArray, row: usize) -> bool {
    col.is_valid(row) && col.value(row)
}

/// Registry ids sometimes arrive as floats (`"1393.0"`) from spreadsheet exports.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(id);
    }
    let float = raw.parse::<f64>().ok()?;
    (float.fract() == 0.0 && float.is_finite()).then_some(float as i64)
}

/// Counts with thousands separators (`"8,105"`).
pub(crate) fn parse_count(raw: &str) -> Option<i64> {
    raw.trim().replace(',', "").parse().ok()
}
