//! Terminal rendering: table previews and a vertical card for one case.

use std::path::Path;

use anyhow::Context;
use arrow::array::{Array, BooleanArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty;
use pacer_store::{TextTableOptions, read_header, read_text_table};

// ── Case card sections ──

const IDENTITY: &[&str] = &[
    "ucid",
    "case_id",
    "court",
    "case_type",
    "case_name",
    "case_status",
    "case_flags",
    "lead_case_id",
];

const CLASSIFICATION: &[&str] = &[
    "nature_suit",
    "nature_suit_code",
    "cause",
    "jurisdiction",
    "jury_demand",
];

const JUDGES: &[&str] = &["judge", "referred_judge"];

const DATES: &[&str] = &[
    "filing_date",
    "terminating_date",
    "first_entry_date",
    "last_entry_date",
    "download_timestamp",
];

const DOCKET: &[&str] = &[
    "num_entries",
    "num_parties",
    "num_plaintiffs",
    "num_defendants",
    "has_pro_se_party",
    "is_closed",
];

const COURT: &[&str] = &[
    "court_name",
    "circuit",
    "district",
    "pending_cases_civil",
    "pending_cases_criminal",
];

/// Print the first `limit` rows of any pipeline table, every column as text.
pub fn print_preview(path: &Path, limit: usize) -> anyhow::Result<()> {
    let header = read_header(path).with_context(|| format!("reading {}", path.display()))?;
    let columns: Vec<&str> = header.iter().map(String::as_str).collect();
    let options = TextTableOptions {
        batch_size: limit.max(1),
        ..Default::default()
    };
    let mut batches = read_text_table(path, &options, &columns, str::to_string)?;
    match batches.next().transpose()? {
        Some(batch) => println!("{}", pretty::pretty_format_batches(&[batch])?),
        None => println!("{} is empty", path.display()),
    }
    Ok(())
}

/// Print row 0 of a global index batch as a card grouped by section.
pub fn print_case_card(batch: &RecordBatch) -> anyhow::Result<()> {
    let ucid = cell(batch, "ucid")?.unwrap_or_default();
    let name = cell(batch, "case_name")?.unwrap_or_default();

    println!("=== {ucid} ===");
    if !name.is_empty() {
        println!("{name}");
    }
    println!();

    print_section(batch, "Identity", IDENTITY)?;
    print_section(batch, "Classification", CLASSIFICATION)?;
    print_section(batch, "Judges", JUDGES)?;
    print_section(batch, "Dates", DATES)?;
    print_section(batch, "Docket", DOCKET)?;
    print_section(batch, "Court", COURT)?;
    Ok(())
}

fn print_section(batch: &RecordBatch, header: &str, cols: &[&str]) -> anyhow::Result<()> {
    let mut lines = Vec::new();
    for &name in cols {
        if let Some(value) = cell(batch, name)? {
            lines.push(format!("  {name:<26} {value}"));
        }
    }
    if lines.is_empty() {
        return Ok(());
    }
    println!("{header}");
    for line in lines {
        println!("{line}");
    }
    println!();
    Ok(())
}

/// Row 0 of `name` as display text; `None` when absent or null.
fn cell(batch: &RecordBatch, name: &str) -> anyhow::Result<Option<String>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    if col.is_empty() || col.is_null(0) {
        return Ok(None);
    }
    if col.data_type() == &DataType::Boolean
        && let Some(flags) = col.as_any().downcast_ref::<BooleanArray>()
    {
        return Ok(Some(if flags.value(0) { "yes" } else { "no" }.to_string()));
    }
    let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
    Ok(Some(formatter.value(0).to_string()))
}
