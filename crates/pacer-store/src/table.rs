//! CSV tables with an explicit write mode.
//!
//! Every persisted pipeline table is a comma-delimited file with a header
//! line. Writers state up front whether they replace the table
//! ([`WriteMode::Fresh`]) or extend it ([`WriteMode::Append`]); nothing
//! downstream has to guess from whether a file happens to exist.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, Writer, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Stage into a temporary file beside the destination and swap it in on
    /// [`TableWriter::finish`]. A writer dropped before `finish` leaves the
    /// previous table untouched.
    Fresh,
    /// Extend the table in place. The header is written only when the table
    /// is new; an existing header must match the schema.
    Append,
}

enum Sink {
    Staged(Writer<BufWriter<NamedTempFile>>),
    Direct(Writer<BufWriter<File>>),
}

/// Streaming writer for one CSV table.
pub struct TableWriter {
    path: PathBuf,
    schema: SchemaRef,
    mode: WriteMode,
    sink: Sink,
    rows: usize,
}

impl TableWriter {
    pub fn create(path: &Path, schema: SchemaRef, mode: WriteMode) -> Result<Self, StoreError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let empty = RecordBatch::new_empty(Arc::clone(&schema));
        let sink = match mode {
            WriteMode::Fresh => {
                let tmp = NamedTempFile::new_in(&dir)?;
                let mut writer = WriterBuilder::new()
                    .with_header(true)
                    .build(BufWriter::new(tmp));
                writer.write(&empty)?;
                Sink::Staged(writer)
            }
            WriteMode::Append => {
                let existing = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
                if existing {
                    check_header(path, &schema)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let mut writer = WriterBuilder::new()
                    .with_header(!existing)
                    .build(BufWriter::new(file));
                if !existing {
                    writer.write(&empty)?;
                }
                Sink::Direct(writer)
            }
        };
        debug!(path = %path.display(), ?mode, "opened table writer");

        Ok(Self {
            path: path.to_path_buf(),
            schema,
            mode,
            sink,
            rows: 0,
        })
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write one batch. Column names must match the table schema.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), StoreError> {
        let expected = field_names(&self.schema);
        let found = field_names(&batch.schema());
        if expected != found {
            return Err(StoreError::SchemaMismatch {
                path: self.path.clone(),
                expected,
                found,
            });
        }
        match &mut self.sink {
            Sink::Staged(writer) => writer.write(batch)?,
            Sink::Direct(writer) => writer.write(batch)?,
        }
        self.rows += batch.num_rows();
        Ok(())
    }

    /// Flush, and for [`WriteMode::Fresh`] replace the destination.
    ///
    /// Returns the number of rows written by this writer.
    pub fn finish(self) -> Result<usize, StoreError> {
        match self.sink {
            Sink::Staged(writer) => {
                let tmp = writer.into_inner().into_inner().map_err(|e| e.into_error())?;
                tmp.persist(&self.path).map_err(|e| StoreError::Persist {
                    path: self.path.clone(),
                    source: e.error,
                })?;
            }
            Sink::Direct(writer) => {
                writer.into_inner().flush()?;
            }
        }
        info!(path = %self.path.display(), rows = self.rows, mode = ?self.mode, "table written");
        Ok(self.rows)
    }
}

/// Stream a table written by [`TableWriter`] with a known schema.
pub fn read_table(
    path: &Path,
    schema: SchemaRef,
    batch_size: usize,
) -> Result<impl Iterator<Item = Result<RecordBatch, StoreError>> + use<>, StoreError> {
    check_header(path, &schema)?;
    let file = File::open(path)?;
    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .with_batch_size(batch_size)
        .build(file)?;
    Ok(reader.map(|batch| batch.map_err(StoreError::from)))
}

/// Options for reading external tables whose layout we do not control.
#[derive(Debug, Clone)]
pub struct TextTableOptions {
    /// Preamble lines before the header.
    pub skip_lines: usize,
    pub batch_size: usize,
}

impl Default for TextTableOptions {
    fn default() -> Self {
        Self {
            skip_lines: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Stream selected columns of an external CSV table, every column as `Utf8`.
///
/// Header names are passed through `rename` before `columns` are looked up,
/// and the batches carry the renamed names in the order of `columns`.
pub fn read_text_table<F>(
    path: &Path,
    options: &TextTableOptions,
    columns: &[&str],
    rename: F,
) -> Result<impl Iterator<Item = Result<RecordBatch, StoreError>> + use<F>, StoreError>
where
    F: Fn(&str) -> String,
{
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    for _ in 0..options.skip_lines {
        line.clear();
        reader.read_line(&mut line)?;
    }
    line.clear();
    reader.read_line(&mut line)?;
    let names: Vec<String> = header_names(path, &line)?
        .iter()
        .map(|h| rename(h))
        .collect();

    let projection = columns
        .iter()
        .map(|&column| {
            names
                .iter()
                .position(|n| n == column)
                .ok_or_else(|| StoreError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let schema = Schema::new(
        names
            .iter()
            .map(|n| Field::new(n, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );
    let batches = ReaderBuilder::new(Arc::new(schema))
        .with_header(false)
        .with_batch_size(options.batch_size)
        .with_truncated_rows(true)
        .with_projection(projection)
        .build(reader)?;
    Ok(batches.map(|batch| batch.map_err(StoreError::from)))
}

/// Column names from the first line of a table.
pub fn read_header(path: &Path) -> Result<Vec<String>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    header_names(path, &line)
}

/// Delete a table if present. Returns whether anything was removed.
pub fn remove_table(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed table");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn check_header(path: &Path, schema: &Schema) -> Result<(), StoreError> {
    let found = read_header(path)?;
    let expected = field_names(schema);
    if found != expected {
        return Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }
    Ok(())
}

fn field_names(schema: &Schema) -> Vec<String> {
    schema.fields().iter().map(|f| f.name().to_string()).collect()
}

/// Tokenize one header line with the CSV reader's quoting rules.
fn header_names(path: &Path, line: &str) -> Result<Vec<String>, StoreError> {
    let line = line.trim_start_matches('\u{feff}');
    if line.trim().is_empty() {
        return Err(StoreError::MissingHeader(path.to_path_buf()));
    }
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(line.as_bytes(), Some(0))?;
    Ok(field_names(&schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    use arrow::array::{Array, ArrayRef, Date32Array, Int64Array, StringArray};

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("ucid", DataType::Utf8, false),
            Field::new("filing_date", DataType::Date32, true),
            Field::new("num_entries", DataType::Int64, false),
        ]))
    }

    fn batch(ucids: &[&str]) -> RecordBatch {
        let n = ucids.len();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ucids.to_vec())),
            Arc::new(Date32Array::from(vec![Some(16_861); n])),
            Arc::new(Int64Array::from(vec![3; n])),
        ];
        RecordBatch::try_new(schema(), columns).unwrap()
    }

    fn read_ucids(path: &Path) -> Vec<String> {
        read_table(path, schema(), 2)
            .unwrap()
            .map(|b| b.unwrap())
            .flat_map(|b| {
                let col = b
                    .column(0)
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .unwrap()
                    .clone();
                (0..col.len()).map(move |i| col.value(i).to_string())
            })
            .collect()
    }

    #[test]
    fn fresh_write_and_read_back() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data").join("index.csv");

        let mut writer = TableWriter::create(&path, schema(), WriteMode::Fresh).unwrap();
        writer.write(&batch(&["a", "b", "c"])).unwrap();
        assert_eq!(writer.finish().unwrap(), 3);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ucid,filing_date,num_entries\n"));
        assert!(text.contains("a,2016-03-01,3"));
        assert_eq!(read_ucids(&path), vec!["a", "b", "c"]);
    }

    #[test]
    fn fresh_without_batches_writes_header_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("empty.csv");
        TableWriter::create(&path, schema(), WriteMode::Fresh)
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(read_header(&path).unwrap(), vec!["ucid", "filing_date", "num_entries"]);
        assert!(read_ucids(&path).is_empty());
    }

    #[test]
    fn fresh_replaces_existing_table() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.csv");
        for ucids in [&["a", "b"][..], &["c"][..]] {
            let mut writer = TableWriter::create(&path, schema(), WriteMode::Fresh).unwrap();
            writer.write(&batch(ucids)).unwrap();
            writer.finish().unwrap();
        }
        assert_eq!(read_ucids(&path), vec!["c"]);
    }

    #[test]
    fn abandoned_fresh_writer_keeps_previous_table() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.csv");
        let mut writer = TableWriter::create(&path, schema(), WriteMode::Fresh).unwrap();
        writer.write(&batch(&["a"])).unwrap();
        writer.finish().unwrap();

        let mut writer = TableWriter::create(&path, schema(), WriteMode::Fresh).unwrap();
        writer.write(&batch(&["b"])).unwrap();
        drop(writer);

        assert_eq!(read_ucids(&path), vec!["a"]);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn append_extends_without_second_header() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("judges.csv");
        for ucids in [&["a", "b"][..], &["a", "b"][..]] {
            let mut writer = TableWriter::create(&path, schema(), WriteMode::Append).unwrap();
            writer.write(&batch(ucids)).unwrap();
            writer.finish().unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("ucid,").count(), 1);
        assert_eq!(read_ucids(&path), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn append_rejects_foreign_header() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("judges.csv");
        fs::write(&path, "ucid,judge_label\nx,District Judge\n").unwrap();
        let result = TableWriter::create(&path, schema(), WriteMode::Append);
        assert!(matches!(result, Err(StoreError::SchemaMismatch { .. })));
    }

    #[test]
    fn write_rejects_mismatched_batch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.csv");
        let mut writer = TableWriter::create(&path, schema(), WriteMode::Fresh).unwrap();
        let other = RecordBatch::try_new(
            Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, false)])),
            vec![Arc::new(Int64Array::from(vec![1])) as ArrayRef],
        )
        .unwrap();
        assert!(matches!(
            writer.write(&other),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn read_missing_table_errors() {
        let result = read_table(Path::new("/nonexistent/index.csv"), schema(), 10);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn text_table_skips_preamble_and_projects() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("pending.csv");
        fs::write(
            &path,
            "Table C-1\nU.S. District Courts\n\n(as of March 31)\n\
             Circuit,Abbreviation,Civil,\"Criminal \"\"Felony\"\"\"\n\
             7TH,ilnd,\"8,105\",612\n",
        )
        .unwrap();
        let options = TextTableOptions {
            skip_lines: 4,
            ..Default::default()
        };
        let batches: Vec<RecordBatch> = read_text_table(
            &path,
            &options,
            &["abbreviation", "civil"],
            |h| h.to_lowercase(),
        )
        .unwrap()
        .map(|b| b.unwrap())
        .collect();
        assert_eq!(batches.len(), 1);
        let b = &batches[0];
        assert_eq!(b.num_columns(), 2);
        assert_eq!(b.schema().field(0).name(), "abbreviation");
        let civil = b.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(civil.value(0), "8,105");
    }

    #[test]
    fn text_table_reports_missing_column() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("judge_index.csv");
        fs::write(&path, "SJID,NID\nSJ1,1393\n").unwrap();
        let result = read_text_table(&path, &TextTableOptions::default(), &["name"], |h| {
            h.to_string()
        });
        assert!(matches!(result, Err(StoreError::MissingColumn { .. })));
    }

    #[test]
    fn header_reading_handles_quotes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fjc.csv");
        fs::write(&path, "a,b,c\r\n1,2,3\r\n").unwrap();
        assert_eq!(read_header(&path).unwrap(), vec!["a", "b", "c"]);

        fs::write(
            &path,
            "\u{feff}\"Court Type (1)\",\"a,b\",\"say \"\"hi\"\"\"\nx,y,z\n",
        )
        .unwrap();
        assert_eq!(
            read_header(&path).unwrap(),
            vec!["Court Type (1)", "a,b", "say \"hi\""]
        );
    }

    #[test]
    fn blank_header_is_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(read_header(&path), Err(StoreError::MissingHeader(_))));
        fs::write(&path, "  \n").unwrap();
        assert!(matches!(read_header(&path), Err(StoreError::MissingHeader(_))));
        let result = read_text_table(&path, &TextTableOptions::default(), &["a"], str::to_string);
        assert!(matches!(result, Err(StoreError::MissingHeader(_))));
    }

    #[test]
    fn remove_table_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("x.csv");
        fs::write(&path, "a\n").unwrap();
        assert!(remove_table(&path).unwrap());
        assert!(!remove_table(&path).unwrap());
    }
}
