//! Declarative project scopes and the row predicate they define.
//!
//! A [`Scope`] is plain data: every constraint is optional and
//! [`Scope::matches`] is the conjunction of the constraints that are set.
//! An all-default scope matches every row.

use std::collections::BTreeSet;
use std::fmt;

use arrow::array::{Array, BooleanArray, Date32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dates;
use crate::schema::index;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("column '{0}' missing from index batch")]
    MissingColumn(&'static str),

    #[error("column '{column}' has unexpected type {found}")]
    WrongType {
        column: &'static str,
        found: String,
    },
}

/// Inclusion and exclusion criteria that define a project's case subset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scope {
    pub case_type: Option<String>,
    /// Inclusive lower bound on `filing_date`.
    pub min_date: Option<NaiveDate>,
    /// Inclusive upper bound on `filing_date`.
    pub max_date: Option<NaiveDate>,
    pub closed_only: bool,
    pub exclude_courts: BTreeSet<String>,
    pub exclude_nos_codes: BTreeSet<i64>,
}

/// The index fields a scope looks at, borrowed from one row.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeRow<'a> {
    pub case_type: Option<&'a str>,
    pub filing_date: Option<NaiveDate>,
    pub is_closed: bool,
    pub court: Option<&'a str>,
    pub nature_suit_code: Option<i64>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case_type(mut self, case_type: impl Into<String>) -> Self {
        self.case_type = Some(case_type.into());
        self
    }

    pub fn with_date_range(mut self, min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        self.min_date = min;
        self.max_date = max;
        self
    }

    pub fn closed_only(mut self) -> Self {
        self.closed_only = true;
        self
    }

    pub fn excluding_courts<I, S>(mut self, courts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_courts.extend(courts.into_iter().map(Into::into));
        self
    }

    pub fn excluding_nos_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.exclude_nos_codes.extend(codes);
        self
    }

    /// True when no constraint is set.
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate the predicate for one row.
    ///
    /// A null compared against a set bound fails that term; a null court or
    /// NOS code is never inside an exclusion list.
    pub fn matches(&self, row: &ScopeRow<'_>) -> bool {
        if let Some(case_type) = &self.case_type
            && row.case_type != Some(case_type.as_str())
        {
            return false;
        }
        if let Some(min) = self.min_date
            && !row.filing_date.is_some_and(|d| d >= min)
        {
            return false;
        }
        if let Some(max) = self.max_date
            && !row.filing_date.is_some_and(|d| d <= max)
        {
            return false;
        }
        if self.closed_only && !row.is_closed {
            return false;
        }
        if let Some(court) = row.court
            && self.exclude_courts.contains(court)
        {
            return false;
        }
        if let Some(code) = row.nature_suit_code
            && self.exclude_nos_codes.contains(&code)
        {
            return false;
        }
        true
    }

    /// Evaluate the predicate over a global index batch.
    ///
    /// The mask is aligned with the batch rows; the batch is not modified.
    pub fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray, ScopeError> {
        let case_type = string_column(batch, index::CASE_TYPE)?;
        let filing_date = typed_column::<Date32Array>(batch, index::FILING_DATE)?;
        let is_closed = typed_column::<BooleanArray>(batch, index::IS_CLOSED)?;
        let court = string_column(batch, index::COURT)?;
        let nos = typed_column::<Int64Array>(batch, index::NATURE_SUIT_CODE)?;

        let mask = (0..batch.num_rows())
            .map(|i| {
                let row = ScopeRow {
                    case_type: case_type.is_valid(i).then(|| case_type.value(i)),
                    filing_date: filing_date
                        .is_valid(i)
                        .then(|| dates::from_days(filing_date.value(i)))
                        .flatten(),
                    is_closed: is_closed.is_valid(i) && is_closed.value(i),
                    court: court.is_valid(i).then(|| court.value(i)),
                    nature_suit_code: nos.is_valid(i).then(|| nos.value(i)),
                };
                Some(self.matches(&row))
            })
            .collect();
        Ok(mask)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unrestricted() {
            return write!(f, "all cases");
        }
        let mut terms = Vec::new();
        if let Some(case_type) = &self.case_type {
            terms.push(format!("case_type={case_type}"));
        }
        match (self.min_date, self.max_date) {
            (Some(min), Some(max)) => terms.push(format!("filed {min}..={max}")),
            (Some(min), None) => terms.push(format!("filed >= {min}")),
            (None, Some(max)) => terms.push(format!("filed <= {max}")),
            (None, None) => {}
        }
        if self.closed_only {
            terms.push("closed only".into());
        }
        if !self.exclude_courts.is_empty() {
            let courts: Vec<&str> = self.exclude_courts.iter().map(String::as_str).collect();
            terms.push(format!("excluding courts [{}]", courts.join(", ")));
        }
        if !self.exclude_nos_codes.is_empty() {
            let codes: Vec<String> = self.exclude_nos_codes.iter().map(i64::to_string).collect();
            terms.push(format!("excluding NOS [{}]", codes.join(", ")));
        }
        write!(f, "{}", terms.join("; "))
    }
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &'static str,
) -> Result<&'a StringArray, ScopeError> {
    typed_column::<StringArray>(batch, name)
}

fn typed_column<'a, T: 'static>(
    batch: &'a RecordBatch,
    name: &'static str,
) -> Result<&'a T, ScopeError> {
    let col = batch
        .column_by_name(name)
        .ok_or(ScopeError::MissingColumn(name))?;
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ScopeError::WrongType {
            column: name,
            found: col.data_type().to_string(),
        })
}
