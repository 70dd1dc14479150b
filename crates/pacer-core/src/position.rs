//! Historical judicial position resolution against the FJC registry.
//!
//! A judge's FJC record lists up to five appointments in chronological order
//! (slot 1 earliest, slot 5 latest). For a case we want the district court
//! position the judge held when last active on the docket: the most recent
//! slot whose commission date does not exceed the case's last entry date.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::dates;

pub const POSITION_SLOTS: usize = 5;

/// Court type a slot must carry to be considered.
pub const DISTRICT_COURT: &str = "U.S. District Court";

/// Judge labels for which a registry position is looked up.
pub const ELIGIBLE_LABELS: &[&str] = &["Nondescript Judge", "Article III Judge", "District Judge"];

/// One appointment in a judge's FJC record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSlot {
    pub court_type: Option<String>,
    pub court_name: Option<String>,
    pub appointing_party: Option<String>,
    /// Raw text as exported by the FJC; parsed only when the slot is examined.
    pub commission_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Biography {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub birth_year: Option<i64>,
    pub gender: Option<String>,
    pub race_or_ethnicity: Option<String>,
}

/// A judge's full FJC record, keyed by `nid`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionHistory {
    pub nid: i64,
    /// Index 0 holds slot 1.
    pub slots: [Option<PositionSlot>; POSITION_SLOTS],
    pub biography: Biography,
}

/// The winning slot plus the judge's biographical fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPosition {
    pub court_type: String,
    pub court_name: Option<String>,
    pub appointing_party: Option<String>,
    pub commission_date: NaiveDate,
    /// 1-based slot number.
    pub position_used: usize,
    pub biography: Biography,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// The case has no last entry date to compare against.
    NoReferenceDate,
    /// The `nid` has no row in the position history table.
    MissingHistory,
    /// No slot is a district court commission on or before the reference date.
    NoQualifyingSlot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Label not eligible or no registry id; nothing was looked up.
    Skipped,
    Unresolved(Unresolved),
    Resolved(ResolvedPosition),
}

impl Resolution {
    pub fn position(&self) -> Option<&ResolvedPosition> {
        match self {
            Resolution::Resolved(position) => Some(position),
            _ => None,
        }
    }
}

impl PositionHistory {
    pub fn new(nid: i64) -> Self {
        Self {
            nid,
            ..Self::default()
        }
    }

    /// Slot by its 1-based number.
    pub fn slot(&self, position: usize) -> Option<&PositionSlot> {
        position
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// Scan slots from the latest to the earliest and return the first
    /// district court commission dated on or before `reference`.
    pub fn resolve(&self, reference: NaiveDate) -> Option<ResolvedPosition> {
        for position in (1..=POSITION_SLOTS).rev() {
            let Some(slot) = self.slot(position) else {
                continue;
            };
            if slot.court_type.as_deref() != Some(DISTRICT_COURT) {
                continue;
            }
            let Some(commissioned) = dates::parse_opt_date(slot.commission_date.as_deref()) else {
                continue;
            };
            if commissioned <= reference {
                return Some(ResolvedPosition {
                    court_type: DISTRICT_COURT.to_string(),
                    court_name: slot.court_name.clone(),
                    appointing_party: slot.appointing_party.clone(),
                    commission_date: commissioned,
                    position_used: position,
                    biography: self.biography.clone(),
                });
            }
        }
        None
    }
}

pub fn is_eligible(judge_label: Option<&str>, nid: Option<i64>) -> bool {
    nid.is_some() && judge_label.is_some_and(|label| ELIGIBLE_LABELS.contains(&label))
}

/// Resolve the registry position for one assigned-judge row.
pub fn resolve_assignment(
    judge_label: Option<&str>,
    nid: Option<i64>,
    reference: Option<NaiveDate>,
    histories: &HashMap<i64, PositionHistory>,
) -> Resolution {
    let Some(nid) = nid.filter(|_| is_eligible(judge_label, nid)) else {
        return Resolution::Skipped;
    };
    let Some(history) = histories.get(&nid) else {
        return Resolution::Unresolved(Unresolved::MissingHistory);
    };
    let Some(reference) = reference else {
        return Resolution::Unresolved(Unresolved::NoReferenceDate);
    };
    match history.resolve(reference) {
        Some(position) => Resolution::Resolved(position),
        None => Resolution::Unresolved(Unresolved::NoQualifyingSlot),
    }
}

/// FJC export header → column name used throughout the pipeline.
///
/// `"Court Type (1)"` → `"fjc_court_type_(1)"`.
pub fn fjc_column(header: &str) -> String {
    format!("fjc_{}", header.trim().to_lowercase().replace(' ', "_"))
}
