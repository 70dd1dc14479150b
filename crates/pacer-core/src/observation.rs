//! Judge entity observations: assigned-judge extraction and per-case tallies.

use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Extraction method and docket source that identify the presiding judge.
pub const ASSIGNED_JUDGE_METHOD: &str = "assigned_judge";
pub const HEADER_METADATA_SOURCE: &str = "header_metadata";

/// Labels that carry no judge type and are left out of the tallies.
pub const UNTYPED_LABELS: &[&str] = &["Ambiguous", "Inconclusive"];

pub const ARTICLE_III_JUDGE: &str = "Article III Judge";
pub const DISTRICT_JUDGE: &str = "District Judge";

/// One (case, judge slot) extraction event from the entity table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JudgeObservation {
    pub ucid: String,
    pub judge_label: Option<String>,
    pub extraction_method: Option<String>,
    pub docket_source: Option<String>,
    pub sjid: Option<String>,
    pub fjc_nid: Option<i64>,
}

impl JudgeObservation {
    pub fn is_assignment(&self) -> bool {
        self.extraction_method.as_deref() == Some(ASSIGNED_JUDGE_METHOD)
            && self.docket_source.as_deref() == Some(HEADER_METADATA_SOURCE)
    }
}

/// The presiding judge of a case, with the now-constant method/source dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedJudge {
    pub ucid: String,
    pub judge_label: Option<String>,
    pub sjid: Option<String>,
    pub fjc_nid: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct AssignedJudges {
    /// One row per case, in order of first appearance.
    pub rows: Vec<AssignedJudge>,
    /// Cases that had more than one assignment row.
    pub ambiguous_cases: BTreeSet<String>,
    /// Assignment rows dropped because an earlier row for the case was kept.
    pub discarded: usize,
}

/// Keep the first assignment row per case.
///
/// Extra rows for a case point at inconsistent upstream extraction. They are
/// not merged; the case is recorded in `ambiguous_cases` instead.
pub fn assigned_judges(observations: &[JudgeObservation]) -> AssignedJudges {
    let mut seen = HashSet::new();
    let mut out = AssignedJudges::default();
    for obs in observations.iter().filter(|o| o.is_assignment()) {
        if seen.insert(obs.ucid.as_str()) {
            out.rows.push(AssignedJudge {
                ucid: obs.ucid.clone(),
                judge_label: obs.judge_label.clone(),
                sjid: obs.sjid.clone(),
                fjc_nid: obs.fjc_nid,
            });
        } else {
            out.discarded += 1;
            out.ambiguous_cases.insert(obs.ucid.clone());
        }
    }
    out
}

/// `"Article III Judge"` is reported as `"District Judge"`; untyped labels drop out.
pub fn tally_label(label: &str) -> Option<&str> {
    if UNTYPED_LABELS.contains(&label) {
        None
    } else if label == ARTICLE_III_JUDGE {
        Some(DISTRICT_JUDGE)
    } else {
        Some(label)
    }
}

/// Distinct judges per (case, label), ready to pivot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JudgeTallies {
    counts: BTreeMap<String, BTreeMap<String, i64>>,
    labels: BTreeSet<String>,
}

impl JudgeTallies {
    /// Count each judge once per case and label, however often it was extracted.
    pub fn from_observations(observations: &[JudgeObservation]) -> Self {
        let mut distinct: BTreeSet<(&str, Option<&str>, &str)> = BTreeSet::new();
        for obs in observations {
            let Some(label) = obs.judge_label.as_deref().and_then(tally_label) else {
                continue;
            };
            distinct.insert((obs.ucid.as_str(), obs.sjid.as_deref(), label));
        }

        let mut tallies = Self::default();
        for (ucid, _, label) in distinct {
            *tallies
                .counts
                .entry(ucid.to_string())
                .or_default()
                .entry(label.to_string())
                .or_default() += 1;
            tallies.labels.insert(label.to_string());
        }
        tallies
    }

    /// Every label seen, sorted.
    pub fn labels(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    /// Cases with at least one typed judge, sorted by ucid.
    pub fn cases(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Zero when the case never saw a judge with this label.
    pub fn count(&self, ucid: &str, label: &str) -> i64 {
        self.counts
            .get(ucid)
            .and_then(|labels| labels.get(label))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
