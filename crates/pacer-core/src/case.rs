//! Raw PACER case records and their normalisation into flat index rows.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Party role strings as they appear in the `party_type` field.
pub const PLAINTIFF: &str = "plaintiff";
pub const DEFENDANT: &str = "defendant";

/// Case status flag that marks a case closed even without a terminating date.
pub const CLOSED_FLAG: &str = "CLOSED";

/// One case as stored in the archive (`<court>/json/<year>/<ucid>.json`).
///
/// Scalar fields are read leniently: numbers and booleans are kept as their
/// textual form so a stray type in one record does not reject the whole file.
/// Bookkeeping fields (`is_multi`, `case_pacer_id`, `download_url`,
/// `n_docket_reports`) and anything unknown are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseRecord {
    #[serde(deserialize_with = "required_text")]
    pub ucid: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub case_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub court: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub case_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub case_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub case_status: Option<String>,
    #[serde(default, deserialize_with = "flag_list")]
    pub case_flags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nature_suit: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub cause: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub jurisdiction: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub jury_demand: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub judge: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub referred_judge: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub lead_case_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub filing_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub terminating_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub download_timestamp: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub docket: Vec<DocketEntry>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub parties: Vec<Party>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocketEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub date_filed: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Party {
    #[serde(default, deserialize_with = "lenient_text")]
    pub party_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable_list")]
    pub counsel: Vec<Counsel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Counsel {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// A case flattened into index features. Dates are still raw text here;
/// the index builder parses them column-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCase {
    pub ucid: String,
    pub case_id: Option<String>,
    pub court: Option<String>,
    pub case_type: Option<String>,
    pub case_name: Option<String>,
    pub case_status: Option<String>,
    pub case_flags: Vec<String>,
    pub nature_suit: Option<String>,
    pub cause: Option<String>,
    pub jurisdiction: Option<String>,
    pub jury_demand: Option<String>,
    pub judge: Option<String>,
    pub referred_judge: Option<String>,
    pub lead_case_id: Option<String>,
    pub filing_date: Option<String>,
    pub terminating_date: Option<String>,
    pub download_timestamp: Option<String>,
    pub first_entry_date: Option<String>,
    pub last_entry_date: Option<String>,
    pub num_entries: usize,
    pub num_parties: usize,
    pub num_plaintiffs: usize,
    pub num_defendants: usize,
    pub has_pro_se_party: bool,
}

impl NormalizedCase {
    /// Case flags joined back into the single text column stored in the index.
    pub fn flags_text(&self) -> Option<String> {
        if self.case_flags.is_empty() {
            None
        } else {
            Some(self.case_flags.join(","))
        }
    }
}

/// Flatten a raw record: docket bounds, party counts and the pro se flag.
pub fn normalize(record: CaseRecord) -> NormalizedCase {
    let first_entry_date = record.docket.first().and_then(|e| e.date_filed.clone());
    let last_entry_date = record.docket.last().and_then(|e| e.date_filed.clone());

    NormalizedCase {
        num_entries: record.docket.len(),
        num_parties: record.parties.len(),
        num_plaintiffs: count_party_type(&record.parties, PLAINTIFF),
        num_defendants: count_party_type(&record.parties, DEFENDANT),
        has_pro_se_party: has_pro_se_party(&record.parties),
        first_entry_date,
        last_entry_date,
        ucid: record.ucid,
        case_id: record.case_id,
        court: record.court,
        case_type: record.case_type,
        case_name: record.case_name,
        case_status: record.case_status,
        case_flags: record.case_flags,
        nature_suit: record.nature_suit,
        cause: record.cause,
        jurisdiction: record.jurisdiction,
        jury_demand: record.jury_demand,
        judge: record.judge,
        referred_judge: record.referred_judge,
        lead_case_id: record.lead_case_id,
        filing_date: record.filing_date,
        terminating_date: record.terminating_date,
        download_timestamp: record.download_timestamp,
    }
}

/// A party represents itself when it is listed as one of its own counsel.
pub fn has_pro_se_party(parties: &[Party]) -> bool {
    parties.iter().any(|party| {
        let Some(name) = party.name.as_deref() else {
            return false;
        };
        let name = name.to_lowercase();
        party
            .counsel
            .iter()
            .filter_map(|c| c.name.as_deref())
            .any(|counsel| counsel.to_lowercase() == name)
    })
}

pub fn count_party_type(parties: &[Party], party_type: &str) -> usize {
    parties
        .iter()
        .filter(|p| p.party_type.as_deref() == Some(party_type))
        .count()
}

/// Leading whitespace-delimited token of a nature-of-suit string, as an integer.
///
/// `"440 Civil Rights: Other"` → `Some(440)`; `"Other"` → `None`.
pub fn nature_suit_code(nature_suit: Option<&str>) -> Option<i64> {
    nature_suit?.split_whitespace().next()?.parse().ok()
}

/// Closed when a terminating date is present or the `CLOSED` flag is set.
pub fn is_closed(has_terminating_date: bool, flags: &[String]) -> bool {
    has_terminating_date || flags.iter().any(|f| f == CLOSED_FLAG)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Case flags arrive either as a list or as one comma-separated string.
/// Identifier fields: a blank value rejects the record.
fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("blank identifier"));
    }
    Ok(value)
}

fn flag_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|f| !f.is_empty())
            .collect(),
        _ => Vec::new(),
    })
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
