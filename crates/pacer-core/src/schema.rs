/// Arrow schemas for the pipeline's persisted tables.
pub mod index {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Columns the scope filter and judge processor read by name.
    pub const UCID: &str = "ucid";
    pub const COURT: &str = "court";
    pub const CASE_TYPE: &str = "case_type";
    pub const FILING_DATE: &str = "filing_date";
    pub const LAST_ENTRY_DATE: &str = "last_entry_date";
    pub const IS_CLOSED: &str = "is_closed";
    pub const NATURE_SUIT_CODE: &str = "nature_suit_code";

    /// Schema of the global index and of every project case index.
    pub fn global_index_schema() -> Schema {
        Schema::new(vec![
            Field::new(UCID, DataType::Utf8, false),
            Field::new("case_id", DataType::Utf8, true),
            Field::new(COURT, DataType::Utf8, true),
            Field::new(CASE_TYPE, DataType::Utf8, true),
            Field::new("case_name", DataType::Utf8, true),
            Field::new("case_status", DataType::Utf8, true),
            Field::new("case_flags", DataType::Utf8, true),
            Field::new("nature_suit", DataType::Utf8, true),
            Field::new("cause", DataType::Utf8, true),
            Field::new("jurisdiction", DataType::Utf8, true),
            Field::new("jury_demand", DataType::Utf8, true),
            Field::new("judge", DataType::Utf8, true),
            Field::new("referred_judge", DataType::Utf8, true),
            Field::new("lead_case_id", DataType::Utf8, true),
            Field::new(FILING_DATE, DataType::Date32, true),
            Field::new("terminating_date", DataType::Date32, true),
            Field::new("download_timestamp", DataType::Utf8, true),
            Field::new("first_entry_date", DataType::Date32, true),
            Field::new(LAST_ENTRY_DATE, DataType::Date32, true),
            Field::new("num_entries", DataType::Int64, false),
            Field::new("num_parties", DataType::Int64, false),
            Field::new("num_plaintiffs", DataType::Int64, false),
            Field::new("num_defendants", DataType::Int64, false),
            Field::new("has_pro_se_party", DataType::Boolean, false),
            Field::new(NATURE_SUIT_CODE, DataType::Int64, true),
            Field::new(IS_CLOSED, DataType::Boolean, false),
            Field::new("court_name", DataType::Utf8, true),
            Field::new("circuit", DataType::Utf8, true),
            Field::new("district", DataType::Utf8, true),
            Field::new("pending_cases_civil", DataType::Int64, true),
            Field::new("pending_cases_criminal", DataType::Int64, true),
        ])
    }
}

/// Judge entity observations and their processed per-case summary.
pub mod judges {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const UCID: &str = "ucid";
    pub const JUDGE_LABEL: &str = "judge_label";
    pub const EXTRACTION_METHOD: &str = "_entity_extraction_method";
    pub const DOCKET_SOURCE: &str = "docket_source";
    pub const SJID: &str = "sjid";
    pub const FJC_NID: &str = "fjc_nid";

    /// Prefix of the pivoted per-label tally columns.
    pub const JUDGE_COUNT_PREFIX: &str = "judge_count_";

    /// Schema of a project's `judges.csv`.
    pub fn judge_data_schema() -> Schema {
        Schema::new(vec![
            Field::new(UCID, DataType::Utf8, false),
            Field::new(JUDGE_LABEL, DataType::Utf8, true),
            Field::new(EXTRACTION_METHOD, DataType::Utf8, true),
            Field::new(DOCKET_SOURCE, DataType::Utf8, true),
            Field::new(SJID, DataType::Utf8, true),
            Field::new(FJC_NID, DataType::Int64, true),
        ])
    }

    /// `"Magistrate Judge"` → `"judge_count_magistrate_judge"`.
    pub fn tally_column(label: &str) -> String {
        format!("{JUDGE_COUNT_PREFIX}{}", label.to_lowercase().replace(' ', "_"))
    }

    /// Fields that follow the tally columns in `processed_judges.csv`.
    pub fn assignment_fields() -> Vec<Field> {
        vec![
            Field::new(JUDGE_LABEL, DataType::Utf8, true),
            Field::new(SJID, DataType::Utf8, true),
            Field::new(FJC_NID, DataType::Int64, true),
            Field::new("fjc_court_type", DataType::Utf8, true),
            Field::new("fjc_court_name", DataType::Utf8, true),
            Field::new("fjc_party_of_appointing_pres", DataType::Utf8, true),
            Field::new("fjc_commission_date", DataType::Date32, true),
            Field::new("fjc_position_used", DataType::Int64, true),
            Field::new("fjc_first_name", DataType::Utf8, true),
            Field::new("fjc_middle_name", DataType::Utf8, true),
            Field::new("fjc_last_name", DataType::Utf8, true),
            Field::new("fjc_suffix", DataType::Utf8, true),
            Field::new("fjc_birth_year", DataType::Int64, true),
            Field::new("fjc_gender", DataType::Utf8, true),
            Field::new("fjc_race_or_ethnicity", DataType::Utf8, true),
        ]
    }

    /// Full processed schema for the given (already sorted) tally labels.
    pub fn processed_judge_schema(labels: &[String]) -> Schema {
        let mut fields = vec![Field::new(UCID, DataType::Utf8, false)];
        fields.extend(
            labels
                .iter()
                .map(|l| Field::new(tally_column(l), DataType::Int64, false)),
        );
        fields.extend(assignment_fields());
        Schema::new(fields)
    }
}
