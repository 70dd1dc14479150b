//! End-to-end runs of the pipeline over a small on-disk archive.
//!
//! ```text
//! pacer/<court>/json/<year>/*.json ──► data/global_index.csv
//!                                          │  scope
//!                                          ▼
//!                          projects/<name>/data/case_index.csv
//!   data/judge_entities.csv ──► judges.csv ──► processed_judges.csv
//!   data/judge_index.csv, data/fjc_judges.csv ─────┘
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use pacer_core::{Scope, index, judges};
use pacer_pipeline::{
    BuildReport, CourtDirectory, GlobalIndexBuilder, JudgeBatchJoiner, JudgeDataProcessor, PipelineError,
    Project, ProjectRegistry, Settings,
};
use pacer_store::{WriteMode, read_header, read_table};
use tempfile::TempDir;

const CASE_ONE: &str = "ilnd;;1:16-cv-00001";
const CASE_TWO: &str = "ilnd;;1:16-cv-00002";
const CASE_THREE: &str = "ilnd;;1:16-cr-00003";
const CASE_FOUR: &str = "nysd;;1:17-cv-00004";

fn write(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn fjc_header() -> String {
    let mut names: Vec<String> = [
        "nid",
        "First Name",
        "Middle Name",
        "Last Name",
        "Suffix",
        "Birth Year",
        "Gender",
        "Race or Ethnicity",
    ]
    .map(String::from)
    .to_vec();
    for position in 1..=5 {
        for field in [
            "Court Type",
            "Court Name",
            "Party of Appointing President",
            "Commission Date",
        ] {
            names.push(format!("{field} ({position})"));
        }
    }
    names.join(",")
}

/// Archive, reference tables and settings rooted in a temp dir.
struct Fixture {
    _tmp: TempDir,
    settings: Settings,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base");
        let pacer = tmp.path().join("pacer");

        write(
            &pacer.join("ilnd/json/2016/1-16-cv-00001.json"),
            &format!(
                r#"{{"ucid": "{CASE_ONE}", "case_id": "1:16-cv-00001", "court": "ilnd",
                    "case_type": "cv", "case_name": "Doe v. Roe, et al.",
                    "nature_suit": "440 Civil Rights: Other", "filing_date": "2016-02-03",
                    "terminating_date": "09/01/2016", "case_flags": "",
                    "download_timestamp": "2019-05-01T10:11:12",
                    "docket": [{{"date_filed": "2016-02-03"}}, {{"date_filed": "09/01/2016"}}],
                    "parties": [
                        {{"party_type": "plaintiff", "name": "Jane Doe",
                          "counsel": [{{"name": "Jane Doe"}}]}},
                        {{"party_type": "defendant", "name": "Richard Roe", "counsel": null}}
                    ]}}"#
            ),
        );
        write(
            &pacer.join("ilnd/json/2016/1-16-cv-00002.json"),
            &format!(
                r#"{{"ucid": "{CASE_TWO}", "court": "ilnd", "case_type": "cv",
                    "nature_suit": "422 Bankruptcy Appeal", "filing_date": "2016-03-01",
                    "case_flags": "CLOSED,STAYED",
                    "docket": [{{"date_filed": "2016-05-05"}}]}}"#
            ),
        );
        write(
            &pacer.join("ilnd/json/2016/1-16-cr-00003.json"),
            &format!(
                r#"{{"ucid": "{CASE_THREE}", "court": "ilnd", "case_type": "cr",
                    "filing_date": "2016-04-01", "terminating_date": "2016-10-01"}}"#
            ),
        );
        write(
            &pacer.join("nysd/json/2017/1-17-cv-00004.json"),
            &format!(
                r#"{{"ucid": "{CASE_FOUR}", "court": "nysd", "case_type": "cv",
                    "nature_suit": "190 Contract: Other", "filing_date": "2017-01-10",
                    "terminating_date": "2017-12-01",
                    "docket": [{{"date_filed": "2017-12-01"}}]}}"#
            ),
        );
        write(&pacer.join("nysd/json/2017/broken.json"), "{\"ucid\": ");

        let data = base.join("data");
        write(
            &data.join("courts.csv"),
            "abbreviation,name,circuit,cardinal\n\
             ilnd,Northern District of Illinois,7,northern\n\
             nysd,Southern District of New York,2,southern\n",
        );
        write(
            &data.join("cases_pending.csv"),
            "U.S. District Courts\nPending Cases\nBy District\n\n\
             Circuit,Abbreviation,Total,Civil,Criminal\n\
             7TH,ilnd,\"9,000\",\"8,105\",895\n",
        );
        write(
            &data.join("judge_entities.csv"),
            &format!(
                "ucid,judge_label,_entity_extraction_method,docket_source,SJID,Full_Span\n\
                 {CASE_ONE},District Judge,assigned_judge,header_metadata,SJ1,Castillo\n\
                 {CASE_ONE},Article III Judge,ner,line_entry,SJ1,Judge Castillo\n\
                 {CASE_ONE},Magistrate Judge,ner,line_entry,SJ2,Judge Finnegan\n\
                 {CASE_ONE},Ambiguous,ner,line_entry,SJ3,the court\n\
                 {CASE_TWO},District Judge,assigned_judge,header_metadata,SJ1,Castillo\n\
                 {CASE_FOUR},District Judge,assigned_judge,header_metadata,SJ4,Clark\n"
            ),
        );
        write(
            &data.join("judge_index.csv"),
            "SJID,NID,Name\nSJ1,1393.0,Castillo\nSJ2,,Finnegan\nSJ4,2000,Clark\n",
        );
        write(
            &data.join("fjc_judges.csv"),
            &format!(
                "{}\n\
                 1393,Ruben,,Castillo,,1954,Male,Hispanic,\
                 ,,,,\
                 U.S. District Court,N.D. Ill.,Democratic,1994-10-07,\
                 ,,,,\
                 U.S. District Court,S.D.N.Y.,Democratic,3/15/2010,\
                 U.S. Court of Appeals,Seventh Circuit,Democratic,2014-06-01\n\
                 2000,Ann,,Clark,,1960,Female,White,\
                 U.S. District Court,S.D.N.Y.,Republican,2018-01-02\n",
                fjc_header()
            ),
        );

        let mut settings = Settings::new(&base).with_pacer_dir(&pacer);
        settings.index_batch_size = 2;
        settings.judge_batch_size = 2;
        Self { _tmp: tmp, settings }
    }

    fn build_global_index(&self, mode: WriteMode) -> pacer_pipeline::IndexBuildStats {
        let courts = CourtDirectory::load(
            &self.settings.courts_path(),
            &self.settings.cases_pending_path(),
            self.settings.pending_preamble_lines,
        )
        .unwrap();
        GlobalIndexBuilder::new(&self.settings, &courts)
            .build(mode)
            .unwrap()
    }

    fn project(&self, name: &str, scope: Scope) -> Project {
        Project::new(name, scope, &self.settings.projects_dir())
    }
}

fn study_scope() -> Scope {
    Scope::new()
        .with_case_type("cv")
        .with_date_range(
            NaiveDate::from_ymd_opt(2016, 1, 1),
            NaiveDate::from_ymd_opt(2016, 12, 31),
        )
        .closed_only()
        .excluding_nos_codes([422])
}

fn read_all(path: &Path, schema: arrow::datatypes::Schema) -> Vec<RecordBatch> {
    read_table(path, Arc::new(schema), 1024)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn ucids(batches: &[RecordBatch]) -> Vec<String> {
    batches
        .iter()
        .flat_map(|b| {
            let col = b
                .column_by_name("ucid")
                .unwrap()
                .as_any()
                .downcast_ref::<StringArray>()
                .unwrap()
                .clone();
            (0..col.len()).map(move |i| col.value(i).to_string())
        })
        .collect()
}

#[test]
fn global_index_covers_archive() {
    let fx = Fixture::new();
    let stats = fx.build_global_index(WriteMode::Fresh);
    assert_eq!(stats.files, 5);
    assert_eq!(stats.rows, 4);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.batches, 3);

    let batches = read_all(&fx.settings.global_index_path(), index::global_index_schema());
    assert_eq!(ucids(&batches), vec![CASE_THREE, CASE_ONE, CASE_TWO, CASE_FOUR]);
}

#[test]
fn blank_ucid_records_are_skipped() {
    let fx = Fixture::new();
    let pacer = fx.settings.pacer_dir().unwrap().to_path_buf();
    write(&pacer.join("ilnd/json/2016/zz-empty.json"), r#"{"ucid": "", "case_type": "cv"}"#);
    write(&pacer.join("ilnd/json/2016/zz-blank.json"), r#"{"ucid": "  ", "case_type": "cv"}"#);

    let stats = fx.build_global_index(WriteMode::Fresh);
    assert_eq!(stats.files, 7);
    assert_eq!(stats.rows, 4);
    assert_eq!(stats.skipped, 3);

    let project = fx.project("everything", Scope::default());
    assert_eq!(project.build_case_index(&fx.settings).unwrap(), 4);
    assert_eq!(project.nos_counts(&fx.settings).unwrap().len(), 3);
}

#[test]
fn append_extends_global_index() {
    let fx = Fixture::new();
    fx.build_global_index(WriteMode::Fresh);
    let appended = fx.build_global_index(WriteMode::Append);
    assert_eq!(appended.rows, 4);

    let batches = read_all(&fx.settings.global_index_path(), index::global_index_schema());
    assert_eq!(ucids(&batches).len(), 8, "append keeps duplicates");
}

#[test]
fn fresh_rebuild_replaces_global_index() {
    let fx = Fixture::new();
    fx.build_global_index(WriteMode::Fresh);
    let first = fs::read(fx.settings.global_index_path()).unwrap();
    fx.build_global_index(WriteMode::Fresh);
    assert_eq!(fs::read(fx.settings.global_index_path()).unwrap(), first);
}

#[test]
fn unrestricted_scope_reproduces_global_index() {
    let fx = Fixture::new();
    fx.build_global_index(WriteMode::Fresh);
    let project = fx.project("everything", Scope::default());
    let rows = project.build_case_index(&fx.settings).unwrap();
    assert_eq!(rows, 4);
    assert_eq!(
        fs::read(project.case_index_path()).unwrap(),
        fs::read(fx.settings.global_index_path()).unwrap()
    );
}

#[test]
fn scoped_case_index_is_reproducible() {
    let fx = Fixture::new();
    fx.build_global_index(WriteMode::Fresh);
    let project = fx.project("study", study_scope());

    assert_eq!(project.build_case_index(&fx.settings).unwrap(), 1);
    let first = fs::read(project.case_index_path()).unwrap();
    assert_eq!(project.build_case_index(&fx.settings).unwrap(), 1);
    assert_eq!(fs::read(project.case_index_path()).unwrap(), first);

    let batches = read_all(&project.case_index_path(), index::global_index_schema());
    assert_eq!(ucids(&batches), vec![CASE_ONE]);
    assert_eq!(project.nos_counts(&fx.settings).unwrap(), vec![(440, 1)]);
}

#[test]
fn project_build_runs_missing_stages() {
    let fx = Fixture::new();
    fx.build_global_index(WriteMode::Fresh);
    let project = fx.project("study", study_scope());

    let report = project.build(&fx.settings, false).unwrap();
    assert_eq!(report.case_index_rows, Some(1));
    assert_eq!(report.judge_rows, Some(4));
    assert_eq!(report.processed_rows, Some(1));

    let again = project.build(&fx.settings, false).unwrap();
    assert_eq!(again, BuildReport::default());

    let reset = project.build(&fx.settings, true).unwrap();
    assert_eq!(reset.case_index_rows, Some(1));
    assert_eq!(reset.processed_rows, Some(1));
}

#[test]
fn judge_stages_tally_and_resolve_positions() {
    let fx = Fixture::new();
    fx.build_global_index(WriteMode::Fresh);
    let project = fx.project("civil", Scope::new().with_case_type("cv"));
    project.build_case_index(&fx.settings).unwrap();

    let joined = JudgeBatchJoiner::new(&fx.settings).collect(&project).unwrap();
    assert_eq!(joined.scanned, 6);
    assert_eq!(joined.chunks, 3);
    assert_eq!(joined.kept, 6);

    let stats = JudgeDataProcessor::new(&fx.settings).process(&project).unwrap();
    assert_eq!(stats.labels, vec!["District Judge", "Magistrate Judge"]);
    assert_eq!(stats.assigned, 3);
    assert_eq!(stats.cases, 3);
    assert_eq!(stats.resolved, 2);

    let path = project.processed_judge_data_path();
    let header = read_header(&path).unwrap();
    assert_eq!(
        &header[..4],
        ["ucid", "judge_count_district_judge", "judge_count_magistrate_judge", "judge_label"]
    );

    let batches = read_all(&path, judges::processed_judge_schema(&stats.labels));
    let batch = arrow::compute::concat_batches(&batches[0].schema(), &batches).unwrap();
    let text = |name: &str| {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .clone()
    };
    let ints = |name: &str| {
        batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap()
            .clone()
    };

    assert_eq!(ucids(&[batch.clone()]), vec![CASE_ONE, CASE_TWO, CASE_FOUR]);
    let district = ints("judge_count_district_judge");
    let magistrate = ints("judge_count_magistrate_judge");
    assert_eq!(district.values().to_vec(), vec![1, 1, 1]);
    assert_eq!(magistrate.values().to_vec(), vec![1, 0, 0]);

    // Case one ended 2016-09-01: the 2010 district commission (slot 4) applies.
    let used = ints("fjc_position_used");
    assert_eq!(used.value(0), 4);
    assert_eq!(text("fjc_court_name").value(0), "S.D.N.Y.");
    assert_eq!(text("fjc_last_name").value(0), "Castillo");
    assert_eq!(ints("fjc_nid").value(0), 1393);

    // Case two has no docket dates past 2016-05-05; same judge, same slot.
    assert_eq!(used.value(1), 4);

    // Case four's judge was commissioned after the last entry.
    assert!(used.is_null(2));
    assert_eq!(text("sjid").value(2), "SJ4");
    assert!(text("fjc_court_name").is_null(2));
}

#[test]
fn registry_resolves_declared_projects() {
    let fx = Fixture::new();
    let dir = fx.settings.projects_dir().join("settlement");
    write(
        &dir.join("project.json"),
        r#"{"name": "settlement", "scope": {"case_type": "cv", "closed_only": true,
            "min_date": "2016-01-01", "max_date": "2016-12-31",
            "exclude_nos_codes": [422]}}"#,
    );
    let registry = ProjectRegistry::load_dir(&fx.settings.projects_dir()).unwrap();
    let project = registry.get("settlement").unwrap();
    assert_eq!(project.scope(), &study_scope());
    assert!(matches!(
        registry.get("missing"),
        Err(pacer_pipeline::RegistryError::NotFound(_))
    ));
}

#[test]
fn global_index_requires_pacer_dir() {
    let fx = Fixture::new();
    let settings = Settings::new(&fx.settings.base_dir);
    let courts = CourtDirectory::default();
    let err = GlobalIndexBuilder::new(&settings, &courts)
        .build(WriteMode::Fresh)
        .unwrap_err();
    assert!(matches!(err, PipelineError::MissingPacerDir));
}

#[test]
fn shipped_project_declarations_load() {
    let projects_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../projects");
    let registry = ProjectRegistry::load_dir(&projects_dir).unwrap();
    let names: Vec<&str> = registry.all().map(Project::name).collect();
    assert_eq!(names, vec!["pathways", "settlement"]);

    let settlement = registry.get("settlement").unwrap().scope();
    let pathways = registry.get("pathways").unwrap().scope();
    assert!(settlement.closed_only);
    assert!(!pathways.closed_only);
    assert!(settlement.exclude_nos_codes.contains(&220));
    assert!(!pathways.exclude_nos_codes.contains(&220));
    assert_eq!(settlement.exclude_nos_codes.len(), 16);
}
