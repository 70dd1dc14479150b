//! Static court metadata joined onto every global index row.

use std::collections::HashMap;
use std::path::Path;

use pacer_store::{TextTableOptions, read_text_table};
use tracing::{info, warn};

use crate::PipelineError;
use crate::columns::{owned_text, parse_count, strings, text};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourtInfo {
    pub name: Option<String>,
    pub circuit: Option<String>,
    pub district: Option<String>,
    pub pending_cases_civil: Option<i64>,
    pub pending_cases_criminal: Option<i64>,
}

/// Court code → metadata. Codes missing here leave the court columns null.
#[derive(Debug, Clone, Default)]
pub struct CourtDirectory {
    courts: HashMap<String, CourtInfo>,
}

impl CourtDirectory {
    /// Load the court table and merge in pending-case counts.
    ///
    /// The court table (`abbreviation,name,circuit,cardinal`) defines which
    /// courts exist. The pending-case table is optional; courts it does not
    /// mention keep null counts.
    pub fn load(
        courts_path: &Path,
        pending_path: &Path,
        pending_preamble: usize,
    ) -> Result<Self, PipelineError> {
        let mut courts = HashMap::new();
        let columns = ["abbreviation", "name", "circuit", "cardinal"];
        for batch in read_text_table(courts_path, &TextTableOptions::default(), &columns, normalise)? {
            let batch = batch?;
            let code = strings(&batch, "courts", "abbreviation")?;
            let name = strings(&batch, "courts", "name")?;
            let circuit = strings(&batch, "courts", "circuit")?;
            let district = strings(&batch, "courts", "cardinal")?;
            for row in 0..batch.num_rows() {
                let Some(code) = text(code, row) else {
                    continue;
                };
                courts.insert(
                    code.to_string(),
                    CourtInfo {
                        name: owned_text(name, row),
                        circuit: owned_text(circuit, row),
                        district: owned_text(district, row),
                        ..Default::default()
                    },
                );
            }
        }

        let mut directory = Self { courts };
        if pending_path.exists() {
            directory.merge_pending(pending_path, pending_preamble)?;
        } else {
            warn!(path = %pending_path.display(), "pending case table missing; counts left null");
        }
        info!(courts = directory.len(), "loaded court metadata");
        Ok(directory)
    }

    fn merge_pending(&mut self, path: &Path, preamble: usize) -> Result<(), PipelineError> {
        let options = TextTableOptions {
            skip_lines: preamble,
            ..Default::default()
        };
        let columns = ["abbreviation", "civil", "criminal"];
        for batch in read_text_table(path, &options, &columns, normalise)? {
            let batch = batch?;
            let code = strings(&batch, "cases_pending", "abbreviation")?;
            let civil = strings(&batch, "cases_pending", "civil")?;
            let criminal = strings(&batch, "cases_pending", "criminal")?;
            for row in 0..batch.num_rows() {
                let Some(info) = text(code, row).and_then(|c| self.courts.get_mut(c)) else {
                    continue;
                };
                info.pending_cases_civil = text(civil, row).and_then(parse_count);
                info.pending_cases_criminal = text(criminal, row).and_then(parse_count);
            }
        }
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&CourtInfo> {
        self.courts.get(code)
    }

    pub fn insert(&mut self, code: impl Into<String>, info: CourtInfo) {
        self.courts.insert(code.into(), info);
    }

    pub fn len(&self) -> usize {
        self.courts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courts.is_empty()
    }
}

fn normalise(header: &str) -> String {
    header.trim().to_lowercase()
}
