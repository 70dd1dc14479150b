//! Pipeline stages over the PACER case archive.
//!
//! The global index is built once from the archive. Each project then
//! filters it into a case index, collects judge observations for those
//! cases, and summarises them with FJC position data.

mod columns;
pub mod config;
pub mod courts;
pub mod error;
pub mod global_index;
pub mod judges;
pub mod positions;
pub mod project;
pub mod registry;

pub use config::Settings;
pub use courts::{CourtDirectory, CourtInfo};
pub use error::PipelineError;
pub use global_index::{GlobalIndexBuilder, IndexBuildStats, case_paths};
pub use judges::{JoinStats, JudgeBatchJoiner, JudgeDataProcessor, ProcessStats};
pub use positions::load_histories;
pub use project::{BuildReport, Project, ProjectConfig};
pub use registry::{ProjectRegistry, RegistryError};
