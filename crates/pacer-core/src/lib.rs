pub mod case;
pub mod dates;
pub mod observation;
pub mod position;
pub mod schema;
pub mod scope;

pub use case::{CaseRecord, NormalizedCase, normalize};
pub use observation::{AssignedJudge, JudgeObservation, JudgeTallies};
pub use position::{PositionHistory, PositionSlot, Resolution, ResolvedPosition};
pub use schema::{index, judges};
pub use scope::{Scope, ScopeError, ScopeRow};
