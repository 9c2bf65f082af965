//! 迭代精修：Scorer / Drafter 契约、终止策略与有界精修循环

pub mod drafter;
pub mod error;
pub mod events;
pub mod loop_;
pub mod policy;
pub mod scorer;
pub mod types;

pub use drafter::{Drafter, LlmDrafter};
pub use error::{FailureKind, InvalidConfig, RefineError};
pub use events::RefineEvent;
pub use loop_::RefinementLoop;
pub use policy::{BestDraft, Decision, RefinementConfig};
pub use scorer::{evaluation_schema_json, parse_evaluation, LlmScorer, Scorer};
pub use types::{
    Document, EvaluationResult, IterationRecord, RefinementState, TerminationReason, SCORE_MAX,
    SCORE_MIN,
};
