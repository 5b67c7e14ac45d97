pub mod context;
pub mod stage;
pub mod stages;

pub use context::{WorkflowContext, WorkflowError, WorkflowStatus};
pub use stage::{Stage, StageSet};
pub use stages::{AnalyzeStage, ExtractStage, MarkStage, MatchStage, RecommendStage};
