pub mod grade;
pub mod loaders;
pub mod requirement;
pub mod stage;
pub mod submission;

pub use grade::GradeBand;
pub use loaders::{load_all_submissions, load_baseline_corpus, load_requirement_seeds, load_submission};
pub use requirement::{MatchReport, MatchResult, RequirementRecord};
pub use stage::{
    AnalysisResult, ConfidenceLevel, ExtractionResult, MarkingResult, RecommendationResult,
    Resource, Section, StageKind, StagePayload, StageResult, StageStatus,
};
pub use submission::{SubmissionRecord, SubmissionRequest, SubmissionSource};
