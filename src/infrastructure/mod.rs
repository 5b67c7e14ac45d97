pub mod migrations;
pub mod store;

pub use store::{CorpusSnapshot, CorpusStore, GradeStore, RequirementSource, SubmissionStore};
