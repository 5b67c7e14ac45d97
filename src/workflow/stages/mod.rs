pub mod analyze;
pub mod extract;
pub mod mark;
pub mod match_stage;
pub mod recommend;

#[cfg(test)]
pub(crate) mod testing;

pub use analyze::AnalyzeStage;
pub use extract::ExtractStage;
pub use mark::MarkStage;
pub use match_stage::MatchStage;
pub use recommend::RecommendStage;
