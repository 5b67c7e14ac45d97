pub mod requirement_catalog;
pub mod requirement_matcher;
pub mod score_util;
pub mod similarity;
pub mod submission_service;

pub use requirement_catalog::RequirementCatalog;
pub use requirement_matcher::RequirementMatcher;
pub use similarity::SimilarityScorer;
pub use submission_service::SubmissionService;
