pub mod extractor;
pub mod llm_client;

pub use extractor::{DocumentExtractor, TextExtractor};
pub use llm_client::{LlmClient, TextGenerator};
