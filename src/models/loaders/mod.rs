pub mod toml_loader;

pub use toml_loader::{
    load_all_submissions, load_baseline_corpus, load_requirement_seeds, load_submission,
};
