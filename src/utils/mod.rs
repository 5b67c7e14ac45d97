pub mod json;
pub mod logging;

pub use json::{parse_json_as, parse_json_object};
pub use logging::truncate_text;
