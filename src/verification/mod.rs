pub mod name_match;

pub use name_match::{best_match, match_names, normalize_name};
