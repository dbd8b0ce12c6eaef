pub mod error;
pub mod logging;
pub mod string_utils;

pub use error::*;
pub use string_utils::{collapse_whitespace, constant_time_eq, truncate_at_word_boundary, truncate_chars, truncate_safe, truncate_with_suffix};
