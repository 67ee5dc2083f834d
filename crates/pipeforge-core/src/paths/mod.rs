//! Path utilities shared by the template engine, the schema engine and the
//! path cache.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately
//! - All cache lookups and root-prefix comparisons go through `normalize`
//!   so equality is platform-independent

mod error;
mod normalize;

pub use error::PathError;
pub use normalize::{join_relative, lookup_form, normalize_relative, normalize_separators};
