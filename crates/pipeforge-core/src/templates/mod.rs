//! The template engine: bidirectional mapping between keyed path patterns
//! and concrete filesystem paths.
//!
//! A [`Template`] is an ordered sequence of literals and [`TemplateKey`]
//! references parsed from a definition string such as
//! `shots/{Sequence}/{Shot}[/v{version}]`. It can format a field mapping
//! into a path under a storage root, and parse a concrete path back into
//! field values. [`TemplateSet`] resolves which template a given path
//! belongs to.
//!
//! Definitions are validated eagerly at configuration-load time; templates
//! are immutable afterwards and shared by reference.

mod key;
mod set;
mod template;

use thiserror::Error;

pub use key::{KeyDefinition, KeyKind, KeyKindDefinition, TemplateKey};
pub use set::TemplateSet;
pub use template::{Template, TemplateDefinition};

use crate::paths::PathError;

/// Errors local to a single template or key operation.
///
/// Configuration-time problems (malformed definitions, unknown keys or
/// roots) are reported as [`crate::config::ConfigurationError`] instead.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A required key was not supplied and has no default.
    #[error("Template '{template}' requires key '{key}' which was not supplied")]
    MissingKey { template: String, key: String },

    /// A supplied value failed the key's validation rules.
    #[error("Value '{value}' is not valid for key '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// No valid value could be extracted from a path fragment.
    #[error("Cannot parse '{fragment}' with key '{key}': {reason}")]
    KeyParse {
        key: String,
        fragment: String,
        reason: String,
    },

    /// The path does not match the template structure.
    #[error("Path '{path}' does not match template '{template}'")]
    NoMatch { template: String, path: String },

    /// No template in the set matches the path.
    #[error("Path '{path}' does not match any known template")]
    NoTemplateMatch { path: String },

    /// More than one template matches the path - a configuration
    /// inconsistency, never guessed around.
    #[error("Path '{path}' matches multiple templates: {templates:?}")]
    AmbiguousMatch {
        path: String,
        templates: Vec<String>,
    },

    /// Unknown template name requested from a set.
    #[error("No template named '{0}'")]
    UnknownTemplate(String),

    /// Storage-root resolution failed while formatting or parsing.
    #[error(transparent)]
    Path(#[from] PathError),
}
