//! Typed placeholder definitions for templates.
//!
//! A key owns the validation, formatting and parsing rules for one named
//! placeholder. Keys are built once from configuration definitions and
//! shared by `Arc` across every template that references them; whether a
//! key is optional is a property of the referencing template, not of the
//! key itself.

use std::fmt::Write as _;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::TemplateError;
use crate::config::ConfigurationError;
use crate::domain::FieldValue;

/// Characters that may never appear in a string field value: they are
/// either path separators or reserved by the definition language.
const RESERVED_CHARS: &[char] = &['/', '\\', '{', '}', '[', ']'];

/// Kind-specific validation and formatting rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    /// Free string, optionally restricted to a whitelist of choices.
    Str { choices: Vec<String> },
    /// Integer, optionally zero-padded to a fixed width.
    Int { width: Option<usize> },
    /// Frame number: fixed-width integer or the `####` placeholder token.
    Sequence { width: usize },
    /// Timestamp rendered with a chrono format string.
    Timestamp { format: String },
}

/// A named, typed placeholder shared across templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateKey {
    name: String,
    kind: KeyKind,
    default: Option<FieldValue>,
}

impl TemplateKey {
    pub fn new(name: impl Into<String>, kind: KeyKind, default: Option<FieldValue>) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    /// Unrestricted string key.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, KeyKind::Str { choices: vec![] }, None)
    }

    pub fn integer(name: impl Into<String>, width: Option<usize>) -> Self {
        Self::new(name, KeyKind::Int { width }, None)
    }

    pub fn sequence(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, KeyKind::Sequence { width }, None)
    }

    pub fn timestamp(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self::new(
            name,
            KeyKind::Timestamp {
                format: format.into(),
            },
            None,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &KeyKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    /// Width of the formatted value when it is constant, which makes the
    /// key safe to place directly next to another key in a template.
    pub fn fixed_width(&self) -> Option<usize> {
        match &self.kind {
            KeyKind::Int { width } => *width,
            KeyKind::Sequence { width } => Some(*width),
            KeyKind::Str { .. } | KeyKind::Timestamp { .. } => None,
        }
    }

    /// Check a value against this key's kind rules.
    pub fn validate(&self, value: &FieldValue) -> Result<(), TemplateError> {
        match (&self.kind, value) {
            (KeyKind::Str { choices }, FieldValue::Str(s)) => {
                if s.is_empty() {
                    return Err(self.invalid(value, "empty string"));
                }
                if s.contains(RESERVED_CHARS) {
                    return Err(self.invalid(value, "contains a path separator or reserved character"));
                }
                if !choices.is_empty() && !choices.iter().any(|c| c == s) {
                    return Err(self.invalid(value, "not in the configured choices"));
                }
                Ok(())
            }
            (KeyKind::Int { width }, FieldValue::Int(i)) => {
                self.validate_numeric(*i, *width, value)
            }
            (KeyKind::Sequence { .. }, FieldValue::Frame) => Ok(()),
            (KeyKind::Sequence { width }, FieldValue::Int(i)) => {
                self.validate_numeric(*i, Some(*width), value)
            }
            (KeyKind::Timestamp { .. }, FieldValue::Timestamp(_)) => Ok(()),
            (_, other) => Err(self.invalid(other, "wrong value type for this key")),
        }
    }

    fn validate_numeric(
        &self,
        i: i64,
        width: Option<usize>,
        value: &FieldValue,
    ) -> Result<(), TemplateError> {
        if i < 0 {
            return Err(self.invalid(value, "negative values are not allowed in paths"));
        }
        if let Some(w) = width {
            let digits = i.to_string().len();
            if digits > w {
                return Err(self.invalid(value, "more digits than the configured width"));
            }
        }
        Ok(())
    }

    /// Render a validated value as its path fragment.
    pub fn format(&self, value: &FieldValue) -> Result<String, TemplateError> {
        self.validate(value)?;
        match (&self.kind, value) {
            (KeyKind::Str { .. }, FieldValue::Str(s)) => Ok(s.clone()),
            (KeyKind::Int { width: None }, FieldValue::Int(i)) => Ok(i.to_string()),
            (KeyKind::Int { width: Some(w) }, FieldValue::Int(i))
            | (KeyKind::Sequence { width: w }, FieldValue::Int(i)) => {
                Ok(format!("{i:0width$}", width = *w))
            }
            (KeyKind::Sequence { width }, FieldValue::Frame) => Ok("#".repeat(*width)),
            (KeyKind::Timestamp { format }, FieldValue::Timestamp(t)) => {
                render_timestamp(t, format).map_err(|reason| self.invalid(value, &reason))
            }
            // validate() already rejected every other combination
            _ => unreachable!("validated value does not match key kind"),
        }
    }

    /// Extract a value from a path fragment bounded by the caller.
    ///
    /// Returns the value and the number of bytes consumed. Fixed-width
    /// numeric kinds require the fragment to be exactly their width;
    /// anything longer or shorter is rejected rather than truncated.
    pub fn parse_fragment(&self, fragment: &str) -> Result<(FieldValue, usize), TemplateError> {
        if fragment.is_empty() {
            return Err(self.unparsable(fragment, "empty fragment"));
        }
        let value = match &self.kind {
            KeyKind::Str { .. } => {
                let value = FieldValue::Str(fragment.to_string());
                self.validate(&value)?;
                value
            }
            KeyKind::Int { width: None } => FieldValue::Int(self.parse_digits(fragment)?),
            KeyKind::Int { width: Some(w) } => {
                self.require_width(fragment, *w)?;
                FieldValue::Int(self.parse_digits(fragment)?)
            }
            KeyKind::Sequence { width } => {
                self.require_width(fragment, *width)?;
                if fragment.chars().all(|c| c == '#') {
                    FieldValue::Frame
                } else {
                    FieldValue::Int(self.parse_digits(fragment)?)
                }
            }
            KeyKind::Timestamp { format } => {
                let parsed = NaiveDateTime::parse_from_str(fragment, format)
                    .map_err(|e| self.unparsable(fragment, &e.to_string()))?;
                FieldValue::Timestamp(parsed)
            }
        };
        Ok((value, fragment.len()))
    }

    fn parse_digits(&self, fragment: &str) -> Result<i64, TemplateError> {
        if !fragment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.unparsable(fragment, "expected only digits"));
        }
        fragment
            .parse::<i64>()
            .map_err(|e| self.unparsable(fragment, &e.to_string()))
    }

    fn require_width(&self, fragment: &str, width: usize) -> Result<(), TemplateError> {
        if fragment.len() != width {
            return Err(self.unparsable(
                fragment,
                &format!("expected exactly {width} characters"),
            ));
        }
        Ok(())
    }

    fn invalid(&self, value: &FieldValue, reason: &str) -> TemplateError {
        TemplateError::InvalidValue {
            key: self.name.clone(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn unparsable(&self, fragment: &str, reason: &str) -> TemplateError {
        TemplateError::KeyParse {
            key: self.name.clone(),
            fragment: fragment.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// chrono's `DelayedFormat` reports bad format strings through `fmt::Error`,
/// so render through `write!` instead of `to_string` to avoid a panic.
fn render_timestamp(t: &NaiveDateTime, format: &str) -> Result<String, String> {
    let mut out = String::new();
    write!(out, "{}", t.format(format))
        .map_err(|_| format!("invalid timestamp format '{format}'"))?;
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarative definitions
// ─────────────────────────────────────────────────────────────────────────────

/// Kind discriminator used in key definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKindDefinition {
    String,
    Integer,
    Sequence,
    Timestamp,
}

/// Default padding for sequence keys when the definition omits a width.
const DEFAULT_SEQUENCE_WIDTH: usize = 4;

/// Default timestamp rendering when the definition omits a format.
const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Declarative definition of a template key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: KeyKindDefinition,
    /// Default value applied when a required key is missing from a field
    /// mapping (string or integer JSON scalar).
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    /// Whitelist of allowed values; only meaningful for string keys.
    #[serde(default)]
    pub choices: Vec<serde_json::Value>,
    /// Zero-padding width for integer and sequence keys.
    #[serde(default)]
    pub width: Option<usize>,
    /// chrono format string for timestamp keys.
    #[serde(default)]
    pub format: Option<String>,
}

impl KeyDefinition {
    /// Build and validate the immutable key from its definition.
    pub fn build(&self) -> Result<TemplateKey, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidKey {
            key: self.name.clone(),
            reason: reason.to_string(),
        };

        let kind = match self.kind {
            KeyKindDefinition::String => {
                let mut choices = Vec::with_capacity(self.choices.len());
                for choice in &self.choices {
                    match choice.as_str() {
                        Some(s) => choices.push(s.to_string()),
                        None => return Err(invalid("choices must be strings")),
                    }
                }
                KeyKind::Str { choices }
            }
            KeyKindDefinition::Integer => {
                if !self.choices.is_empty() {
                    return Err(invalid("choices are only supported on string keys"));
                }
                KeyKind::Int { width: self.width }
            }
            KeyKindDefinition::Sequence => KeyKind::Sequence {
                width: self.width.unwrap_or(DEFAULT_SEQUENCE_WIDTH),
            },
            KeyKindDefinition::Timestamp => {
                let format = self
                    .format
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TIMESTAMP_FORMAT.to_string());
                // Reject unrenderable format strings now rather than at
                // first use.
                let sample = NaiveDateTime::default();
                render_timestamp(&sample, &format).map_err(|reason| invalid(&reason))?;
                KeyKind::Timestamp { format }
            }
        };

        let default = match &self.default {
            Some(json) => {
                Some(FieldValue::from_json(json).ok_or_else(|| {
                    invalid("default must be a string or integer scalar")
                })?)
            }
            None => None,
        };

        let key = TemplateKey::new(&self.name, kind, default);
        if let Some(value) = key.default() {
            key.validate(value)
                .map_err(|e| invalid(&format!("default value rejected: {e}")))?;
        }
        Ok(key)
    }
}
