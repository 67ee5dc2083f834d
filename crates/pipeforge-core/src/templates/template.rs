//! Path templates: ordered literal/key sequences with optional blocks.
//!
//! Definition language:
//!
//! - `{name}` references a configured key
//! - `[...]` encloses an optional block containing exactly one key plus its
//!   adjacent literal text, e.g. `shots/{Sequence}/{Shot}[/v{version}]`
//!
//! When an optional block is omitted its literals are dropped with it, so a
//! formatted path never ends up with dangling separators. Internally the
//! template expands into *variations* - one literal/key sequence per subset
//! of optional blocks - ordered by descending key count. Parsing tries the
//! variations in that order, which makes the interpretation binding the
//! most keys win deterministically.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::TemplateError;
use super::key::TemplateKey;
use crate::config::ConfigurationError;
use crate::domain::{FieldMap, FieldValue};
use crate::paths::{join_relative, lookup_form, normalize_separators};
use crate::roots::StorageRoots;

/// One element of a template: literal text or a key reference.
#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Key(Arc<TemplateKey>),
}

/// A contiguous run of parts, either mandatory or an optional block.
#[derive(Debug, Clone)]
struct Block {
    optional: bool,
    parts: Vec<Part>,
}

/// One concrete literal/key sequence: the template with a specific subset
/// of its optional blocks included.
#[derive(Debug, Clone)]
struct Variation {
    parts: Vec<Part>,
    keys: BTreeSet<String>,
}

/// Declarative definition of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDefinition {
    pub name: String,
    /// Root-relative path pattern, e.g. `shots/{Sequence}/{Shot}`.
    pub definition: String,
    /// Storage root the pattern hangs off; the primary root when omitted.
    #[serde(default)]
    pub root: Option<String>,
}

/// An immutable, validated path template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    definition: String,
    root_name: String,
    variations: Vec<Variation>,
    required_keys: BTreeSet<String>,
    optional_keys: BTreeSet<String>,
}

impl Template {
    /// Build and validate a template from its definition.
    ///
    /// All structural problems - unknown keys, unknown roots, unbalanced or
    /// nested brackets, optional blocks without exactly one key, ambiguous
    /// key adjacency - are configuration errors reported here, not at use.
    pub fn from_definition(
        def: &TemplateDefinition,
        keys: &HashMap<String, Arc<TemplateKey>>,
        roots: &StorageRoots,
    ) -> Result<Self, ConfigurationError> {
        let root_name = def
            .root
            .clone()
            .unwrap_or_else(|| roots.primary().to_string());
        if !roots.contains(&root_name) {
            return Err(ConfigurationError::UnknownRootInTemplate {
                template: def.name.clone(),
                root: root_name,
            });
        }

        let blocks = parse_blocks(&def.name, &def.definition, keys)?;
        let variations = expand_variations(&def.name, &blocks)?;

        let mut required_keys = BTreeSet::new();
        let mut optional_keys = BTreeSet::new();
        for block in &blocks {
            for part in &block.parts {
                if let Part::Key(key) = part {
                    if block.optional {
                        optional_keys.insert(key.name().to_string());
                    } else {
                        required_keys.insert(key.name().to_string());
                    }
                }
            }
        }
        optional_keys.retain(|k| !required_keys.contains(k));

        Ok(Self {
            name: def.name.clone(),
            definition: def.definition.clone(),
            root_name,
            variations,
            required_keys,
            optional_keys,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.required_keys.iter().map(String::as_str)
    }

    pub fn optional_keys(&self) -> impl Iterator<Item = &str> {
        self.optional_keys.iter().map(String::as_str)
    }

    /// Format a field mapping into an absolute path under the template's
    /// storage root.
    ///
    /// Optional keys are included when present in `fields`; required keys
    /// fall back to their configured default and fail typed when absent.
    /// Field names the template does not declare are ignored, so one
    /// context-derived mapping can serve many templates.
    pub fn apply_fields(
        &self,
        fields: &FieldMap,
        roots: &StorageRoots,
    ) -> Result<PathBuf, TemplateError> {
        let mut target_keys = self.required_keys.clone();
        for key in &self.optional_keys {
            if fields.contains_key(key) {
                target_keys.insert(key.clone());
            }
        }

        // Every subset of optional blocks exists as a variation, so this
        // lookup cannot fail for a well-formed template.
        let variation = self
            .variations
            .iter()
            .find(|v| v.keys == target_keys)
            .ok_or_else(|| TemplateError::NoMatch {
                template: self.name.clone(),
                path: self.definition.clone(),
            })?;

        let mut relative = String::new();
        for part in &variation.parts {
            match part {
                Part::Literal(lit) => relative.push_str(lit),
                Part::Key(key) => {
                    let value = fields
                        .get(key.name())
                        .or_else(|| key.default())
                        .ok_or_else(|| TemplateError::MissingKey {
                            template: self.name.clone(),
                            key: key.name().to_string(),
                        })?;
                    relative.push_str(&key.format(value)?);
                }
            }
        }

        let root = roots.resolve(&self.root_name)?;
        Ok(join_relative(root, &relative))
    }

    /// Parse a concrete absolute path back into field values.
    ///
    /// Tries variations most-keys-first with greedy, backtracking segment
    /// matching; the first variation that explains the whole path wins.
    pub fn get_fields(
        &self,
        path: &Path,
        roots: &StorageRoots,
    ) -> Result<FieldMap, TemplateError> {
        let relative = self.strip_root(path, roots)?;
        for variation in &self.variations {
            let mut fields = FieldMap::new();
            if match_parts(&variation.parts, &relative, &mut fields) {
                return Ok(fields);
            }
        }
        Err(self.no_match(path))
    }

    /// True when `get_fields` would succeed for this path.
    pub fn matches(&self, path: &Path, roots: &StorageRoots) -> bool {
        self.get_fields(path, roots).is_ok()
    }

    fn strip_root(&self, path: &Path, roots: &StorageRoots) -> Result<String, TemplateError> {
        let root = roots.resolve(&self.root_name)?;
        let base = normalize_separators(&root.to_string_lossy());
        let base = base.trim_end_matches('/');
        let candidate = normalize_separators(&path.to_string_lossy());

        if lookup_form(&candidate).starts_with(&lookup_form(base))
            && candidate[base.len()..].starts_with('/')
        {
            Ok(candidate[base.len() + 1..].to_string())
        } else {
            Err(self.no_match(path))
        }
    }

    fn no_match(&self, path: &Path) -> TemplateError {
        TemplateError::NoMatch {
            template: self.name.clone(),
            path: path.display().to_string(),
        }
    }
}

/// Match a part sequence against text, filling `fields`. Backtracks over
/// candidate lengths for unconstrained keys, longest candidate first.
fn match_parts(parts: &[Part], text: &str, fields: &mut FieldMap) -> bool {
    match parts {
        [] => text.is_empty(),
        [Part::Literal(lit), rest @ ..] => text
            .strip_prefix(lit.as_str())
            .is_some_and(|remaining| match_parts(rest, remaining, fields)),
        [Part::Key(key), rest @ ..] => {
            if let Some(width) = key.fixed_width() {
                if text.len() < width || !text.is_char_boundary(width) {
                    return false;
                }
                try_candidate(key, &text[..width], rest, &text[width..], fields)
            } else {
                // Candidate ends: every occurrence of the next literal, or
                // the end of the text when the key is terminal. Longest
                // candidate first (greedy), shorter ones on backtrack.
                let ends: Vec<usize> = match rest.first() {
                    None => vec![text.len()],
                    Some(Part::Literal(lit)) => {
                        let mut ends: Vec<usize> =
                            text.match_indices(lit.as_str()).map(|(i, _)| i).collect();
                        ends.reverse();
                        ends
                    }
                    // Load-time validation guarantees a key next to a key
                    // is fixed-width, so the unconstrained case never has a
                    // key on its right.
                    Some(Part::Key(_)) => return false,
                };
                ends.into_iter().any(|end| {
                    try_candidate(key, &text[..end], rest, &text[end..], fields)
                })
            }
        }
    }
}

fn try_candidate(
    key: &TemplateKey,
    candidate: &str,
    rest: &[Part],
    remaining: &str,
    fields: &mut FieldMap,
) -> bool {
    let Ok((value, consumed)) = key.parse_fragment(candidate) else {
        return false;
    };
    if consumed != candidate.len() {
        return false;
    }
    // The same key may appear more than once; every occurrence must agree.
    if let Some(existing) = fields.get(key.name()) {
        return *existing == value && match_parts(rest, remaining, fields);
    }
    fields.insert(key.name().to_string(), value);
    if match_parts(rest, remaining, fields) {
        true
    } else {
        fields.remove(key.name());
        false
    }
}

/// Parse a definition string into mandatory and optional blocks.
fn parse_blocks(
    template: &str,
    definition: &str,
    keys: &HashMap<String, Arc<TemplateKey>>,
) -> Result<Vec<Block>, ConfigurationError> {
    let malformed = |reason: &str| ConfigurationError::MalformedTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut blocks = Vec::new();
    let mut parts: Vec<Part> = Vec::new();
    let mut literal = String::new();
    let mut in_optional = false;

    let mut flush_literal = |literal: &mut String, parts: &mut Vec<Part>| {
        if !literal.is_empty() {
            parts.push(Part::Literal(std::mem::take(literal)));
        }
    };

    let mut chars = definition.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) if inner != '{' && inner != '[' && inner != ']' => {
                            name.push(inner);
                        }
                        _ => return Err(malformed("unterminated key reference")),
                    }
                }
                let key = keys
                    .get(&name)
                    .ok_or_else(|| ConfigurationError::UnknownTemplateKey {
                        template: template.to_string(),
                        key: name.clone(),
                    })?;
                flush_literal(&mut literal, &mut parts);
                parts.push(Part::Key(Arc::clone(key)));
            }
            '}' => return Err(malformed("'}' without matching '{'")),
            '[' => {
                if in_optional {
                    return Err(malformed("nested optional blocks are not supported"));
                }
                flush_literal(&mut literal, &mut parts);
                if !parts.is_empty() {
                    blocks.push(Block {
                        optional: false,
                        parts: std::mem::take(&mut parts),
                    });
                }
                in_optional = true;
            }
            ']' => {
                if !in_optional {
                    return Err(malformed("']' without matching '['"));
                }
                flush_literal(&mut literal, &mut parts);
                let block = Block {
                    optional: true,
                    parts: std::mem::take(&mut parts),
                };
                let key_count = block
                    .parts
                    .iter()
                    .filter(|p| matches!(p, Part::Key(_)))
                    .count();
                if key_count != 1 {
                    return Err(malformed("an optional block must contain exactly one key"));
                }
                blocks.push(block);
                in_optional = false;
            }
            other => literal.push(other),
        }
    }

    if in_optional {
        return Err(malformed("'[' without matching ']'"));
    }
    flush_literal(&mut literal, &mut parts);
    if !parts.is_empty() {
        blocks.push(Block {
            optional: false,
            parts,
        });
    }
    if blocks.is_empty() {
        return Err(malformed("empty definition"));
    }
    Ok(blocks)
}

/// Expand blocks into every optional-subset variation, most keys first,
/// then by declaration order of the included blocks.
fn expand_variations(
    template: &str,
    blocks: &[Block],
) -> Result<Vec<Variation>, ConfigurationError> {
    let optional_indices: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.optional.then_some(i))
        .collect();

    let mut subsets: Vec<Vec<usize>> = (0u32..(1 << optional_indices.len()))
        .map(|mask| {
            optional_indices
                .iter()
                .enumerate()
                .filter_map(|(bit, &idx)| (mask & (1 << bit) != 0).then_some(idx))
                .collect()
        })
        .collect();
    subsets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut variations = Vec::with_capacity(subsets.len());
    for subset in subsets {
        let mut parts: Vec<Part> = Vec::new();
        for (i, block) in blocks.iter().enumerate() {
            if block.optional && !subset.contains(&i) {
                continue;
            }
            for part in &block.parts {
                // Merge adjacent literals across block boundaries so the
                // matcher only ever sees alternating literal/key runs.
                if let (Part::Literal(lit), Some(Part::Literal(prev))) =
                    (part, parts.last_mut())
                {
                    prev.push_str(lit);
                } else {
                    parts.push(part.clone());
                }
            }
        }

        validate_adjacency(template, &parts)?;
        let keys = parts
            .iter()
            .filter_map(|p| match p {
                Part::Key(k) => Some(k.name().to_string()),
                Part::Literal(_) => None,
            })
            .collect();
        variations.push(Variation { parts, keys });
    }
    Ok(variations)
}

/// Two adjacent keys are only parseable when the first consumes a fixed
/// number of characters; anything else would be ambiguous.
fn validate_adjacency(template: &str, parts: &[Part]) -> Result<(), ConfigurationError> {
    for pair in parts.windows(2) {
        if let [Part::Key(first), Part::Key(_)] = pair
            && first.fixed_width().is_none()
        {
            return Err(ConfigurationError::AmbiguousTemplate {
                template: template.to_string(),
                reason: format!(
                    "key '{}' is directly followed by another key but has no fixed width",
                    first.name()
                ),
            });
        }
    }
    Ok(())
}
