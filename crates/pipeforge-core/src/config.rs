//! Configuration loading and eager validation.
//!
//! A pipeline configuration bundles the storage roots, the template keys
//! and templates, and the folder schema. Everything is validated here, at
//! load time, and is immutable afterwards; the engines never re-check
//! structural invariants at use.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::roots::{StorageRootDefinition, StorageRoots};
use crate::schema::{Schema, SchemaDefinition};
use crate::templates::{KeyDefinition, TemplateDefinition, TemplateKey, TemplateSet};

/// Errors detected while loading a pipeline configuration.
///
/// Always fatal and never retried; each variant identifies the offending
/// definition.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration defines no storage roots")]
    NoStorageRoots,

    #[error("Storage root '{0}' is defined more than once")]
    DuplicateRoot(String),

    #[error("No storage root is flagged as the default")]
    NoPrimaryRoot,

    #[error("Both '{first}' and '{second}' are flagged as the default storage root")]
    MultiplePrimaryRoots { first: String, second: String },

    #[error("Template key '{0}' is defined more than once")]
    DuplicateKey(String),

    #[error("Template key '{key}' is invalid: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Template '{template}' references unknown key '{key}'")]
    UnknownTemplateKey { template: String, key: String },

    #[error("Template '{template}' is malformed: {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("Template '{template}' is ambiguous: {reason}")]
    AmbiguousTemplate { template: String, reason: String },

    #[error("Template '{template}' references unknown storage root '{root}'")]
    UnknownRootInTemplate { template: String, root: String },

    #[error("Template '{0}' is defined more than once")]
    DuplicateTemplate(String),

    #[error("Schema references unknown storage root '{root}'")]
    UnknownRootInSchema { root: String },

    #[error("Schema is invalid: {reason}")]
    InvalidSchema { reason: String },

    #[error("Cannot parse configuration: {0}")]
    Parse(String),
}

/// The whole declarative configuration as supplied by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationDefinition {
    pub roots: Vec<StorageRootDefinition>,
    #[serde(default)]
    pub keys: Vec<KeyDefinition>,
    #[serde(default)]
    pub templates: Vec<TemplateDefinition>,
    pub schema: SchemaDefinition,
}

/// Validated, immutable in-memory configuration.
///
/// Cheap to clone and safe to share across threads: every component is
/// read-only after load.
#[derive(Debug, Clone)]
pub struct PipelineConfiguration {
    roots: Arc<StorageRoots>,
    keys: HashMap<String, Arc<TemplateKey>>,
    templates: TemplateSet,
    schema: Arc<Schema>,
}

impl PipelineConfiguration {
    /// Validate a parsed definition and build the runtime structures.
    pub fn from_definition(
        definition: &ConfigurationDefinition,
    ) -> Result<Self, ConfigurationError> {
        let roots = StorageRoots::from_definitions(definition.roots.clone())?;

        let mut keys = HashMap::with_capacity(definition.keys.len());
        for key_def in &definition.keys {
            let key = key_def.build()?;
            if keys
                .insert(key.name().to_string(), Arc::new(key))
                .is_some()
            {
                return Err(ConfigurationError::DuplicateKey(key_def.name.clone()));
            }
        }

        let templates = TemplateSet::from_definitions(&definition.templates, &keys, &roots)?;
        let schema = Schema::from_definition(&definition.schema, &roots)?;

        debug!(
            roots = definition.roots.len(),
            keys = keys.len(),
            templates = templates.len(),
            "pipeline configuration loaded"
        );

        Ok(Self {
            roots: Arc::new(roots),
            keys,
            templates,
            schema: Arc::new(schema),
        })
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let definition: ConfigurationDefinition =
            serde_json::from_str(json).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        Self::from_definition(&definition)
    }

    pub fn roots(&self) -> &Arc<StorageRoots> {
        &self.roots
    }

    pub fn key(&self, name: &str) -> Option<&Arc<TemplateKey>> {
        self.keys.get(name)
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "roots": [
            {"name": "primary", "linux_path": "/mnt/projects",
             "mac_path": "/mnt/projects", "windows_path": "P:\\projects",
             "default": true}
        ],
        "keys": [
            {"name": "Sequence", "type": "string"},
            {"name": "Shot", "type": "string"},
            {"name": "version", "type": "integer", "width": 3}
        ],
        "templates": [
            {"name": "shot_root", "definition": "shots/{Sequence}/{Shot}"},
            {"name": "shot_version", "definition": "shots/{Sequence}/{Shot}[/v{version}]"}
        ],
        "schema": {
            "top": {
                "kind": "entity", "entity_type": "Project", "name": "{name}",
                "children": [
                    {"kind": "static", "name": "shots"}
                ]
            }
        }
    }"#;

    #[test]
    fn sample_configuration_loads() {
        let config = PipelineConfiguration::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.templates().len(), 2);
        assert!(config.key("Shot").is_some());
        assert_eq!(config.schema().root_name(), "primary");
    }

    #[test]
    fn unknown_key_reference_fails_at_load() {
        let broken = SAMPLE.replace("{Sequence}/{Shot}\"", "{Sequence}/{Missing}\"");
        let err = PipelineConfiguration::from_json_str(&broken).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownTemplateKey { .. }));
    }

    #[test]
    fn garbage_json_is_a_parse_error() {
        let err = PipelineConfiguration::from_json_str("{nope").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }
}
