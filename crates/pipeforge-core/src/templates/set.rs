//! The project's named template collection.
//!
//! Declaration order is preserved: it is the documented tie-break when a
//! path would otherwise be ambiguous, and `find_matching` reports matches
//! in that order.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::key::TemplateKey;
use super::template::{Template, TemplateDefinition};
use super::TemplateError;
use crate::config::ConfigurationError;
use crate::roots::StorageRoots;

/// Ordered, named collection of validated templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: Vec<Arc<Template>>,
}

impl TemplateSet {
    /// Build every template from its definition, validating names are
    /// unique and every referenced key and root exists.
    pub fn from_definitions(
        definitions: &[TemplateDefinition],
        keys: &HashMap<String, Arc<TemplateKey>>,
        roots: &StorageRoots,
    ) -> Result<Self, ConfigurationError> {
        let mut templates: Vec<Arc<Template>> = Vec::with_capacity(definitions.len());
        for def in definitions {
            if templates.iter().any(|t| t.name() == def.name) {
                return Err(ConfigurationError::DuplicateTemplate(def.name.clone()));
            }
            templates.push(Arc::new(Template::from_definition(def, keys, roots)?));
        }
        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.iter()
    }

    pub fn get(&self, name: &str) -> Result<&Arc<Template>, TemplateError> {
        self.templates
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    /// All templates the path validates against, in declaration order.
    pub fn find_matching(&self, path: &Path, roots: &StorageRoots) -> Vec<&Arc<Template>> {
        self.templates
            .iter()
            .filter(|t| t.matches(path, roots))
            .collect()
    }

    /// The single template owning this path.
    ///
    /// Zero matches and multiple matches are both typed failures; a
    /// multi-match means the template set itself is inconsistent and is
    /// never resolved by guessing.
    pub fn template_from_path(
        &self,
        path: &Path,
        roots: &StorageRoots,
    ) -> Result<&Arc<Template>, TemplateError> {
        let matches = self.find_matching(path, roots);
        match matches.as_slice() {
            [] => Err(TemplateError::NoTemplateMatch {
                path: path.display().to_string(),
            }),
            [single] => Ok(single),
            many => Err(TemplateError::AmbiguousMatch {
                path: path.display().to_string(),
                templates: many.iter().map(|t| t.name().to_string()).collect(),
            }),
        }
    }
}
