//! The resolved production context.
//!
//! A context is derived on demand - from a path via the path cache, or from
//! an entity via hierarchy traversal - and is the unit of information the
//! template engine consumes to produce field values. It is never stored
//! long-term.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityRef;
use super::fields::{FieldMap, FieldValue};

/// Project/entity/step/user tuple associated with a path or a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// The owning project, when known.
    pub project: Option<EntityRef>,
    /// The primary entity (Shot, Asset, Sequence, ...).
    pub entity: Option<EntityRef>,
    /// Pipeline step, when the context was derived from a task.
    pub step: Option<EntityRef>,
    /// The task itself, when applicable.
    pub task: Option<EntityRef>,
    /// Current user, for user-workspace resolution.
    pub user: Option<EntityRef>,
    /// Any further entities associated with the location.
    #[serde(default)]
    pub additional_entities: Vec<EntityRef>,
}

impl Context {
    pub fn for_project(project: EntityRef) -> Self {
        Self {
            project: Some(project),
            ..Self::default()
        }
    }

    pub fn for_entity(project: EntityRef, entity: EntityRef) -> Self {
        Self {
            project: Some(project),
            entity: Some(entity),
            ..Self::default()
        }
    }

    /// Candidate template fields derived from this context.
    ///
    /// Each known entity contributes its display name under a key named
    /// after its entity type (`Project`, `Sequence`, `Shot`, `Step`), and
    /// the user under `user`. Templates pick the subset of keys they
    /// declare; unknown candidates are ignored by `apply_fields`.
    pub fn template_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        let mut add = |entity: &Option<EntityRef>| {
            if let Some(e) = entity
                && let Some(name) = &e.name
            {
                fields.insert(e.entity_type.clone(), FieldValue::Str(name.clone()));
            }
        };
        add(&self.project);
        add(&self.entity);
        add(&self.step);
        for extra in &self.additional_entities {
            if let Some(name) = &extra.name {
                fields
                    .entry(extra.entity_type.clone())
                    .or_insert_with(|| FieldValue::Str(name.clone()));
            }
        }
        if let Some(user) = &self.user
            && let Some(login) = &user.name
        {
            fields.insert("user".to_string(), FieldValue::Str(login.clone()));
        }
        fields
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_ref = |r: &Option<EntityRef>| {
            r.as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string)
        };
        write!(
            f,
            "project: {}, entity: {}, step: {}",
            fmt_ref(&self.project),
            fmt_ref(&self.entity),
            fmt_ref(&self.step)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fields_use_entity_type_as_key() {
        let ctx = Context {
            project: Some(EntityRef::named("Project", 1, "demo")),
            entity: Some(EntityRef::named("Shot", 2, "shot_020")),
            step: Some(EntityRef::named("Step", 4, "comp")),
            user: Some(EntityRef::named("HumanUser", 9, "jdoe")),
            ..Context::default()
        };

        let fields = ctx.template_fields();
        assert_eq!(fields.get("Project"), Some(&FieldValue::Str("demo".into())));
        assert_eq!(
            fields.get("Shot"),
            Some(&FieldValue::Str("shot_020".into()))
        );
        assert_eq!(fields.get("Step"), Some(&FieldValue::Str("comp".into())));
        assert_eq!(fields.get("user"), Some(&FieldValue::Str("jdoe".into())));
    }

    #[test]
    fn unnamed_entities_contribute_nothing() {
        let ctx = Context::for_entity(EntityRef::new("Project", 1), EntityRef::new("Shot", 2));
        assert!(ctx.template_fields().is_empty());
    }
}
