//! Production entity types and the minimal query filter language.
//!
//! Entities are the records the data-source collaborator returns: a type
//! name, a numeric id, plain string fields (name, code, status) and link
//! fields pointing at other entities (project, parent sequence, assigned
//! user). The core never interprets fields beyond what schema name patterns
//! and hierarchy traversal need.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lightweight reference to an entity: enough to identify it and to label
/// folders created for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type name (e.g. "Project", "Sequence", "Shot", "Task").
    pub entity_type: String,
    /// Data-source id of the entity.
    pub id: i64,
    /// Display name, when known. Not part of entity identity.
    #[serde(default)]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            name: None,
        }
    }

    pub fn named(entity_type: impl Into<String>, id: i64, name: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            name: Some(name.into()),
        }
    }

    /// True when this reference identifies the same record as `other`.
    /// Names are ignored; identity is (type, id).
    pub fn same_record(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type && self.id == other.id
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {} ({})", self.entity_type, self.id, name),
            None => write!(f, "{} {}", self.entity_type, self.id),
        }
    }
}

/// A full entity record as returned by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub id: i64,
    /// Plain string fields (name, code, status, login, ...).
    #[serde(default)]
    pub fields: HashMap<String, String>,
    /// Link fields pointing at other entities (project, sg_sequence, step).
    #[serde(default)]
    pub links: HashMap<String, EntityRef>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            fields: HashMap::new(),
            links: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_link(mut self, name: impl Into<String>, target: EntityRef) -> Self {
        self.links.insert(name.into(), target);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Display name: the `name` field, falling back to `code`.
    pub fn name(&self) -> Option<&str> {
        self.field("name").or_else(|| self.field("code"))
    }

    /// First link whose target has the given entity type.
    pub fn link_of_type(&self, entity_type: &str) -> Option<&EntityRef> {
        self.links
            .values()
            .find(|r| r.entity_type == entity_type)
    }

    pub fn to_ref(&self) -> EntityRef {
        EntityRef {
            entity_type: self.entity_type.clone(),
            id: self.id,
            name: self.name().map(str::to_string),
        }
    }

    /// Evaluate one filter against this record. `id` compares the entity
    /// id, entity values compare against link fields, scalars against
    /// plain fields.
    pub fn matches_filter(&self, filter: &Filter) -> bool {
        let hit = match (&filter.value, filter.field.as_str()) {
            (FilterValue::Int(id), "id") => self.id == *id,
            (FilterValue::Int(i), field) => {
                self.field(field).and_then(|v| v.parse::<i64>().ok()) == Some(*i)
            }
            (FilterValue::Str(s), field) => self.field(field) == Some(s.as_str()),
            (FilterValue::Entity(target), field) => self
                .links
                .get(field)
                .is_some_and(|link| link.same_record(target)),
        };
        match filter.op {
            FilterOp::Is => hit,
            FilterOp::IsNot => !hit,
        }
    }

    pub fn matches_filters(&self, filters: &[Filter]) -> bool {
        filters.iter().all(|f| self.matches_filter(f))
    }
}

/// Value side of a query filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Str(String),
    Int(i64),
    Entity(EntityRef),
}

/// Comparison operator for query filters. Deliberately minimal: the core
/// only ever needs equality against a scalar or an entity link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Is,
    IsNot,
}

/// A single query condition consumed by the data-source port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn is(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Is,
            value: value.into(),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<EntityRef> for FilterValue {
    fn from(value: EntityRef) -> Self {
        Self::Entity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_falls_back_to_code() {
        let entity = Entity::new("Shot", 2).with_field("code", "shot_020");
        assert_eq!(entity.name(), Some("shot_020"));

        let named = Entity::new("Shot", 2)
            .with_field("code", "shot_020")
            .with_field("name", "Shot Twenty");
        assert_eq!(named.name(), Some("Shot Twenty"));
    }

    #[test]
    fn link_lookup_by_type() {
        let entity = Entity::new("Shot", 2)
            .with_link("project", EntityRef::named("Project", 1, "demo"))
            .with_link("sg_sequence", EntityRef::named("Sequence", 3, "seq_010"));

        let seq = entity.link_of_type("Sequence").unwrap();
        assert_eq!(seq.id, 3);
        assert!(entity.link_of_type("Asset").is_none());
    }

    #[test]
    fn filters_match_ids_fields_and_links() {
        let seq = EntityRef::named("Sequence", 3, "seq_010");
        let shot = Entity::new("Shot", 2)
            .with_field("code", "shot_020")
            .with_link("sg_sequence", seq.clone());

        assert!(shot.matches_filter(&Filter::is("id", 2)));
        assert!(!shot.matches_filter(&Filter::is("id", 3)));
        assert!(shot.matches_filter(&Filter::is("code", "shot_020")));
        assert!(shot.matches_filter(&Filter::is("sg_sequence", seq)));
        assert!(!shot.matches_filter(&Filter::is(
            "sg_sequence",
            EntityRef::new("Sequence", 4)
        )));
        assert!(shot.matches_filters(&[]));
    }

    #[test]
    fn same_record_ignores_name() {
        let a = EntityRef::named("Shot", 2, "shot_020");
        let b = EntityRef::new("Shot", 2);
        assert!(a.same_record(&b));
        assert!(!a.same_record(&EntityRef::new("Shot", 3)));
    }
}
