//! Runtime schema tree and its resolution walk.
//!
//! The tree owns its children; traversal carries an explicit stack of
//! resolved ancestor entities instead of parent back-pointers.

use crate::config::ConfigurationError;
use crate::domain::{Entity, EntityRef, Filter, FilterValue};
use crate::ports::data_source::DataSource;
use crate::roots::StorageRoots;

use super::SchemaError;
use super::definition::{FilterDefinition, SchemaDefinition, SchemaNodeDefinition};
use super::plan::{PlannedOp, PlannedPath};

/// Fields requested for every fan-out query; enough to name folders.
const FANOUT_FIELDS: &[&str] = &["code", "name"];

#[derive(Debug, Clone)]
enum NodeKind {
    Static,
    Entity {
        entity_type: String,
        filters: Vec<FilterDefinition>,
        create_with_parent: bool,
    },
    Workspace,
    Symlink { target: String },
    File { source: std::path::PathBuf },
}

#[derive(Debug, Clone)]
struct SchemaNode {
    name: String,
    kind: NodeKind,
    children: Vec<SchemaNode>,
}

/// What to resolve the schema against: the target entity's ancestor chain
/// (project first, target last) and optionally a user for workspace nodes.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest {
    pub chain: Vec<Entity>,
    pub user: Option<Entity>,
}

/// Immutable, validated folder schema for one pipeline configuration.
#[derive(Debug, Clone)]
pub struct Schema {
    root_name: String,
    top: SchemaNode,
}

impl Schema {
    /// Build and validate the runtime tree from its definition.
    pub fn from_definition(
        def: &SchemaDefinition,
        roots: &StorageRoots,
    ) -> Result<Self, ConfigurationError> {
        let root_name = def
            .root
            .clone()
            .unwrap_or_else(|| roots.primary().to_string());
        if !roots.contains(&root_name) {
            return Err(ConfigurationError::UnknownRootInSchema { root: root_name });
        }
        let top = build_node(&def.top, false)?;
        Ok(Self { root_name, top })
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Walk the tree against a resolved chain and emit the ordered plan.
    ///
    /// Purely a planning step: no filesystem access. Every path appears
    /// strictly after its parent. Entity folders whose type is on the
    /// chain resolve to exactly that entity; otherwise they fan out via
    /// the data source (or contribute nothing when `create_with_parent`
    /// is off or the query matches no entities).
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
        data_source: &dyn DataSource,
    ) -> Result<Vec<PlannedPath>, SchemaError> {
        struct Frame<'a> {
            node: &'a SchemaNode,
            parent_rel: String,
            branch: Vec<Entity>,
            bound: Option<Entity>,
        }

        let mut plan = Vec::new();
        let mut stack = vec![Frame {
            node: &self.top,
            parent_rel: String::new(),
            branch: Vec::new(),
            bound: None,
        }];

        while let Some(frame) = stack.pop() {
            let node = frame.node;
            match &node.kind {
                NodeKind::Entity {
                    entity_type,
                    filters,
                    create_with_parent,
                } => {
                    let Some(entity) = frame.bound else {
                        // First visit: decide which entities this node
                        // stands for, then revisit once per entity.
                        let entities = if let Some(on_chain) = request
                            .chain
                            .iter()
                            .find(|e| &e.entity_type == entity_type)
                        {
                            // The chain pins the entity, but it must still
                            // satisfy the node's filters - a shot is only
                            // planned under its own sequence.
                            match substitute_filters(filters, frame.branch.last()) {
                                Some(bound) if on_chain.matches_filters(&bound) => {
                                    vec![on_chain.clone()]
                                }
                                _ => continue,
                            }
                        } else if *create_with_parent {
                            let Some(filters) =
                                substitute_filters(filters, frame.branch.last())
                            else {
                                continue;
                            };
                            data_source
                                .find(entity_type, &filters, FANOUT_FIELDS)
                                .await?
                        } else {
                            continue;
                        };
                        for entity in entities.into_iter().rev() {
                            stack.push(Frame {
                                node,
                                parent_rel: frame.parent_rel.clone(),
                                branch: frame.branch.clone(),
                                bound: Some(entity),
                            });
                        }
                        continue;
                    };

                    let name = resolve_pattern(&node.name, Some(&entity))?;
                    let rel = join_rel(&frame.parent_rel, &name);
                    plan.push(
                        PlannedPath::folder(&self.root_name, rel.clone())
                            .for_entity(entity.to_ref()),
                    );
                    let mut branch = frame.branch;
                    branch.push(entity);
                    for child in node.children.iter().rev() {
                        stack.push(Frame {
                            node: child,
                            parent_rel: rel.clone(),
                            branch: branch.clone(),
                            bound: None,
                        });
                    }
                }
                NodeKind::Static => {
                    let rel = join_rel(&frame.parent_rel, &node.name);
                    plan.push(PlannedPath::folder(&self.root_name, rel.clone()));
                    for child in node.children.iter().rev() {
                        stack.push(Frame {
                            node: child,
                            parent_rel: rel.clone(),
                            branch: frame.branch.clone(),
                            bound: None,
                        });
                    }
                }
                NodeKind::Workspace => {
                    let Some(user) = &request.user else {
                        continue;
                    };
                    let name = resolve_pattern(&node.name, Some(user))?;
                    let rel = join_rel(&frame.parent_rel, &name);
                    plan.push(PlannedPath::folder(&self.root_name, rel.clone()));
                    for child in node.children.iter().rev() {
                        stack.push(Frame {
                            node: child,
                            parent_rel: rel.clone(),
                            branch: frame.branch.clone(),
                            bound: None,
                        });
                    }
                }
                NodeKind::Symlink { target } => {
                    let nearest = frame.branch.last();
                    let name = resolve_pattern(&node.name, nearest)?;
                    let target = resolve_pattern(target, nearest)?;
                    plan.push(PlannedPath {
                        root_name: self.root_name.clone(),
                        relative: join_rel(&frame.parent_rel, &name),
                        op: PlannedOp::Symlink { target },
                        entity: None,
                        is_primary: false,
                    });
                }
                NodeKind::File { source } => {
                    plan.push(PlannedPath {
                        root_name: self.root_name.clone(),
                        relative: join_rel(&frame.parent_rel, &node.name),
                        op: PlannedOp::File {
                            source: source.clone(),
                        },
                        entity: None,
                        is_primary: false,
                    });
                }
            }
        }

        Ok(plan)
    }
}

fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

/// Build one runtime node, validating names and structure.
fn build_node(
    def: &SchemaNodeDefinition,
    has_entity_ancestor: bool,
) -> Result<SchemaNode, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidSchema { reason };

    let (name, kind, children, child_has_entity) = match def {
        SchemaNodeDefinition::Static { name, children } => {
            if name.contains('{') {
                return Err(invalid(format!(
                    "static folder '{name}' cannot use field placeholders"
                )));
            }
            (name, NodeKind::Static, children.as_slice(), has_entity_ancestor)
        }
        SchemaNodeDefinition::Entity {
            entity_type,
            name,
            filters,
            create_with_parent,
            children,
        } => {
            for filter in filters {
                if !(filter.value.is_string() || filter.value.is_number()) {
                    return Err(invalid(format!(
                        "filter on '{}' must be a string or number",
                        filter.field
                    )));
                }
            }
            (
                name,
                NodeKind::Entity {
                    entity_type: entity_type.clone(),
                    filters: filters.clone(),
                    create_with_parent: *create_with_parent,
                },
                children.as_slice(),
                true,
            )
        }
        SchemaNodeDefinition::Workspace { name, children } => (
            name,
            NodeKind::Workspace,
            children.as_slice(),
            has_entity_ancestor,
        ),
        SchemaNodeDefinition::Symlink { name, target } => {
            if (name.contains('{') || target.contains('{')) && !has_entity_ancestor {
                return Err(invalid(format!(
                    "symlink '{name}' uses field placeholders outside any entity folder"
                )));
            }
            (
                name,
                NodeKind::Symlink {
                    target: target.clone(),
                },
                &[] as &[SchemaNodeDefinition],
                has_entity_ancestor,
            )
        }
        SchemaNodeDefinition::File { name, source } => (
            name,
            NodeKind::File {
                source: source.clone(),
            },
            [].as_slice(),
            has_entity_ancestor,
        ),
    };

    if name.is_empty() {
        return Err(invalid("folder name cannot be empty".to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid(format!(
            "folder name '{name}' cannot contain path separators"
        )));
    }

    let children = children
        .iter()
        .map(|c| build_node(c, child_has_entity))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SchemaNode {
        name: name.clone(),
        kind,
        children,
    })
}

/// Substitute `{field}` placeholders in a name pattern with entity fields.
/// Values are sanitized so a field can never smuggle a separator into the
/// tree.
fn resolve_pattern(pattern: &str, entity: Option<&Entity>) -> Result<String, SchemaError> {
    if !pattern.contains('{') {
        return Ok(pattern.to_string());
    }

    let entity_ref = entity.map_or_else(|| EntityRef::new("unknown", 0), Entity::to_ref);
    let mut out = String::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        let mut field = String::new();
        for inner in chars.by_ref() {
            if inner == '}' {
                break;
            }
            field.push(inner);
        }
        let value = entity
            .and_then(|e| e.field(&field))
            .ok_or_else(|| SchemaError::NameFieldMissing {
                pattern: pattern.to_string(),
                field: field.clone(),
                entity: entity_ref.clone(),
            })?;
        out.push_str(&sanitize_token(value));
    }

    if out.is_empty() {
        return Err(SchemaError::EmptyName {
            pattern: pattern.to_string(),
            entity: entity_ref,
        });
    }
    Ok(out)
}

/// Folder names derived from entity fields keep word characters, dashes
/// and dots; everything else becomes an underscore.
fn sanitize_token(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Convert definition filters to domain filters, binding `"$parent"` to the
/// nearest resolved ancestor. Returns `None` when a parent-scoped filter
/// has no parent to bind, in which case the fan-out matches nothing.
fn substitute_filters(
    definitions: &[FilterDefinition],
    parent: Option<&Entity>,
) -> Option<Vec<Filter>> {
    let mut filters = Vec::with_capacity(definitions.len());
    for def in definitions {
        let value = match &def.value {
            serde_json::Value::String(s) if s == "$parent" => {
                FilterValue::Entity(parent?.to_ref())
            }
            serde_json::Value::String(s) => FilterValue::Str(s.clone()),
            serde_json::Value::Number(n) => FilterValue::Int(n.as_i64()?),
            // Rejected at load time.
            _ => return None,
        };
        filters.push(Filter::is(def.field.clone(), value));
    }
    Some(filters)
}
