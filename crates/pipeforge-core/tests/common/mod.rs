//! Shared fixtures for integration tests: an in-memory data source, an
//! observer spy, and a small but realistic pipeline configuration.

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use pipeforge_core::config::PipelineConfiguration;
use pipeforge_core::domain::{Entity, EntityRef, Filter};
use pipeforge_core::ports::data_source::{DataSource, DataSourceError};
use pipeforge_core::ports::observer::CreationObserver;
use pipeforge_core::services::folder_creator::CreationReport;

/// Install the test log subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory data source serving a fixed entity set.
pub struct StaticDataSource {
    entities: Vec<Entity>,
    unreachable: AtomicBool,
}

impl StaticDataSource {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent query fail with a connection error.
    pub fn go_offline(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn find(
        &self,
        entity_type: &str,
        filters: &[Filter],
        _fields: &[&str],
    ) -> Result<Vec<Entity>, DataSourceError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DataSourceError::Connection(
                "backend is offline".to_string(),
            ));
        }
        Ok(self
            .entities
            .iter()
            .filter(|e| e.entity_type == entity_type && e.matches_filters(filters))
            .cloned()
            .collect())
    }
}

/// Observer that records every committed report.
#[derive(Default)]
pub struct ObserverSpy {
    reports: Mutex<Vec<CreationReport>>,
}

impl ObserverSpy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<CreationReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl CreationObserver for ObserverSpy {
    async fn folders_created(&self, report: &CreationReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// The demo production: one project, two sequences, two shots in the first
/// sequence, one task and one user.
pub fn demo_entities() -> Vec<Entity> {
    let project = EntityRef::named("Project", 1, "demo");
    let seq_010 = EntityRef::named("Sequence", 3, "seq_010");

    vec![
        Entity::new("Project", 1).with_field("name", "demo"),
        Entity::new("Sequence", 3)
            .with_field("code", "seq_010")
            .with_link("project", project.clone()),
        Entity::new("Sequence", 4)
            .with_field("code", "seq_020")
            .with_link("project", project.clone()),
        Entity::new("Shot", 2)
            .with_field("code", "shot_020")
            .with_link("project", project.clone())
            .with_link("sg_sequence", seq_010.clone()),
        Entity::new("Shot", 5)
            .with_field("code", "shot_030")
            .with_link("project", project.clone())
            .with_link("sg_sequence", seq_010),
        Entity::new("Task", 7)
            .with_field("name", "comp shot_020")
            .with_link("project", project.clone())
            .with_link("entity", EntityRef::named("Shot", 2, "shot_020"))
            .with_link("step", EntityRef::named("Step", 8, "comp")),
        Entity::new("Step", 8).with_field("code", "comp"),
        Entity::new("HumanUser", 9)
            .with_field("login", "jdoe")
            .with_field("name", "jdoe"),
    ]
}

/// Build the test configuration against a real directory as the only root.
pub fn demo_configuration(root: &Path) -> PipelineConfiguration {
    let root = root.to_string_lossy();
    let json = format!(
        r#"{{
        "roots": [
            {{"name": "primary",
              "linux_path": {root:?}, "mac_path": {root:?}, "windows_path": {root:?},
              "default": true}}
        ],
        "keys": [
            {{"name": "Project", "type": "string"}},
            {{"name": "Sequence", "type": "string"}},
            {{"name": "Shot", "type": "string"}},
            {{"name": "Step", "type": "string"}},
            {{"name": "version", "type": "integer", "width": 3}}
        ],
        "templates": [
            {{"name": "shot_root",
              "definition": "{{Project}}/sequences/{{Sequence}}/{{Shot}}"}},
            {{"name": "shot_work",
              "definition": "{{Project}}/sequences/{{Sequence}}/{{Shot}}/work[/v{{version}}]"}}
        ],
        "schema": {{
            "top": {{
                "kind": "entity", "entity_type": "Project", "name": "{{name}}",
                "children": [
                    {{"kind": "static", "name": "editorial"}},
                    {{"kind": "static", "name": "sequences", "children": [
                        {{"kind": "entity", "entity_type": "Sequence", "name": "{{code}}",
                          "filters": [{{"field": "project", "value": "$parent"}}],
                          "children": [
                            {{"kind": "entity", "entity_type": "Shot", "name": "{{code}}",
                              "filters": [{{"field": "sg_sequence", "value": "$parent"}}],
                              "children": [
                                {{"kind": "static", "name": "work", "children": [
                                    {{"kind": "workspace", "name": "{{login}}"}}
                                ]}},
                                {{"kind": "symlink", "name": "latest", "target": "work"}}
                              ]}}
                          ]}}
                    ]}}
                ]
            }}
        }}
    }}"#
    );
    PipelineConfiguration::from_json_str(&json).expect("demo configuration must load")
}

