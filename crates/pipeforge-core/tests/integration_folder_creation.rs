//! End-to-end folder creation: real temp directories, real `SQLite` path
//! cache, in-memory data source.

mod common;

use std::sync::Arc;

use tempfile::TempDir;

use common::{ObserverSpy, StaticDataSource, demo_configuration, demo_entities};
use pipeforge_core::domain::EntityRef;
use pipeforge_core::ports::{
    Collaborators, CoreError, DataSourceError, DiskFilesystem, PathCacheError, PathMapping,
    RecordingFilesystem,
};
use pipeforge_core::services::{CreationPhase, FolderCreationRequest, FolderCreator};
use pipeforge_db::TestDb;

struct Harness {
    _tmp: TempDir,
    root: std::path::PathBuf,
    creator: FolderCreator,
    data_source: Arc<StaticDataSource>,
    observer: Arc<ObserverSpy>,
    cache: Arc<dyn pipeforge_core::PathCacheRepository>,
}

async fn harness() -> Harness {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let config = demo_configuration(&root);

    let data_source = Arc::new(StaticDataSource::new(demo_entities()));
    let observer = Arc::new(ObserverSpy::new());
    let cache = TestDb::new().await.unwrap().path_cache();

    let collaborators = Collaborators::new(
        data_source.clone(),
        Arc::new(DiskFilesystem),
        cache.clone(),
        observer.clone(),
    );
    let creator = FolderCreator::new(
        config.schema().clone(),
        config.roots().clone(),
        collaborators,
    );

    Harness {
        _tmp: tmp,
        root,
        creator,
        data_source,
        observer,
        cache,
    }
}

fn shot_request() -> FolderCreationRequest {
    FolderCreationRequest::for_entity(EntityRef::new("Shot", 2))
}

#[tokio::test]
async fn shot_creation_builds_the_full_branch() {
    let h = harness().await;
    let report = h.creator.create(&shot_request()).await.unwrap();

    for rel in [
        "demo",
        "demo/editorial",
        "demo/sequences/seq_010",
        "demo/sequences/seq_010/shot_020",
        "demo/sequences/seq_010/shot_020/work",
    ] {
        assert!(h.root.join(rel).is_dir(), "{rel} should exist");
    }

    // chain-restricted: the sibling shot and sequence are not touched
    assert!(!h.root.join("demo/sequences/seq_010/shot_030").exists());
    assert!(!h.root.join("demo/sequences/seq_020").exists());

    // no user on the request, no workspace folder
    assert!(!h.root.join("demo/sequences/seq_010/shot_020/work/jdoe").exists());

    #[cfg(unix)]
    assert!(
        h.root
            .join("demo/sequences/seq_010/shot_020/latest")
            .is_symlink()
    );

    // one cache entry per entity folder on the branch
    assert_eq!(report.cache_entries, 3);
    for (entity_type, id, rel) in [
        ("Project", 1, "demo"),
        ("Sequence", 3, "demo/sequences/seq_010"),
        ("Shot", 2, "demo/sequences/seq_010/shot_020"),
    ] {
        let paths = h.cache.get_paths(entity_type, id).await.unwrap();
        assert_eq!(paths.len(), 1, "{entity_type} should have one mapping");
        assert_eq!(paths[0].relative_path, rel);
    }

    // reverse lookup round-trips
    let owner = h
        .cache
        .get_entity("primary", "demo/sequences/seq_010/shot_020")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner, EntityRef::named("Shot", 2, "shot_020"));

    // committed runs notify the observer exactly once
    assert_eq!(h.observer.reports().len(), 1);
}

#[tokio::test]
async fn plan_orders_parents_strictly_before_children() {
    let h = harness().await;
    let plan = h.creator.preview(&shot_request()).await.unwrap();
    assert!(!plan.is_empty());

    let seen: Vec<&str> = plan.iter().map(|p| p.relative.as_str()).collect();
    for (idx, planned) in plan.iter().enumerate() {
        if let Some(pos) = planned.relative.rfind('/') {
            let parent = &planned.relative[..pos];
            let parent_idx = seen
                .iter()
                .position(|rel| *rel == parent)
                .unwrap_or_else(|| panic!("parent of {} missing from plan", planned.relative));
            assert!(parent_idx < idx, "{parent} must precede {}", planned.relative);
        }
    }
}

#[tokio::test]
async fn rerunning_is_idempotent() {
    let h = harness().await;
    let first = h.creator.create(&shot_request()).await.unwrap();
    assert!(!first.created.is_empty());

    let second = h.creator.create(&shot_request()).await.unwrap();
    assert!(second.created.is_empty(), "second run must create nothing");
    assert_eq!(second.skipped.len(), first.created.len());

    // cache entries unchanged
    assert_eq!(h.cache.get_paths("Shot", 2).await.unwrap().len(), 1);
    assert_eq!(h.cache.get_paths("Project", 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleted_leaf_is_recreated_without_touching_parents() {
    let h = harness().await;
    h.creator.create(&shot_request()).await.unwrap();

    let work = h.root.join("demo/sequences/seq_010/shot_020/work");
    std::fs::remove_dir(&work).unwrap();

    // drop a marker in the parent to prove it is left alone
    let marker = h.root.join("demo/sequences/seq_010/shot_020/.marker");
    std::fs::write(&marker, b"untouched").unwrap();

    let report = h.creator.create(&shot_request()).await.unwrap();
    assert_eq!(report.created, vec![work.clone()]);
    assert!(work.is_dir());
    assert!(marker.exists());

    // the parent's cache entry is not duplicated
    assert_eq!(h.cache.get_paths("Shot", 2).await.unwrap().len(), 1);
}

#[tokio::test]
async fn project_creation_fans_out_to_all_children() {
    let h = harness().await;
    let request = FolderCreationRequest::for_entity(EntityRef::new("Project", 1));
    h.creator.create(&request).await.unwrap();

    for rel in [
        "demo/sequences/seq_010/shot_020",
        "demo/sequences/seq_010/shot_030",
        "demo/sequences/seq_020",
    ] {
        assert!(h.root.join(rel).is_dir(), "{rel} should exist");
    }

    // 1 project + 2 sequences + 2 shots
    assert_eq!(h.cache.get_paths("Sequence", 4).await.unwrap().len(), 1);
    assert_eq!(h.cache.get_paths("Shot", 5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn workspace_resolves_when_user_is_supplied() {
    let h = harness().await;
    let user = demo_entities()
        .into_iter()
        .find(|e| e.entity_type == "HumanUser")
        .unwrap();
    let request = FolderCreationRequest {
        entity: EntityRef::new("Shot", 2),
        user: Some(user),
    };
    h.creator.create(&request).await.unwrap();
    assert!(
        h.root
            .join("demo/sequences/seq_010/shot_020/work/jdoe")
            .is_dir()
    );
}

#[tokio::test]
async fn preview_never_mutates_anything() {
    let tmp = TempDir::new().unwrap();
    let config = demo_configuration(tmp.path());
    let data_source = Arc::new(StaticDataSource::new(demo_entities()));
    let filesystem = Arc::new(RecordingFilesystem::new());
    let cache = TestDb::new().await.unwrap().path_cache();

    let creator = FolderCreator::new(
        config.schema().clone(),
        config.roots().clone(),
        Collaborators::new(
            data_source,
            filesystem.clone(),
            cache.clone(),
            Arc::new(pipeforge_core::NoopObserver),
        ),
    );

    let plan = creator.preview(&shot_request()).await.unwrap();
    assert!(plan.iter().any(|p| p.relative.ends_with("shot_020")));

    assert!(filesystem.ops().is_empty());
    assert!(cache.get_paths("Shot", 2).await.unwrap().is_empty());
    assert!(std::fs::read_dir(tmp.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn offline_backend_fails_the_chain_phase() {
    let h = harness().await;
    h.data_source.go_offline();

    let err = h.creator.create(&shot_request()).await.unwrap_err();
    assert_eq!(err.phase, CreationPhase::ResolvingChain);
    assert!(matches!(
        err.source,
        CoreError::DataSource(DataSourceError::Connection(_))
    ));
    assert!(std::fs::read_dir(&h.root).unwrap().next().is_none());
}

#[tokio::test]
async fn unknown_entity_fails_the_chain_phase() {
    let h = harness().await;
    let request = FolderCreationRequest::for_entity(EntityRef::new("Shot", 999));

    let err = h.creator.create(&request).await.unwrap_err();
    assert_eq!(err.phase, CreationPhase::ResolvingChain);
    assert!(matches!(
        err.source,
        CoreError::DataSource(DataSourceError::NotFound { id: 999, .. })
    ));
}

#[tokio::test]
async fn conflicting_cache_claim_is_fatal_but_keeps_prefix() {
    let h = harness().await;

    // someone else already owns the shot's canonical location
    h.cache
        .add_mapping(&PathMapping::primary(
            EntityRef::named("Shot", 99, "impostor"),
            "primary",
            "demo/sequences/seq_010/shot_020",
        ))
        .await
        .unwrap();

    let err = h.creator.create(&shot_request()).await.unwrap_err();
    assert_eq!(err.phase, CreationPhase::Creating);
    assert!(matches!(
        err.source,
        CoreError::PathCache(PathCacheError::Conflict { .. })
    ));

    // completed prefix work is durable: the parents were created and stay
    assert!(h.root.join("demo/sequences/seq_010").is_dir());
    assert_eq!(h.cache.get_paths("Sequence", 3).await.unwrap().len(), 1);

    // nothing was committed, so the observer was never notified
    assert!(h.observer.reports().is_empty());
}

#[tokio::test]
async fn paths_resolve_under_the_configured_root() {
    let h = harness().await;
    let plan = h.creator.preview(&shot_request()).await.unwrap();
    let config = demo_configuration(&h.root);

    for planned in &plan {
        let absolute = planned.absolute(config.roots()).unwrap();
        assert!(absolute.starts_with(&h.root));
        assert!(!absolute.to_string_lossy().contains("//"));
    }
}
