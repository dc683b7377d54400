/// Record lifecycle tests
///
/// Lazy loading, dirty tracking, save/reload/delete and identity sharing.
/// Run with: cargo test --test lifecycle_tests

mod common;

use std::rc::Rc;
use std::sync::Arc;

use common::{BackendWrite, CountingBackend, props};
use memorecord::{
    BackendHandle, EntityType, IdentityMap, LifecycleState, MemoryBackend, RecordError, RecordId,
    Repository, Seed, Value,
};

fn widgets(backend: &Arc<CountingBackend>) -> Repository {
    Repository::new(
        EntityType::builder("Widget")
            .properties(["name", "price"])
            .backend(backend.clone())
            .build(),
    )
}

#[test]
fn test_widget_scenario() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.factory(Seed::Empty).unwrap();
    widget.set("name", "foo").unwrap();
    widget.save().unwrap();

    assert_eq!(backend.writes(), vec![BackendWrite::Insert(props([("name", "foo")]))]);
    assert_eq!(widget.id(), Some(RecordId(1)));
    assert!(repo.factory(1_i64).unwrap().ptr_eq(&widget));
    assert_eq!(widget.get("price").unwrap(), Value::Null);

    widget.set("name", "bar").unwrap();
    assert!(widget.is_dirty());
    widget.reload().unwrap();
    assert_eq!(widget.get("name").unwrap(), Value::from("foo"));
    assert!(!widget.is_dirty());

    widget.delete().unwrap();
    assert!(matches!(
        widget.load(),
        Err(RecordError::RecordNotFound { .. })
    ));
}

#[test]
fn test_saved_values_survive_without_load() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.create([("name", Value::from("foo")), ("price", Value::from(12))]).unwrap();
    widget.save().unwrap();

    assert_eq!(widget.state(), LifecycleState::Loaded);
    assert_eq!(widget.get("name").unwrap(), Value::from("foo"));
    assert_eq!(widget.get("price").unwrap(), Value::from(12));
    assert_eq!(backend.loads(), 0);
}

#[test]
fn test_clean_save_issues_no_write() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.create([("name", "foo")]).unwrap();
    widget.save().unwrap();
    widget.save().unwrap();
    assert_eq!(backend.writes().len(), 1);

    let id = backend.memory().insert_row("widget", props([("name", "bar")])).unwrap();
    let other = repo.get(id);
    other.load().unwrap();
    other.save().unwrap();
    assert_eq!(backend.writes().len(), 1);
}

#[test]
fn test_update_writes_only_dirty_properties() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.create([("name", Value::from("foo")), ("price", Value::from(1))]).unwrap();
    widget.save().unwrap();
    widget.set("price", 2).unwrap();
    widget.save().unwrap();

    let id = widget.id().unwrap();
    assert_eq!(
        backend.writes().last(),
        Some(&BackendWrite::Update(id, props([("price", 2)])))
    );
    assert!(!widget.is_dirty());
    assert_eq!(
        backend.memory().row("widget", id).unwrap().unwrap()["price"],
        Value::from(2)
    );
}

#[test]
fn test_identity_construction_is_lazy() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);
    let id = backend.memory().insert_row("widget", props([("name", "foo")])).unwrap();

    let widget = repo.factory(id).unwrap();
    assert_eq!(widget.state(), LifecycleState::IdentifiedUnloaded);
    assert_eq!(widget.get("id").unwrap(), Value::from(id));
    assert_eq!(backend.loads(), 0);

    assert_eq!(widget.get("name").unwrap(), Value::from("foo"));
    assert_eq!(widget.get("price").unwrap(), Value::Null);
    assert_eq!(backend.loads(), 1);
}

#[test]
fn test_missing_row_surfaces_on_access() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let ghost = repo.factory(RecordId(77)).unwrap();

    assert!(matches!(
        ghost.get("name"),
        Err(RecordError::RecordNotFound { .. })
    ));
    assert!(matches!(
        ghost.set("name", "x"),
        Err(RecordError::RecordNotFound { .. })
    ));
}

#[test]
fn test_unset_declared_property_is_assignable_after_load() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);
    let id = backend.memory().insert_row("widget", props([("name", "foo")])).unwrap();

    let widget = repo.get(id);
    widget.set("price", 5).unwrap();
    widget.save().unwrap();

    assert_eq!(
        backend.writes(),
        vec![BackendWrite::Update(id, props([("price", 5)]))]
    );
}

#[test]
fn test_shared_identity_map_across_repositories() {
    let backend = Arc::new(CountingBackend::new());
    let entity_type = EntityType::builder("Widget")
        .properties(["name"])
        .backend(backend.clone())
        .build();
    let map = Rc::new(IdentityMap::new());
    let first = Repository::with_identity_map(entity_type.clone(), map.clone());
    let second = Repository::with_identity_map(entity_type, map.clone());

    let widget = first.create([("name", "foo")]).unwrap();
    widget.save().unwrap();

    assert!(second.get(widget.id().unwrap()).ptr_eq(&widget));
    assert_eq!(map.len(), 1);
}

#[test]
fn test_instance_backend_overrides_type_default() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);
    let archive = Arc::new(MemoryBackend::named("archive"));
    let archive_handle: BackendHandle = archive.clone();

    let widget = repo.create([("name", "foo")]).unwrap();
    widget.set_backend(Some(archive_handle));
    widget.save().unwrap();

    assert_eq!(widget.backend().unwrap().name(), "archive");
    assert_eq!(archive.row_count("widget").unwrap(), 1);
    assert!(backend.writes().is_empty());

    widget.set_backend(None);
    assert_eq!(widget.backend().unwrap().name(), "counting");
}

#[test]
fn test_deleted_record_stays_registered() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.create([("name", "foo")]).unwrap();
    widget.save().unwrap();
    let id = widget.id().unwrap();
    widget.delete().unwrap();

    assert_eq!(backend.deletes(), 1);
    assert_eq!(widget.state(), LifecycleState::Deleted);
    assert_eq!(widget.id(), Some(id));
    assert!(repo.get(id).ptr_eq(&widget));
    assert!(matches!(
        widget.delete(),
        Err(RecordError::PersistenceFailure(_))
    ));
}

#[test]
fn test_to_json_includes_identity() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.create([("name", "foo")]).unwrap();
    assert_eq!(
        widget.to_json().unwrap(),
        serde_json::json!({"id": null, "name": "foo"})
    );

    widget.save().unwrap();
    assert_eq!(
        widget.to_json().unwrap(),
        serde_json::json!({"id": 1, "name": "foo", "price": null})
    );
}

#[test]
fn test_failed_reload_discards_local_changes() {
    let backend = Arc::new(CountingBackend::new());
    let repo = widgets(&backend);

    let widget = repo.create([("name", "foo")]).unwrap();
    widget.save().unwrap();
    widget.set("name", "bar").unwrap();
    backend.memory().clear().unwrap();

    assert!(matches!(
        widget.reload(),
        Err(RecordError::RecordNotFound { .. })
    ));
    assert!(!widget.is_loaded());
    assert!(!widget.is_dirty());
    assert!(matches!(
        widget.get("name"),
        Err(RecordError::RecordNotFound { .. })
    ));
}

#[test]
fn test_same_named_types_do_not_share_instances() {
    let map = Rc::new(IdentityMap::new());
    let build = |backend: &Arc<MemoryBackend>| {
        Repository::with_identity_map(
            EntityType::builder("Widget")
                .properties(["name"])
                .backend(backend.clone())
                .build(),
            map.clone(),
        )
    };
    let shop = build(&Arc::new(MemoryBackend::new()));
    let warehouse = build(&Arc::new(MemoryBackend::new()));

    let sold = shop.create([("name", "sold")]).unwrap();
    sold.save().unwrap();
    let stored = warehouse.create([("name", "stored")]).unwrap();
    stored.save().unwrap();
    assert_eq!(sold.id(), stored.id());

    let id = sold.id().unwrap();
    assert!(shop.get(id).ptr_eq(&sold));
    assert!(warehouse.get(id).ptr_eq(&stored));
    assert_eq!(map.len(), 2);
}
