/// Finder, collection and association tests
///
/// Run with: cargo test --test finder_tests

mod common;

use std::sync::Arc;

use common::{CountingBackend, props};
use memorecord::{
    EntityType, MemoryBackend, RecordError, RecordId, Related, Repository, SortKey, Value,
};

struct Blog {
    authors: Repository,
    posts: Repository,
}

fn blog() -> Blog {
    let backend = Arc::new(MemoryBackend::new());
    let posts = Repository::new(
        EntityType::builder("Post")
            .properties(["title", "author_id", "rating"])
            .backend(backend.clone())
            .build(),
    );
    let authors = Repository::new(
        EntityType::builder("Author")
            .properties(["name"])
            .has_many("posts", &posts, "author_id")
            .has_one("latest", &posts, "author_id")
            .backend(backend.clone())
            .build(),
    );
    Blog { authors, posts }
}

fn add_post(blog: &Blog, title: &str, author: RecordId, rating: Value) -> RecordId {
    let post = blog
        .posts
        .create([
            ("title", Value::from(title)),
            ("author_id", Value::from(author)),
            ("rating", rating),
        ])
        .unwrap();
    post.save().unwrap();
    post.id().unwrap()
}

#[test]
fn test_find_by_returns_matching_records() {
    let blog = blog();
    add_post(&blog, "one", RecordId(1), Value::from(3));
    add_post(&blog, "two", RecordId(2), Value::from(5));
    add_post(&blog, "three", RecordId(1), Value::Null);

    let found = blog.posts.find_by("author_id", RecordId(1)).unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(
        found.column("title").unwrap(),
        vec![Value::from("one"), Value::from("three")]
    );

    let one = blog.posts.find_one_by("title", "two").unwrap().unwrap();
    assert_eq!(one.get("rating").unwrap(), Value::from(5));
    assert!(blog.posts.find_one_by("title", "missing").unwrap().is_none());
}

#[test]
fn test_found_records_are_the_registered_instances() {
    let blog = blog();
    let id = add_post(&blog, "one", RecordId(1), Value::from(3));
    let registered = blog.posts.get(id);

    let found = blog.posts.find_one_by("title", "one").unwrap().unwrap();

    assert!(found.ptr_eq(&registered));
}

#[test]
fn test_find_by_identity_property() {
    let blog = blog();
    let id = add_post(&blog, "one", RecordId(1), Value::from(3));

    let found = blog.posts.find_by("id", id).unwrap();
    assert_eq!(found.ids(), vec![id]);
    assert!(blog.posts.find_by("id", 999).unwrap().is_empty());
}

#[test]
fn test_dynamic_finder_names() {
    let blog = blog();
    add_post(&blog, "one", RecordId(1), Value::from(3));
    add_post(&blog, "two", RecordId(1), Value::from(4));

    match blog.posts.find("findByAuthorId", RecordId(1)).unwrap() {
        Related::Many(found) => assert_eq!(found.len(), 2),
        other => panic!("expected many, got {:?}", other),
    }

    let one = blog.posts.find("findOneByTitle", "two").unwrap().one().unwrap();
    assert_eq!(one.get("rating").unwrap(), Value::from(4));

    assert!(matches!(
        blog.posts.find("findByColour", "red"),
        Err(RecordError::UndefinedProperty { .. })
    ));
}

#[test]
fn test_sort_filter_and_json() {
    let blog = blog();
    add_post(&blog, "b", RecordId(1), Value::from(2));
    add_post(&blog, "a", RecordId(1), Value::Null);
    add_post(&blog, "c", RecordId(1), Value::from(9));

    let posts = blog.posts.find_by("author_id", RecordId(1)).unwrap();

    let by_rating = posts.sort_by(&[SortKey::desc("rating")]).unwrap();
    assert_eq!(
        by_rating.column("title").unwrap(),
        vec![Value::from("a"), Value::from("c"), Value::from("b")]
    );

    let by_title = posts.sort_by(&[SortKey::asc("title")]).unwrap();
    assert_eq!(by_title.first().unwrap().get("title").unwrap(), Value::from("a"));
    assert_eq!(by_title.last().unwrap().get("title").unwrap(), Value::from("c"));

    let top = posts.filter("rating", 9).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(
        top.to_json().unwrap(),
        serde_json::json!([{"id": 3, "title": "c", "author_id": 1, "rating": 9}])
    );
}

#[test]
fn test_has_many_and_has_one() {
    let blog = blog();
    let author = blog.authors.create([("name", "ann")]).unwrap();
    author.save().unwrap();
    let author_id = author.id().unwrap();
    add_post(&blog, "first", author_id, Value::from(1));
    add_post(&blog, "second", author_id, Value::from(2));
    add_post(&blog, "elsewhere", RecordId(99), Value::from(3));

    let posts = author.related("posts").unwrap().many();
    assert_eq!(posts.len(), 2);

    let latest = author.related("latest").unwrap().one().unwrap();
    assert_eq!(latest.get("title").unwrap(), Value::from("first"));

    assert!(matches!(
        author.get("posts"),
        Err(RecordError::InvalidArgument(_))
    ));
}

#[test]
fn test_belongs_to() {
    let backend = Arc::new(MemoryBackend::new());
    let authors = Repository::new(
        EntityType::builder("Author")
            .properties(["name"])
            .backend(backend.clone())
            .build(),
    );
    let posts = Repository::new(
        EntityType::builder("Post")
            .properties(["title", "author_id"])
            .belongs_to("author", &authors, "author_id")
            .backend(backend.clone())
            .build(),
    );
    let author = authors.create([("name", "ann")]).unwrap();
    author.save().unwrap();

    let post = posts.create([("title", "hello")]).unwrap();
    assert!(post.related("author").unwrap().one().is_none());

    post.set("author_id", author.id().unwrap()).unwrap();
    let owner = post.related("author").unwrap().one().unwrap();
    assert!(owner.ptr_eq(&author));

    post.set("author_id", 404).unwrap();
    assert!(post.related("author").unwrap().one().is_none());
}

#[test]
fn test_discovered_schema() {
    let memory = MemoryBackend::new()
        .with_table("gadget", ["id", "label", "weight"])
        .unwrap();
    let backend = Arc::new(CountingBackend::wrap(memory));
    let gadgets = Repository::new(EntityType::builder("Gadget").backend(backend.clone()).build());

    let gadget = gadgets.create([("label", "box")]).unwrap();
    assert!(matches!(
        gadget.set("colour", "red"),
        Err(RecordError::UndefinedProperty { .. })
    ));
    gadget.save().unwrap();

    assert_eq!(backend.discoveries(), 1);
    assert_eq!(gadget.get("weight").unwrap(), Value::Null);

    let found = gadgets.find_by("label", "box").unwrap();
    assert_eq!(found.ids(), vec![gadget.id().unwrap()]);
    assert_eq!(
        backend.memory().row("gadget", gadget.id().unwrap()).unwrap(),
        Some(props([("label", "box")]))
    );
}

#[test]
fn test_schema_errors() {
    let without_table = Repository::new(
        EntityType::builder("Gadget")
            .backend(Arc::new(MemoryBackend::new()))
            .build(),
    );
    assert!(matches!(
        without_table.create([("label", "box")]),
        Err(RecordError::UnsupportedOperation(_))
    ));

    let no_discovery = Repository::new(
        EntityType::builder("Gadget")
            .discover_fields(false)
            .backend(Arc::new(MemoryBackend::new()))
            .build(),
    );
    assert!(matches!(
        no_discovery.create([("label", "box")]),
        Err(RecordError::Config(_))
    ));
}

#[test]
fn test_reads_of_unknown_properties_never_discover() {
    let memory = MemoryBackend::new();
    let id = memory.insert_row("gadget", props([("label", "box")])).unwrap();
    let backend = Arc::new(CountingBackend::wrap(memory));
    let gadgets = Repository::new(EntityType::builder("Gadget").backend(backend.clone()).build());

    let gadget = gadgets.get(id);
    assert_eq!(gadget.get("label").unwrap(), Value::from("box"));
    assert!(matches!(
        gadget.get("colour"),
        Err(RecordError::UndefinedProperty { .. })
    ));
    assert_eq!(backend.discoveries(), 0);
}
