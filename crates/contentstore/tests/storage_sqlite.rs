#![cfg(feature = "sqlite")]

use std::sync::{Arc, Mutex};

use contentstore::prelude::*;
use contentstore::{RecordGenerator, SampleContentFactory, SqliteConnection, slugify};

const CONFIG: &str = r#"{
    "table_prefix": "bolt_",
    "prefill_max_count": 5,
    "content_types": {
        "showcases": {
            "name": "Showcases",
            "singular_name": "Showcase",
            "sort": "-id",
            "fields": {
                "title": { "type": "text", "required": true },
                "body": { "type": "html" },
                "rating": { "type": "integer" }
            }
        },
        "pages": {
            "name": "Pages",
            "singular_name": "Page",
            "fields": {
                "title": { "type": "text" },
                "teaser": { "type": "textarea" }
            }
        },
        "entries": {
            "name": "Entries",
            "singular_name": "Entry",
            "fields": { "title": { "type": "text" } }
        }
    }
}"#;

/// Storage over an in-memory database with every table but `bolt_entries`.
fn storage() -> Storage<SqliteConnection> {
    let config = StorageConfig::from_json_str(CONFIG).expect("parse config");
    let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
    let storage = Storage::from_config(conn, config).expect("build storage");
    contentstore::create_tables(&storage).expect("create tables");
    storage
        .connection()
        .execute_batch("DROP TABLE bolt_entries")
        .expect("drop entries table");
    storage
}

fn add_showcase(storage: &Storage<SqliteConnection>, title: &str, body: &str, rating: i64) -> i64 {
    let mut record = storage.create_by_name("showcase").expect("create showcase");
    record.set("title", title);
    record.set("slug", slugify(title));
    record.set("body", body);
    record.set("rating", rating);
    storage.save(&mut record).expect("save showcase")
}

/// Search options over the content types that have a table.
fn with_tables() -> SearchOptions {
    SearchOptions::new().content_type("showcases").content_type("pages")
}

fn ids(fetched: Fetched) -> Vec<i64> {
    fetched
        .into_records()
        .iter()
        .filter_map(ContentRecord::id)
        .collect()
}

#[test]
fn save_assigns_identity_and_fetch_by_path() {
    let storage = storage();
    let first = add_showcase(&storage, "First koala", "<p>one</p>", 1);
    let second = add_showcase(&storage, "Second koala", "<p>two</p>", 2);
    assert_eq!((first, second), (1, 2));

    let record = storage
        .fetch_path("showcase/2")
        .expect("fetch by path")
        .into_single()
        .expect("record 2 exists");
    assert_eq!(record.id(), Some(2));
    assert_eq!(record.title().as_deref(), Some("Second koala"));
    assert_eq!(record.get("rating"), Some(&Value::BigInt(2)));

    let by_slug = storage
        .fetch_path("showcases/first-koala")
        .expect("fetch by slug")
        .into_single()
        .expect("slug exists");
    assert_eq!(by_slug.id(), Some(1));

    assert!(matches!(
        storage.fetch_path("showcase/99").expect("fetch missing"),
        Fetched::NotFound
    ));
}

#[test]
fn saving_existing_record_updates_in_place() {
    let storage = storage();
    let id = add_showcase(&storage, "Draft", "", 1);

    let mut record = storage
        .find("showcases", id)
        .expect("find")
        .expect("record exists");
    record.set("title", "Final");
    assert_eq!(storage.save(&mut record).expect("update"), id);

    assert_eq!(storage.count("showcases").expect("count"), 1);
    let reloaded = storage.find("showcases", id).expect("find").expect("exists");
    assert_eq!(reloaded.title().as_deref(), Some("Final"));
}

#[test]
fn default_sort_and_pagination() {
    let storage = storage();
    for n in 1..=5 {
        add_showcase(&storage, &format!("Showcase {n}"), "", n);
    }

    let all = storage.fetch("showcases", &QueryOptions::new()).expect("fetch");
    assert_eq!(ids(all), vec![5, 4, 3, 2, 1]);

    let page = storage
        .fetch("showcases", &QueryOptions::new().sort("id").page(2, 2))
        .expect("fetch page");
    assert_eq!(ids(page), vec![3, 4]);

    let single = storage
        .fetch("showcases", &QueryOptions::new().limit(3).single())
        .expect("fetch single");
    assert_eq!(single.into_single().and_then(|r| r.id()), Some(5));
}

#[test]
fn filter_expressions() {
    let storage = storage();
    add_showcase(&storage, "Alpha", "", 1);
    add_showcase(&storage, "Beta", "", 3);
    add_showcase(&storage, "Gamma", "", 5);

    let fetch = |field: &str, filter: &str| {
        let options = QueryOptions::new().sort("id").filter(field, filter);
        ids(storage.fetch("showcases", &options).expect("filtered fetch"))
    };

    assert_eq!(fetch("rating", ">2"), vec![2, 3]);
    assert_eq!(fetch("rating", "<=3"), vec![1, 2]);
    assert_eq!(fetch("title", "!Beta"), vec![1, 3]);
    assert_eq!(fetch("title", "Alpha || Gamma"), vec![1, 3]);
    assert_eq!(fetch("title", "%amm%"), vec![3]);
    assert_eq!(fetch("rating", ">1 && <5"), vec![2]);
    assert!(fetch("body", "NULL").is_empty());

    let injected = fetch("title", "x' OR '1'='1");
    assert!(injected.is_empty());
}

#[test]
fn unknown_columns_reject_the_plan() {
    let storage = storage();
    let sort = storage.fetch("showcases", &QueryOptions::new().sort("-nonexistent"));
    assert!(matches!(sort, Err(Error::InvalidColumn { .. })));

    let filter = storage.fetch("showcases", &QueryOptions::new().filter("nonexistent", "1"));
    assert!(matches!(filter, Err(Error::InvalidColumn { ref column, .. }) if column == "nonexistent"));
}

#[test]
fn update_single_value_is_soft_on_unknown_columns() {
    let storage = storage();
    add_showcase(&storage, "One", "", 1);
    let id = add_showcase(&storage, "Two", "", 2);

    assert_eq!(
        storage
            .update_single_value("showcases", id, "ownerid", "10")
            .expect("update ownerid"),
        Some(1)
    );
    let record = storage.find("showcases", id).expect("find").expect("exists");
    assert_eq!(record.get("ownerid"), Some(&Value::BigInt(10)));

    assert_eq!(
        storage
            .update_single_value("showcases", id, "nonexistent", "10")
            .expect("soft failure"),
        None
    );
}

#[test]
fn lifecycle_events_fire_once_per_write() {
    let mut storage = storage();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in [
        StorageEventName::PreSave,
        StorageEventName::PostSave,
        StorageEventName::PreDelete,
        StorageEventName::PostDelete,
    ] {
        let seen = Arc::clone(&seen);
        storage.listen(name, move |event| {
            seen.lock().unwrap().push((event.name, event.id));
        });
    }

    let mut record = storage.create_by_name("Showcase").expect("create");
    record.set("title", "Evented");
    let id = storage.save(&mut record).expect("save");

    assert!(storage.delete("", 999).is_err());
    assert!(!storage.delete("showcases", 0).expect("no identity"));
    assert!(!storage.delete("showcases", 4242).expect("no such row"));
    assert!(storage.delete("showcases", id).expect("delete"));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (StorageEventName::PreSave, None),
            (StorageEventName::PostSave, Some(id)),
            (StorageEventName::PreDelete, Some(id)),
            (StorageEventName::PostDelete, Some(id)),
        ]
    );
    assert_eq!(storage.count("showcases").expect("count"), 0);
}

#[test]
fn missing_table_is_distinct_from_empty() {
    let storage = storage();
    assert_eq!(storage.count("pages").expect("count empty table"), 0);

    let err = storage.count("entries").expect_err("table is missing");
    assert!(err.is_table_not_found(), "{err}");

    let err = storage
        .fetch("entries", &QueryOptions::new())
        .expect_err("table is missing");
    assert!(matches!(err, Error::TableNotFound { ref table } if table == "bolt_entries"));
}

#[test]
fn search_across_content_types() {
    let storage = storage();
    add_showcase(&storage, "Lorem koala", "<p>lorem ipsum</p>", 1);
    add_showcase(&storage, "Bear", "<p>no match</p>", 2);
    let mut page = storage.create_by_name("page").expect("create page");
    page.set("title", "About");
    page.set("teaser", "Lorem about us");
    storage.save(&mut page).expect("save page");

    let result = storage.search("lorem", &with_tables()).expect("search");
    assert!(result.query.valid);
    assert_eq!(result.no_of_results, 2);
    assert_eq!(result.hits[0].record.title().as_deref(), Some("Lorem koala"));
    let grouped = result.grouped();
    assert_eq!(grouped["showcases"].len(), 1);
    assert_eq!(grouped["pages"].len(), 1);

    let complex = storage
        .search("I like lorem", &with_tables())
        .expect("complex search");
    assert!(complex.query.valid);

    assert!(matches!(
        storage.search("x", &SearchOptions::new()),
        Err(Error::InvalidSearchQuery(_))
    ));

    let filtered = storage
        .search(
            "lorem",
            &SearchOptions::new()
                .content_type("showcases")
                .filter("showcases", "title", "nonexistent"),
        )
        .expect("filtered search");
    assert!(filtered.query.valid);
    assert_eq!(filtered.no_of_results, 0);
}

#[test]
fn search_skips_unpublished_records() {
    let storage = storage();
    let mut draft = storage.create_by_name("showcases").expect("create");
    draft.set("title", "Lorem draft");
    draft.set("status", "draft");
    storage.save(&mut draft).expect("save draft");

    let published = storage.search("lorem", &with_tables()).expect("search");
    assert_eq!(published.no_of_results, 0);

    let everything = storage
        .search("lorem", &with_tables().published_only(false))
        .expect("search drafts");
    assert_eq!(everything.no_of_results, 1);
}

#[test]
fn search_all_content_types_with_shared_field() {
    let storage = storage();
    add_showcase(&storage, "Lorem showcase", "", 1);
    let mut page = storage.create_by_name("pages").expect("create page");
    page.set("title", "Lorem page");
    storage.save(&mut page).expect("save page");

    // `entries` has a title too, but no table.
    let err = storage
        .search_all_content_types(&[("title", Filter::contains("lorem"))])
        .expect_err("entries table is missing");
    assert!(err.is_table_not_found());

    let records = storage
        .search_all_content_types(&[("teaser", Filter::is_null())])
        .expect("pages only");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].content_type().unwrap().key, "pages");
}

#[test]
fn prefill_generates_shortfall_and_reports_missing_tables() {
    let mut storage = storage();
    let saved = Arc::new(Mutex::new(0_usize));
    let counter = Arc::clone(&saved);
    storage.listen(StorageEventName::PostSave, move |_| {
        *counter.lock().unwrap() += 1;
    });
    add_showcase(&storage, "Existing", "", 1);

    let builder = PrefillBuilder::new(&storage, SampleContentFactory::with_seed(7), 5);
    let response = builder.build(["showcases", "pages", "entries"], 3, true);

    assert_eq!(response.created_count("showcases"), 2);
    assert_eq!(response.created_count("pages"), 3);
    assert_eq!(
        response.errors["entries"],
        "Table not found for ContentType entries, a database update is probably required."
    );
    assert!(!response.aborted);
    assert_eq!(storage.count("showcases").expect("count"), 3);
    assert_eq!(*saved.lock().unwrap(), 1 + 2 + 3);

    let again = builder.build(["showcases"], 3, true);
    assert!(again.created.is_empty());
    assert!(again.errors.is_empty());

    let topped_up = builder.build(["showcases"], 6, true);
    assert_eq!(topped_up.created_count("showcases"), 3);

    let skipped = builder.build(["showcases"], 10, true);
    assert_eq!(skipped.errors["showcases"], "Skipped showcases (already has records)");
}

#[test]
fn prefill_uses_configured_max_count() {
    let storage = storage();
    let mut builder = PrefillBuilder::with_sample_content(&storage);
    assert_eq!(builder.max_count(), 5);

    builder.set_max_count_value(&serde_json::json!("2 records"));
    assert_eq!(builder.max_count(), 2);

    let response = builder.build(["pages"], 2, false);
    assert_eq!(response.created_count("pages"), 2);
    let skipped = builder.build(["pages"], 2, true);
    assert!(skipped.errors.contains_key("pages"));
}

#[test]
fn prefill_writes_nothing_for_a_type_with_an_invalid_record() {
    let storage = storage();
    let factory = |ct: &Arc<ContentType>| -> Result<Box<dyn RecordGenerator>> {
        let ct = Arc::clone(ct);
        Ok(Box::new(move |count: u64| -> Result<Vec<ContentRecord>> {
            Ok((0..count)
                .map(|i| {
                    let mut record = ContentRecord::new(Arc::clone(&ct));
                    record.set("title", format!("Page {i}"));
                    if i == 2 {
                        record.set("nope", "value");
                    }
                    record
                })
                .collect())
        }))
    };

    let response = PrefillBuilder::new(&storage, factory, 10).build(["pages"], 3, false);
    assert!(response.created.is_empty());
    assert!(response.errors.contains_key("pages"));
    assert_eq!(storage.count("pages").expect("count pages"), 0);
}
