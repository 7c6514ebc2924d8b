use docdb::doc;
use docdb::errors::ErrorKind;
use docdb::filter::field;
use docdb::index::{full_text_index, non_unique_index, unique_index, IndexType};
use docdb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};
use std::time::Duration;

#[test]
fn test_create_and_list_indexes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            collection.create_index("first_name", &unique_index())?;
            collection.create_index("last_name", &non_unique_index())?;

            assert!(collection.has_index("first_name")?);
            assert!(!collection.is_indexing("first_name")?);

            let indexes = collection.list_indexes()?;
            assert_eq!(indexes.len(), 2);
            let first = indexes
                .iter()
                .find(|entry| entry.field() == "first_name")
                .expect("first_name index");
            assert_eq!(first.index_type(), IndexType::Unique);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_unique_index_on_duplicate_values_fails() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let err = collection.create_index("last_name", &unique_index()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            assert!(!collection.has_index("last_name")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_unique_index_guards_writes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;
            collection.create_index("first_name", &unique_index())?;

            let err = collection.insert(doc! { first_name: "fn1" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);

            let err = collection
                .update(field("first_name").eq("fn2"), &doc! { first_name: "fn3" })
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            assert_eq!(collection.find(field("first_name").eq("fn2"))?.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_full_text_index_rejects_non_text() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.create_index("body", &full_text_index())?;
            collection.insert(doc! { body: "some words" })?;

            let err = collection.insert(doc! { body: 42 }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexingError);
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_duplicate_index_rejected() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.create_index("age", &non_unique_index())?;
            let err = collection.create_index("age", &unique_index()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexAlreadyExists);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_rebuild_requires_index() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let err = collection.rebuild_index("age", false).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexingError);

            collection.create_index("age", &non_unique_index())?;
            collection.rebuild_index("age", false)?;
            assert!(collection.has_index("age")?);
            assert!(!collection.is_indexing("age")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_async_index_build() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            collection.create_index("first_name", &unique_index().build_async(true))?;
            assert!(collection.has_index("first_name")?);

            awaitility::at_most(Duration::from_secs(2))
                .until(|| !collection.is_indexing("first_name").unwrap_or(true));

            collection.rebuild_index("first_name", true)?;
            awaitility::at_most(Duration::from_secs(2))
                .until(|| !collection.is_indexing("first_name").unwrap_or(true));
            assert!(collection.has_index("first_name")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_async_build_removes_index() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            collection.create_index("last_name", &unique_index().build_async(true))?;
            awaitility::at_most(Duration::from_secs(2))
                .until(|| !collection.has_index("last_name").unwrap_or(true));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_drop_indexes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.create_index("age", &non_unique_index())?;
            collection.create_index("first_name", &unique_index())?;

            collection.drop_index("age")?;
            assert!(!collection.has_index("age")?);

            let err = collection.drop_index("age").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::IndexingError);

            collection.drop_all_indexes()?;
            assert!(collection.list_indexes()?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
