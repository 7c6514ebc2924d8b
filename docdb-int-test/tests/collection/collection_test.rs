use docdb::collection::{insert_if_absent, just_once, Document, DocumentId};
use docdb::doc;
use docdb::errors::ErrorKind;
use docdb::filter::{all, and, field};
use docdb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[test]
fn test_insert_and_find() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            assert_eq!(collection.size()?, 3);
            let cursor = collection.find(field("last_name").eq("ln2"))?;
            assert_eq!(cursor.size()?, 2);

            let docs = collection.find(and(vec![
                field("last_name").eq("ln2"),
                field("age").gt(30),
            ]))?;
            let first = docs.first()?.expect("one document matches");
            assert_eq!(first.get("first_name").and_then(|v| v.as_str()), Some("fn3"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_insert_assigns_ids() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let result = collection.insert_many(vec![doc! { a: 1 }, doc! { a: 2 }])?;
            assert_eq!(result.affected_count(), 2);

            for id in result {
                let stored = collection.get_by_id(&id)?.expect("inserted document");
                assert_eq!(stored.id_value(), Some(id));
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_duplicate_id_rejected() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let id = collection.insert(doc! { a: 1 })?.affected_document_ids()[0];
            let stored = collection.get_by_id(&id)?.expect("inserted document");

            let err = collection.insert(stored).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_with_filter() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let result = collection.update(field("last_name").eq("ln2"), &doc! { status: "moved" })?;
            assert_eq!(result.affected_count(), 2);
            assert_eq!(collection.find(field("status").eq("moved"))?.size()?, 2);

            let result = collection.update_with_options(
                field("last_name").eq("ln2"),
                &doc! { status: "once" },
                &just_once(),
            )?;
            assert_eq!(result.affected_count(), 1);
            assert_eq!(collection.find(field("status").eq("once"))?.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_upsert_inserts_when_nothing_matches() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let result = collection.update_with_options(
                field("first_name").eq("nobody"),
                &doc! { first_name: "nobody", age: 1 },
                &insert_if_absent(),
            )?;
            assert_eq!(result.affected_count(), 1);
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_one_requires_id() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;

            let err = collection.update_one(&doc! { a: 1 }, false).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotIdentifiable);
            assert_eq!(collection.size()?, 0);

            let result = collection.update_one(&doc! { a: 1 }, true)?;
            assert_eq!(result.affected_count(), 1);
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_one_upsert_updates_every_match() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.insert_many(vec![
                doc! { name: "a", n: 1 },
                doc! { name: "a", n: 2 },
                doc! { name: "b", n: 3 },
            ])?;

            let result = collection.update_one(&doc! { name: "a" }, true)?;
            assert_eq!(result.affected_count(), 2);
            assert_eq!(collection.size()?, 3);
            assert_eq!(collection.find(field("name").eq("a"))?.size()?, 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_one_replaces_fields() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let id = collection.insert(doc! { a: 1, b: "x" })?.affected_document_ids()[0];

            let mut stored = collection.get_by_id(&id)?.expect("inserted document");
            stored.put("b", "y")?;
            collection.update_one(&stored, false)?;

            let updated = collection.get_by_id(&id)?.expect("updated document");
            assert_eq!(updated.get("b").and_then(|v| v.as_str()), Some("y"));
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_remove() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let removed = collection.remove(field("last_name").eq("ln2"), true)?;
            assert_eq!(removed.affected_count(), 1);
            assert_eq!(collection.size()?, 2);

            let removed = collection.remove(all(), false)?;
            assert_eq!(removed.affected_count(), 2);
            assert_eq!(collection.size()?, 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_remove_all_just_once_is_rejected() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;

            let err = collection.remove(all(), true).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidOperation);
            assert_eq!(collection.size()?, 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_remove_one() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let id = collection.insert(doc! { a: 1 })?.affected_document_ids()[0];

            let err = collection.remove_one(&Document::new()).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotIdentifiable);

            let stored = collection.get_by_id(&id)?.expect("inserted document");
            assert_eq!(collection.remove_one(&stored)?.affected_count(), 1);
            assert!(collection.get_by_id(&id)?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_get_by_unknown_id() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            insert_test_documents(&collection)?;
            assert!(collection.get_by_id(&DocumentId::new())?.is_none());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_clear_keeps_indexes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.create_index("age", &docdb::index::non_unique_index())?;
            insert_test_documents(&collection)?;

            collection.clear()?;
            assert_eq!(collection.size()?, 0);
            assert!(collection.has_index("age")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
