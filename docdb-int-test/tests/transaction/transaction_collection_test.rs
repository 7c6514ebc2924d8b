use docdb::collection::{CollectionEventInfo, CollectionEventListener};
use docdb::common::{AttributeAware, Attributes, EventAware};
use docdb::doc;
use docdb::errors::ErrorKind;
use docdb::filter::{all, field};
use docdb::index::{non_unique_index, unique_index};
use docdb::transaction::TransactionState;
use docdb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_commit_insert() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;

            let tx_collection = transaction.collection("test")?;
            tx_collection.insert(doc! { first_name: "John", last_name: "Doe" })?;

            assert_eq!(tx_collection.find(field("first_name").eq("John"))?.size()?, 1);
            assert_eq!(collection.find(field("first_name").eq("John"))?.size()?, 0);

            transaction.commit()?;
            assert_eq!(transaction.state(), TransactionState::Committed);
            assert_eq!(collection.find(field("first_name").eq("John"))?.size()?, 1);

            let err = tx_collection.insert(doc! { first_name: "Jane" }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_rollback_insert() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;

            let tx_collection = transaction.collection("test")?;
            tx_collection.insert(doc! { first_name: "John" })?;
            tx_collection.insert(doc! { first_name: "Jane" })?;
            assert_eq!(transaction.pending_operations(), 2);

            transaction.rollback()?;
            assert_eq!(transaction.state(), TransactionState::Aborted);
            assert_eq!(collection.size()?, 0);
            assert_eq!(tx_collection.size().unwrap_err().kind(), &ErrorKind::TransactionClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_commit_update_and_remove() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;
            assert_eq!(tx_collection.size()?, 3);

            tx_collection.update(field("first_name").eq("fn1"), &doc! { age: 99 })?;
            tx_collection.remove(field("first_name").eq("fn2"), false)?;
            assert_eq!(collection.find(field("age").eq(99))?.size()?, 0);
            assert_eq!(collection.size()?, 3);

            transaction.commit()?;
            assert_eq!(collection.find(field("age").eq(99))?.size()?, 1);
            assert_eq!(collection.size()?, 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_update_one_in_transaction() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            let id = collection.insert(doc! { first_name: "John" })?.affected_document_ids()[0];

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;

            let err = tx_collection.update_one(&doc! { first_name: "x" }, false).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotIdentifiable);
            assert_eq!(transaction.pending_operations(), 0);

            let mut document = tx_collection.get_by_id(&id)?.expect("seeded document");
            document.put("first_name", "Johnny")?;
            tx_collection.update_one(&document, false)?;
            tx_collection.update_one(&doc! { first_name: "Jane" }, true)?;

            transaction.commit()?;
            let stored = collection.get_by_id(&id)?.expect("committed document");
            assert_eq!(stored.get("first_name").and_then(|v| v.as_str()), Some("Johnny"));
            assert_eq!(collection.find(field("first_name").eq("Jane"))?.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_commit_index_operations() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;
            collection.create_index("age", &non_unique_index())?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;

            tx_collection.create_index("first_name", &unique_index())?;
            tx_collection.drop_index("age")?;
            assert!(!collection.has_index("first_name")?);
            assert!(collection.has_index("age")?);

            transaction.commit()?;
            assert!(collection.has_index("first_name")?);
            assert!(!collection.has_index("age")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_commit_clear() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;
            tx_collection.clear()?;
            assert_eq!(tx_collection.size()?, 0);
            assert_eq!(collection.size()?, 3);

            transaction.commit()?;
            assert_eq!(collection.size()?, 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_commit_attributes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;

            let mut attributes = Attributes::new_for_collection("test");
            attributes.put("owner", "ops");
            tx_collection.set_attributes(attributes)?;
            assert!(!collection.attributes()?.has_key("owner"));

            transaction.commit()?;
            let stored = collection.attributes()?;
            assert_eq!(stored.get("owner").and_then(|v| v.as_str()), Some("ops"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_commit_drop() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;
            tx_collection.dispose()?;

            assert!(tx_collection.is_dropped());
            assert_eq!(tx_collection.size().unwrap_err().kind(), &ErrorKind::StoreClosed);
            assert!(db.has_collection("test")?);
            assert_eq!(collection.size()?, 3);

            transaction.commit()?;
            assert!(!db.has_collection("test")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_rollback_drop() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            collection.insert_many(vec![doc! { a: 1 }, doc! { a: 2 }])?;
            collection.create_index("a", &unique_index())?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            transaction.collection("test")?.dispose()?;
            transaction.rollback()?;

            assert!(db.has_collection("test")?);
            let collection = db.collection("test")?;
            assert_eq!(collection.size()?, 2);
            assert!(collection.has_index("a")?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_transactional_reads_are_not_journaled() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            insert_test_documents(&db.collection("test")?)?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;

            tx_collection.find(all())?.to_list()?;
            tx_collection.size()?;
            tx_collection.list_indexes()?;
            assert_eq!(transaction.pending_operations(), 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_operation_leaves_journal_unchanged() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            collection.create_index("code", &unique_index())?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;

            tx_collection.insert(doc! { code: "a" })?;
            assert!(tx_collection.insert(doc! { code: "a" }).is_err());
            assert!(tx_collection.remove(all(), true).is_err());
            assert!(tx_collection.rebuild_index("missing", false).is_err());
            assert_eq!(transaction.pending_operations(), 1);

            transaction.commit()?;
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_transaction_isolation_between_transactions() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let session = db.create_session()?;
            let first = session.begin_transaction()?;
            let second = session.begin_transaction()?;

            first.collection("test")?.insert(doc! { a: 1 })?;
            assert_eq!(second.collection("test")?.size()?, 0);

            first.commit()?;
            second.commit()?;
            assert_eq!(db.collection("test")?.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_commit_notifies_primary_listeners() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            let count = Arc::new(AtomicUsize::new(0));
            let count_clone = count.clone();
            collection.subscribe(CollectionEventListener::new(move |_event: CollectionEventInfo| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            transaction
                .collection("test")?
                .insert_many(vec![doc! { a: 1 }, doc! { a: 2 }])?;

            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(count.load(Ordering::SeqCst), 0);

            transaction.commit()?;
            awaitility::at_most(Duration::from_secs(1))
                .until(|| count.load(Ordering::SeqCst) == 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
