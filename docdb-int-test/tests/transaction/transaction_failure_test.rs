use docdb::doc;
use docdb::errors::ErrorKind;
use docdb::filter::field;
use docdb::index::unique_index;
use docdb::transaction::TransactionState;
use docdb_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_failed_commit_compensates_dependent_operations() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            collection.create_index("code", &unique_index())?;
            collection.insert(doc! { code: "existing", n: 0 })?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;

            tx_collection.insert(doc! { code: "a", n: 1 })?;
            tx_collection.update(field("code").eq("a"), &doc! { n: 2 })?;
            tx_collection.update(field("code").eq("existing"), &doc! { n: 10 })?;
            tx_collection.remove(field("code").eq("a"), false)?;
            tx_collection.insert(doc! { code: "b" })?;
            assert_eq!(transaction.pending_operations(), 5);

            // a concurrent writer takes the code the last insert needs
            collection.insert(doc! { code: "b" })?;

            let err = transaction.commit().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionFailed);
            assert_eq!(transaction.state(), TransactionState::Failed);

            assert_eq!(collection.size()?, 2);
            assert_eq!(collection.find(field("code").eq("a"))?.size()?, 0);
            let existing = collection
                .find(field("code").eq("existing"))?
                .first()?
                .expect("untouched document");
            assert_eq!(existing.get("n").and_then(|v| v.as_i64()), Some(0));

            assert_eq!(tx_collection.size().unwrap_err().kind(), &ErrorKind::TransactionClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_commit_restores_dropped_collection() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let first = db.collection("first")?;
            first.insert_many(vec![doc! { a: 1 }, doc! { a: 2 }])?;
            first.create_index("a", &unique_index())?;

            let second = db.collection("second")?;
            second.create_index("code", &unique_index())?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            transaction.collection("first")?.dispose()?;
            transaction.collection("second")?.insert(doc! { code: "x" })?;

            second.insert(doc! { code: "x" })?;

            let err = transaction.commit().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::TransactionFailed);

            assert!(db.has_collection("first")?);
            let restored = db.collection("first")?;
            assert_eq!(restored.size()?, 2);
            assert!(restored.has_index("a")?);
            assert!(restored.insert(doc! { a: 1 }).is_err());
            assert_eq!(second.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_commit_restores_dropped_indexes() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            collection.create_index("code", &unique_index())?;
            collection.create_index("name", &unique_index())?;

            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            let tx_collection = transaction.collection("test")?;
            tx_collection.drop_all_indexes()?;
            tx_collection.create_index("code", &unique_index())?;
            tx_collection.insert(doc! { code: "x" })?;

            collection.insert(doc! { code: "x" })?;

            assert!(transaction.commit().is_err());
            assert!(collection.has_index("code")?);
            assert!(collection.has_index("name")?);
            assert_eq!(collection.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_committed_transaction_rejects_further_work() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let session = db.create_session()?;
            let transaction = session.begin_transaction()?;
            transaction.collection("test")?.insert(doc! { a: 1 })?;
            transaction.commit()?;

            assert_eq!(transaction.commit().unwrap_err().kind(), &ErrorKind::TransactionClosed);
            assert_eq!(
                transaction.collection("test").err().unwrap().kind(),
                &ErrorKind::TransactionClosed
            );

            transaction.close()?;
            transaction.close()?;
            assert_eq!(transaction.state(), TransactionState::Committed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
