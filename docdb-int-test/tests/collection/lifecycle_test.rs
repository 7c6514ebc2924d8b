use docdb::doc;
use docdb::errors::ErrorKind;
use docdb::filter::all;
use docdb_int_test::test_util::{cleanup, create_test_context, insert_test_documents, run_test};

#[test]
fn test_dropped_collection_rejects_operations() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;

            collection.dispose()?;
            assert!(collection.is_dropped());
            assert!(!collection.is_open());
            assert!(!db.has_collection("test")?);

            assert_eq!(collection.insert(doc! { a: 1 }).unwrap_err().kind(), &ErrorKind::StoreClosed);
            assert_eq!(collection.find(all()).err().unwrap().kind(), &ErrorKind::StoreClosed);
            assert_eq!(collection.size().unwrap_err().kind(), &ErrorKind::StoreClosed);
            assert_eq!(collection.clear().unwrap_err().kind(), &ErrorKind::StoreClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_dropped_name_reopens_empty() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;
            collection.dispose()?;

            let reopened = db.collection("test")?;
            assert!(reopened.is_open());
            assert_eq!(reopened.size()?, 0);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_collection_rejects_operations() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;

            collection.close()?;
            collection.close()?;
            assert!(!collection.is_open());
            assert!(!collection.is_dropped());
            assert_eq!(collection.insert(doc! { a: 1 }).unwrap_err().kind(), &ErrorKind::StoreClosed);

            // the data survives a closed handle
            assert!(db.has_collection("test")?);
            assert_eq!(db.collection("test")?.size()?, 3);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_handles_share_state() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let first = db.collection("test")?;
            let second = db.collection("test")?;
            first.insert(doc! { a: 1 })?;
            assert_eq!(second.size()?, 1);
            assert_eq!(first.name(), "test");
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_collection_names() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            db.collection("a")?;
            db.collection("b")?;

            let mut names = db.list_collection_names()?;
            names.sort();
            assert_eq!(names, vec!["a", "b"]);

            db.destroy_collection("a")?;
            assert!(!db.has_collection("a")?);
            assert!(db.has_collection("b")?);

            assert_eq!(db.collection("").err().unwrap().kind(), &ErrorKind::ValidationError);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_database() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let collection = db.collection("test")?;
            insert_test_documents(&collection)?;

            db.close()?;
            db.close()?;
            assert!(db.is_closed());
            assert!(!collection.is_open());
            assert_eq!(collection.size().unwrap_err().kind(), &ErrorKind::StoreClosed);
            assert_eq!(db.collection("test").err().unwrap().kind(), &ErrorKind::StoreClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
