use docdb::doc;
use docdb::errors::{DocDbError, ErrorKind};
use docdb::transaction::TransactionState;
use docdb_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_session_close_rolls_back() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let session = db.create_session()?;
            let committed = session.begin_transaction()?;
            let pending = session.begin_transaction()?;

            committed.collection("test")?.insert(doc! { a: 1 })?;
            committed.commit()?;
            pending.collection("test")?.insert(doc! { a: 2 })?;
            assert_eq!(session.active_transactions().len(), 1);

            session.close()?;
            assert!(!session.is_active());
            assert_eq!(pending.state(), TransactionState::Aborted);
            assert_eq!(committed.state(), TransactionState::Committed);
            assert_eq!(db.collection("test")?.size()?, 1);

            let err = session.begin_transaction().err().unwrap();
            assert_eq!(err.kind(), &ErrorKind::TransactionClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_with_session() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let size = db.with_session(|session| {
                let transaction = session.begin_transaction()?;
                transaction.collection("test")?.insert(doc! { a: 1 })?;
                transaction.commit()?;
                db.collection("test")?.size()
            })?;
            assert_eq!(size, 1);

            let result: Result<(), DocDbError> = db.with_session(|session| {
                let transaction = session.begin_transaction()?;
                transaction.collection("test")?.insert(doc! { a: 2 })?;
                Err(DocDbError::new("abandoned", ErrorKind::InvalidOperation))
            });
            assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidOperation);
            assert_eq!(db.collection("test")?.size()?, 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_database_rejects_sessions() {
    run_test(
        || create_test_context(),
        |ctx| {
            let db = ctx.db();
            let session = db.create_session()?;
            db.close()?;

            assert_eq!(db.create_session().err().unwrap().kind(), &ErrorKind::StoreClosed);
            assert_eq!(session.begin_transaction().err().unwrap().kind(), &ErrorKind::StoreClosed);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
