use docdb::collection::{CollectionEventInfo, CollectionEventListener, CollectionEvents};
use docdb::common::EventAware;
use docdb::doc;
use docdb::filter::field;
use docdb::index::non_unique_index;
use docdb_int_test::test_util::{cleanup, create_test_context, run_test};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn wait_for_event<F: Fn() -> bool>(timeout_ms: u64, check: F) {
    awaitility::at_most(Duration::from_millis(timeout_ms)).until(check);
}

fn recording_listener(events: Arc<Mutex<Vec<CollectionEvents>>>) -> CollectionEventListener {
    CollectionEventListener::new(move |event: CollectionEventInfo| {
        events.lock().unwrap().push(event.event_type());
        Ok(())
    })
}

#[test]
fn test_insert_event() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let action = Arc::new(Mutex::new(None));
            let item = Arc::new(Mutex::new(None));

            let action_clone = action.clone();
            let item_clone = item.clone();
            collection.subscribe(CollectionEventListener::new(move |event: CollectionEventInfo| {
                *action_clone.lock().unwrap() = Some(event.event_type());
                *item_clone.lock().unwrap() = event.item().cloned();
                Ok(())
            }))?;

            collection.insert(doc! { emp_id: 1 })?;

            wait_for_event(1000, || *action.lock().unwrap() == Some(CollectionEvents::Insert));
            let item = item.lock().unwrap().clone().expect("event carries the document");
            let document = item.as_document().expect("item is a document");
            assert_eq!(document.get("emp_id").and_then(|v| v.as_i64()), Some(1));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_write_events_arrive_in_order() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let events = Arc::new(Mutex::new(Vec::new()));
            collection.subscribe(recording_listener(events.clone()))?;

            collection.insert(doc! { emp_id: 1 })?;
            collection.update(field("emp_id").eq(1), &doc! { address: "abcd" })?;
            collection.remove(field("emp_id").eq(1), false)?;

            wait_for_event(1000, || events.lock().unwrap().len() == 3);
            assert_eq!(
                *events.lock().unwrap(),
                vec![
                    CollectionEvents::Insert,
                    CollectionEvents::Update,
                    CollectionEvents::Remove
                ]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_index_events() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            collection.insert(doc! { emp_id: 1 })?;

            let events = Arc::new(Mutex::new(Vec::new()));
            collection.subscribe(recording_listener(events.clone()))?;
            collection.create_index("emp_id", &non_unique_index())?;

            wait_for_event(1000, || events.lock().unwrap().len() == 2);
            assert_eq!(
                *events.lock().unwrap(),
                vec![CollectionEvents::IndexStart, CollectionEvents::IndexEnd]
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_unsubscribe_stops_delivery() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let events = Arc::new(Mutex::new(Vec::new()));
            let subscriber = collection.subscribe(recording_listener(events.clone()))?;

            collection.insert(doc! { emp_id: 1 })?;
            wait_for_event(1000, || events.lock().unwrap().len() == 1);

            collection.unsubscribe(subscriber)?;
            collection.insert(doc! { emp_id: 2 })?;
            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(events.lock().unwrap().len(), 1);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_failed_write_emits_nothing() {
    run_test(
        || create_test_context(),
        |ctx| {
            let collection = ctx.db().collection("test")?;
            let id = collection.insert(doc! { emp_id: 1 })?.affected_document_ids()[0];
            let existing = collection.get_by_id(&id)?.expect("inserted document");

            let events = Arc::new(Mutex::new(Vec::new()));
            collection.subscribe(recording_listener(events.clone()))?;

            assert!(collection.insert_many(vec![doc! { emp_id: 2 }, existing]).is_err());
            collection.insert(doc! { emp_id: 3 })?;

            wait_for_event(1000, || !events.lock().unwrap().is_empty());
            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(*events.lock().unwrap(), vec![CollectionEvents::Insert]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
