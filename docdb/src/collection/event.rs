use std::fmt::Debug;
use std::sync::Arc;

use crate::common::{get_current_time_or_zero, EventHandler, Value};
use crate::errors::DocDbResult;

/// Kinds of change a collection reports to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionEvents {
    Insert,
    Update,
    Remove,
    IndexStart,
    IndexEnd,
}

/// One change notification.
///
/// Document events carry the written document as a [`Value::Document`];
/// index events carry the indexed field name as a [`Value::String`].
#[derive(Clone)]
pub struct CollectionEventInfo {
    inner: Arc<CollectionEventInner>,
}

impl CollectionEventInfo {
    pub fn new(item: Option<Value>, event_type: CollectionEvents, originator: &str) -> Self {
        CollectionEventInfo {
            inner: Arc::new(CollectionEventInner {
                item,
                event_type,
                timestamp: get_current_time_or_zero(),
                originator: originator.to_string(),
            }),
        }
    }

    pub fn item(&self) -> Option<&Value> {
        self.inner.item.as_ref()
    }

    pub fn event_type(&self) -> CollectionEvents {
        self.inner.event_type
    }

    pub fn timestamp(&self) -> u128 {
        self.inner.timestamp
    }

    /// Name of the collection that raised the event.
    pub fn originator(&self) -> &str {
        &self.inner.originator
    }
}

impl Debug for CollectionEventInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventInfo")
            .field("item", &self.inner.item)
            .field("event_type", &self.inner.event_type)
            .field("timestamp", &self.inner.timestamp)
            .field("originator", &self.inner.originator)
            .finish()
    }
}

struct CollectionEventInner {
    item: Option<Value>,
    event_type: CollectionEvents,
    timestamp: u128,
    originator: String,
}

pub trait CollectionEventCallback: Send + Sync + Fn(CollectionEventInfo) -> DocDbResult<()> {}

impl<F> CollectionEventCallback for F where
    F: Send + Sync + Fn(CollectionEventInfo) -> DocDbResult<()>
{
}

/// A listener built from a closure.
///
/// ```ignore
/// collection.subscribe(CollectionEventListener::new(|event| {
///     if event.event_type() == CollectionEvents::Insert {
///         println!("inserted into {}", event.originator());
///     }
///     Ok(())
/// }))?;
/// ```
#[derive(Clone)]
pub struct CollectionEventListener {
    on_event: Arc<dyn CollectionEventCallback>,
}

impl CollectionEventListener {
    pub fn new(on_event: impl CollectionEventCallback + 'static) -> Self {
        CollectionEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl EventHandler<CollectionEventInfo> for CollectionEventListener {
    fn handle(&self, event: &CollectionEventInfo) -> DocDbResult<()> {
        (self.on_event)(event.clone())
    }
}

impl Debug for CollectionEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionEventListener").finish()
    }
}
