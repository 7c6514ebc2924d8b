use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::collection::CollectionEventListener;
use crate::common::EVENT_WORKER_PREFIX;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};

/// Handles events of type `E` delivered by a [`DocDbEventBus`].
pub trait EventHandler<E>: Send + Sync {
    fn handle(&self, event: &E) -> DocDbResult<()>;
}

pub trait EventAware {
    fn subscribe(&self, listener: CollectionEventListener) -> DocDbResult<SubscriberRef>;

    fn unsubscribe(&self, subscriber: SubscriberRef) -> DocDbResult<()>;
}

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberRef {
    id: u64,
}

impl SubscriberRef {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Fans events out to registered listeners.
///
/// Every listener owns a queue and a worker thread. `post` enqueues one copy
/// of the event per listener and returns without waiting for delivery, so
/// each listener sees events in post order but nothing orders delivery
/// between listeners. A failing listener is logged and keeps receiving
/// events.
///
/// `deregister` and `close` shut the affected queues and wait for their
/// workers to drain what was already posted.
///
/// # Example
///
/// ```ignore
/// let event_bus: DocDbEventBus<CollectionEventInfo, CollectionEventListener> =
///     DocDbEventBus::new(None);
/// let subscriber = event_bus.register(listener)?;
/// event_bus.post(event)?;
/// event_bus.deregister(subscriber)?;
/// event_bus.close()?;
/// ```
pub struct DocDbEventBus<E, L> {
    inner: Arc<EventBusInner<E, L>>,
}

impl<E, L> Clone for DocDbEventBus<E, L> {
    fn clone(&self) -> Self {
        DocDbEventBus {
            inner: self.inner.clone(),
        }
    }
}

impl<E, L> DocDbEventBus<E, L>
where
    E: Clone + Send + 'static,
    L: EventHandler<E> + 'static,
{
    /// Creates a bus whose listener queues hold at most `queue_capacity`
    /// pending events, or any number when `None`.
    pub fn new(queue_capacity: Option<usize>) -> Self {
        DocDbEventBus {
            inner: Arc::new(EventBusInner {
                subscribers: Mutex::new(IndexMap::new()),
                next_id: AtomicU64::new(1),
                queue_capacity,
                closed: AtomicBool::new(false),
                phantom: PhantomData,
            }),
        }
    }

    pub fn register(&self, listener: L) -> DocDbResult<SubscriberRef> {
        self.inner.register(listener)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> DocDbResult<()> {
        self.inner.deregister(subscriber)
    }

    pub fn post(&self, event: E) -> DocDbResult<()> {
        self.inner.post(event)
    }

    pub fn close(&self) -> DocDbResult<()> {
        self.inner.close()
    }

    pub fn has_listeners(&self) -> bool {
        !self.inner.subscribers.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

struct Subscriber<E> {
    sender: Sender<E>,
    worker: JoinHandle<()>,
}

struct EventBusInner<E, L> {
    subscribers: Mutex<IndexMap<u64, Subscriber<E>>>,
    next_id: AtomicU64,
    queue_capacity: Option<usize>,
    closed: AtomicBool,
    phantom: PhantomData<fn(L)>,
}

impl<E, L> EventBusInner<E, L>
where
    E: Clone + Send + 'static,
    L: EventHandler<E> + 'static,
{
    fn register(&self, listener: L) -> DocDbResult<SubscriberRef> {
        if self.closed.load(Ordering::Acquire) {
            log::error!("Cannot register a listener on a closed event bus");
            return Err(DocDbError::new(
                "event bus is closed",
                ErrorKind::EventError,
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = match self.queue_capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity),
            None => crossbeam_channel::unbounded(),
        };

        let worker = std::thread::Builder::new()
            .name(format!("{}-{}", EVENT_WORKER_PREFIX, id))
            .spawn(move || dispatch(listener, receiver))
            .map_err(|err| {
                log::error!("Failed to start event worker: {}", err);
                DocDbError::new(
                    &format!("failed to start event worker: {}", err),
                    ErrorKind::EventError,
                )
            })?;

        let subscriber = Subscriber { sender, worker };
        let mut subscribers = self.subscribers.lock();
        // close flips the flag before it drains, so a registration that
        // loses the race must stop its own worker
        if self.closed.load(Ordering::Acquire) {
            drop(subscribers);
            shutdown(subscriber);
            log::error!("Event bus closed while registering a listener");
            return Err(DocDbError::new(
                "event bus is closed",
                ErrorKind::EventError,
            ));
        }
        subscribers.insert(id, subscriber);
        Ok(SubscriberRef { id })
    }

    fn deregister(&self, subscriber: SubscriberRef) -> DocDbResult<()> {
        let removed = self.subscribers.lock().shift_remove(&subscriber.id);
        match removed {
            Some(subscriber) => {
                shutdown(subscriber);
                Ok(())
            }
            None => {
                log::debug!("Listener {} is not registered", subscriber.id);
                Ok(())
            }
        }
    }

    fn post(&self, event: E) -> DocDbResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        // senders are cloned so a slow bounded queue never blocks register/deregister
        let senders: Vec<(u64, Sender<E>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|(id, subscriber)| (*id, subscriber.sender.clone()))
            .collect();

        for (id, sender) in senders {
            if sender.send(event.clone()).is_err() {
                log::warn!("Listener {} stopped before the event was delivered", id);
            }
        }
        Ok(())
    }

    fn close(&self) -> DocDbResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let subscribers: Vec<Subscriber<E>> = self
            .subscribers
            .lock()
            .drain(..)
            .map(|(_, subscriber)| subscriber)
            .collect();

        for subscriber in subscribers {
            shutdown(subscriber);
        }
        Ok(())
    }
}

fn dispatch<E, L: EventHandler<E>>(listener: L, receiver: Receiver<E>) {
    for event in receiver.iter() {
        if let Err(err) = listener.handle(&event) {
            log::warn!("Event listener failed: {}", err);
        }
    }
}

fn shutdown<E>(subscriber: Subscriber<E>) {
    let Subscriber { sender, worker } = subscriber;
    drop(sender);

    // a listener may close its own bus from inside the callback
    if worker.thread().id() == std::thread::current().id() {
        return;
    }
    if worker.join().is_err() {
        log::error!("Event worker panicked while draining");
    }
}
