use crate::docdb::DocDb;
use crate::docdb_config::DocDbConfig;
use crate::errors::{DocDbError, DocDbResult, ErrorKind};

/// Builder for a [`DocDb`] instance.
///
/// Configuration errors are captured while building and reported by
/// [`open_or_create`](DocDbBuilder::open_or_create).
///
/// ```rust,ignore
/// let db = DocDb::builder()
///     .event_queue_capacity(1024)
///     .open_or_create()?;
/// ```
#[derive(Default)]
pub struct DocDbBuilder {
    error: Option<DocDbError>,
    event_queue_capacity: Option<usize>,
}

impl DocDbBuilder {
    pub fn new() -> Self {
        DocDbBuilder {
            error: None,
            event_queue_capacity: None,
        }
    }

    /// Bounds the queue of undelivered events held for each listener.
    ///
    /// The capacity must be at least 1. By default queues are unbounded.
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        if capacity == 0 {
            log::error!("Event queue capacity must be at least 1");
            self.error = Some(DocDbError::new(
                "event queue capacity must be at least 1",
                ErrorKind::ValidationError,
            ));
        } else {
            self.event_queue_capacity = Some(capacity);
        }
        self
    }

    pub fn open_or_create(self) -> DocDbResult<DocDb> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let config = DocDbConfig::with_event_queue_capacity(self.event_queue_capacity);
        log::debug!("Opening database with {:?}", config);
        Ok(DocDb::new(config))
    }
}
