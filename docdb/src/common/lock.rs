use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// A handle to one collection lock.
///
/// Clones share the same underlying lock. A handle created with
/// [`LockHandle::new`] is private to its owner and never shared through a
/// registry.
#[derive(Clone)]
pub struct LockHandle {
    lock: Arc<RwLock<()>>,
}

impl LockHandle {
    /// Creates a new, unshared lock handle.
    pub fn new() -> Self {
        LockHandle {
            lock: Arc::new(RwLock::new(())),
        }
    }

    /// Acquires a shared read lock, blocking until no writer holds it.
    pub fn read(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }

    /// Acquires the exclusive write lock, blocking until all readers and writers release it.
    pub fn write(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    /// Returns `true` if both handles guard the same lock.
    pub fn same_lock(&self, other: &LockHandle) -> bool {
        Arc::ptr_eq(&self.lock, &other.lock)
    }
}

impl Default for LockHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of per-collection read-write locks.
///
/// One registry is owned by each database configuration. Every live
/// collection handle opened against a name receives the same lock, so
/// writers on that name are serialized and readers only run in parallel
/// with other readers.
///
/// Locks are `parking_lot` locks and are not reentrant. A call path that
/// holds the write guard must not try to take the read guard again; it
/// reaches the engine directly instead.
///
/// # Examples
///
/// ```
/// use docdb::common::LockRegistry;
/// let lock_registry = LockRegistry::new();
/// let handle = lock_registry.get_lock("users");
/// {
///     let _read_guard = handle.read();
/// }
/// {
///     let _write_guard = handle.write();
/// }
/// ```
#[derive(Clone)]
pub struct LockRegistry {
    locks: Arc<RwLock<HashMap<String, LockHandle>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        LockRegistry {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Gets the lock for `name`, creating it on first use.
    pub fn get_lock(&self, name: &str) -> LockHandle {
        if let Some(handle) = self.locks.read().get(name) {
            return handle.clone();
        }

        let mut locks = self.locks.write();
        locks
            .entry(name.to_string())
            .or_insert_with(LockHandle::new)
            .clone()
    }

    /// Removes the lock for `name`. Handles already given out keep working.
    pub fn remove_lock(&self, name: &str) -> bool {
        self.locks.write().remove(name).is_some()
    }

    pub fn lock_count(&self) -> usize {
        self.locks.read().len()
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
