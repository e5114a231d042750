//! All-or-nothing lock sets over stored records.
//!
//! An operation names every record it will read-then-write up front. Either the
//! whole set is granted or the caller waits; a partial set is never held, so two
//! operations cannot deadlock on each other. Keys are kept sorted, which keeps
//! logs and diagnostics deterministic.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

use wareflow_catalog::EntityKind;

use crate::store::RecordKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Record(RecordKey),
    /// Name uniqueness across every record of one master-data kind.
    Names(EntityKind),
}

impl From<RecordKey> for LockKey {
    fn from(value: RecordKey) -> Self {
        LockKey::Record(value)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("timed out after {waited:?} waiting for {keys} lock(s)")]
    Timeout { keys: usize, waited: Duration },

    #[error("lock table poisoned")]
    Poisoned,
}

#[derive(Debug)]
pub struct LockManager {
    held: Mutex<BTreeSet<LockKey>>,
    released: Condvar,
    timeout: Duration,
}

impl LockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(BTreeSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Acquire every key or none of them.
    pub fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> Result<LockGuard<'_>, LockError> {
        let wanted: BTreeSet<LockKey> = keys.into_iter().collect();
        let started = Instant::now();
        let deadline = started + self.timeout;

        let mut held = self.held.lock().map_err(|_| LockError::Poisoned)?;
        loop {
            if held.is_disjoint(&wanted) {
                held.extend(wanted.iter().copied());
                tracing::trace!(keys = wanted.len(), waited_ms = started.elapsed().as_millis() as u64, "locks granted");
                return Ok(LockGuard {
                    manager: self,
                    keys: wanted,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(keys = wanted.len(), "lock acquisition timed out");
                return Err(LockError::Timeout {
                    keys: wanted.len(),
                    waited: started.elapsed(),
                });
            }
            let (next, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| LockError::Poisoned)?;
            held = next;
        }
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().map(|h| h.len()).unwrap_or(0)
    }
}

/// Releases its keys when dropped.
#[derive(Debug)]
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    keys: BTreeSet<LockKey>,
}

impl LockGuard<'_> {
    pub fn keys(&self) -> impl Iterator<Item = &LockKey> {
        self.keys.iter()
    }

    pub fn covers(&self, key: &LockKey) -> bool {
        self.keys.contains(key)
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .manager
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.manager.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wareflow_storage::ZoneId;

    fn zone_key() -> LockKey {
        RecordKey::Zone(ZoneId::generate()).into()
    }

    #[test]
    fn overlapping_sets_wait_for_release() {
        let manager = LockManager::new(Duration::from_millis(20));
        let a = zone_key();
        let b = zone_key();

        let guard = manager.acquire([a, b]).unwrap();
        assert_eq!(manager.held_count(), 2);

        let err = manager.acquire([b]).unwrap_err();
        assert!(matches!(err, LockError::Timeout { keys: 1, .. }));

        drop(guard);
        assert_eq!(manager.held_count(), 0);
        assert!(manager.acquire([b]).is_ok());
    }

    #[test]
    fn disjoint_sets_do_not_block() {
        let manager = LockManager::new(Duration::from_millis(20));
        let _first = manager.acquire([zone_key()]).unwrap();
        let second = manager.acquire([zone_key(), zone_key()]).unwrap();
        assert_eq!(second.keys().count(), 2);
        assert_eq!(manager.held_count(), 3);
    }

    #[test]
    fn waiter_is_granted_after_holder_releases() {
        let manager = Arc::new(LockManager::new(Duration::from_secs(2)));
        let key = zone_key();
        let guard = manager.acquire([key]).unwrap();

        let waiter = {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || manager.acquire([key]).map(|g| g.covers(&key)))
        };
        std::thread::sleep(Duration::from_millis(30));
        drop(guard);

        assert_eq!(waiter.join().unwrap(), Ok(true));
    }
}
