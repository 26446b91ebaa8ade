use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::body::Body;

/// Receives a body's placement changes.
///
/// Callbacks run synchronously on whichever thread moved the body (a caller
/// of `set_location`, or the body's integrator). No body lock is held, so an
/// observer may read or even mutate the body it observes.
pub trait BodyObserver: Send + Sync {
    fn body_translated(&self, body: &Body);
    fn body_rotated(&self, body: &Body);
}

/// Identity of an observer: the address of its allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverKey(usize);

impl ObserverKey {
    #[must_use]
    pub fn of(observer: &dyn BodyObserver) -> Self {
        Self(std::ptr::from_ref(observer).cast::<()>() as usize)
    }
}

struct Entry {
    key: ObserverKey,
    observer: Weak<dyn BodyObserver>,
}

pub(crate) type Snapshot = SmallVec<[Arc<dyn BodyObserver>; 4]>;

/// Identity-keyed set of weakly held observers.
#[derive(Default)]
pub(crate) struct ObserverSet {
    entries: Mutex<Vec<Entry>>,
}

impl ObserverSet {
    /// Returns `false` if the observer was already registered.
    pub(crate) fn insert<O: BodyObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        let key = ObserverKey::of(&**observer);
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.key == key) {
            return false;
        }
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn BodyObserver> = weak;
        entries.push(Entry {
            key,
            observer: weak,
        });
        true
    }

    pub(crate) fn remove(&self, key: ObserverKey) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.key != key);
        entries.len() != before
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Live observers at this instant. Entries whose observer was dropped
    /// without deregistering are pruned.
    pub(crate) fn snapshot(&self) -> Snapshot {
        let mut entries = self.entries.lock();
        let mut live = Snapshot::new();
        entries.retain(|e| match e.observer.upgrade() {
            Some(observer) => {
                live.push(observer);
                true
            }
            None => {
                log::debug!("Pruning dropped observer {:?}", e.key);
                false
            }
        });
        live
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("len", &self.len())
            .finish()
    }
}
