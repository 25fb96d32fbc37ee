//! Subscriber handles for the observable primitives.
//!
//! A subscriber is an `Arc`-held callback receiving the `(new, old)` pair of
//! an assignment. The `Arc` pointer doubles as the subscriber's identity:
//! duplicate registration of one handle is a no-op, and the same handle must
//! be presented to unsubscribe.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

/// Callback invoked with `(new_value, old_value)` after an assignment.
pub type Subscriber<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

/// Wrap a closure in the [`Subscriber`] handle type.
///
/// Keep the returned handle around: it is the identity used for
/// deduplication and the token required to unsubscribe later.
pub fn subscriber<T, F>(callback: F) -> Subscriber<T>
where
    T: 'static,
    F: Fn(&T, &T) + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Pointer identity of a subscriber handle.
///
/// Valid for comparison only while a strong reference is held; registered
/// entries keep their own clone, so a live entry's address cannot be reused.
pub(crate) fn handle_identity<T: ?Sized>(handle: &Arc<T>) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

/// An ordered subscriber list with pointer-identity deduplication.
///
/// Callers notify from a [`snapshot`](Self::snapshot) taken with the lock
/// released, so callbacks are free to re-enter `add`/`remove` mid-fan-out.
/// A callback added during a fan-out joins the next round; one removed
/// during a fan-out still runs in the current round.
pub(crate) struct SubscriberList<T>
where
    T: 'static,
{
    entries: Mutex<SmallVec<[Subscriber<T>; 2]>>,
}

impl<T> SubscriberList<T>
where
    T: 'static,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(SmallVec::new()),
        }
    }

    /// Append `subscriber` unless the same handle is already registered.
    pub fn add(&self, subscriber: &Subscriber<T>) {
        let mut entries = self.entries.lock();
        if entries
            .iter()
            .any(|existing| handle_identity(existing) == handle_identity(subscriber))
        {
            return;
        }
        entries.push(Arc::clone(subscriber));
    }

    /// Remove the entry sharing `subscriber`'s identity; no-op if absent.
    pub fn remove(&self, subscriber: &Subscriber<T>) {
        let mut entries = self.entries.lock();
        if let Some(index) = entries
            .iter()
            .position(|existing| handle_identity(existing) == handle_identity(subscriber))
        {
            entries.remove(index);
        }
    }

    /// Clone the current entries, in registration order.
    pub fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> Subscriber<i32> {
        let counter = counter.clone();
        subscriber(move |_: &i32, _: &i32| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn duplicate_handles_are_ignored() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = counting(&counter);

        let list = SubscriberList::new();
        list.add(&handle);
        list.add(&handle);

        assert_eq!(list.len(), 1);
        for entry in list.snapshot() {
            entry(&1, &0);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_handles_with_identical_closures_both_register() {
        let counter = Arc::new(AtomicUsize::new(0));
        let first = counting(&counter);
        let second = counting(&counter);

        let list = SubscriberList::new();
        list.add(&first);
        list.add(&second);

        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_is_a_noop_for_unknown_handles() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registered = counting(&counter);
        let stranger = counting(&counter);

        let list = SubscriberList::new();
        list.add(&registered);
        list.remove(&stranger);

        assert_eq!(list.len(), 1);
    }

    #[test]
    fn snapshot_preserves_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let list = SubscriberList::new();

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            list.add(&subscriber(move |_: &i32, _: &i32| order.lock().push(tag)));
        }

        for entry in list.snapshot() {
            entry(&0, &0);
        }
        assert_eq!(*order.lock(), ["first", "second", "third"]);
    }
}
