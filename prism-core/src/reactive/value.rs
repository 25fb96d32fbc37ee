//! Single-Value Observable
//!
//! A [`Reactive`] wraps one value and notifies registered subscribers on
//! every assignment to it.
//!
//! # How Assignment Works
//!
//! 1. [`set`](Reactive::set) stores the new value while holding the value
//!    lock, remembering the previous value.
//!
//! 2. With all locks released, every subscriber is invoked with the
//!    `(new, old)` pair, in registration order. The call to `set` does not
//!    return until the last subscriber has run.
//!
//! 3. [`force_update`](Reactive::force_update) runs the same fan-out with
//!    `new == old == current`, re-triggering dependents without a change.
//!
//! # Handles
//!
//! `Reactive` is a cheap `Clone` handle over shared state. Clones observe
//! and mutate the same slot, which is what lets a subscriber hold its own
//! handle and assign through it from inside a fan-out. Such re-entrant
//! assignment nests the notification chain and is not guarded against
//! unbounded recursion.
//!
//! # Failure Behavior
//!
//! A panicking subscriber interrupts the fan-out: later subscribers in that
//! batch do not run, and the panic propagates to the caller of `set`. The
//! observable itself stays usable if the caller catches the unwind.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::subscriber::{Subscriber, SubscriberList};

/// An observable single-value slot.
///
/// # Type Parameters
///
/// - `T`: the wrapped value type. Must be Clone + Send + Sync.
///
/// # Example
///
/// ```rust,ignore
/// let count = Reactive::new(0);
///
/// let log = subscriber(|new: &i32, old: &i32| println!("{old} -> {new}"));
/// count.subscribe_to_value_change(&log);
///
/// count.set(5); // log runs with (5, 0)
/// ```
pub struct Reactive<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// The current value. The lock is never held while subscribers run.
    value: Arc<RwLock<T>>,

    /// Registered subscribers, in registration order.
    subscribers: Arc<SubscriberList<T>>,
}

impl<T> Reactive<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new observable with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            subscribers: Arc::new(SubscriberList::new()),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Call a closure with a borrow of the current value.
    ///
    /// Useful when the value is expensive to clone. The value lock is held
    /// for the duration of the closure, so do not assign from inside it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.read())
    }

    /// Assign a new value and notify every subscriber with `(new, old)`.
    ///
    /// The stored value is replaced before the first subscriber runs, so
    /// reads from inside a callback observe the new value.
    pub fn set(&self, value: T) {
        let old = {
            let mut slot = self.value.write();
            std::mem::replace(&mut *slot, value.clone())
        };
        self.notify(&value, &old);
    }

    /// Update the value using a function of the current value.
    ///
    /// Routed through [`set`](Self::set), so subscribers are notified.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new = {
            let slot = self.value.read();
            f(&*slot)
        };
        self.set(new);
    }

    /// Register `subscriber` unless the same handle is already registered.
    pub fn subscribe_to_value_change(&self, subscriber: &Subscriber<T>) {
        self.subscribers.add(subscriber);
    }

    /// Remove `subscriber`; no-op if the handle is not registered.
    pub fn unsubscribe_from_value_change(&self, subscriber: &Subscriber<T>) {
        self.subscribers.remove(subscriber);
    }

    /// Notify every subscriber with the current value as both new and old.
    ///
    /// Forces dependents to re-evaluate without an actual change. Zero
    /// subscribers means zero invocations.
    pub fn force_update(&self) {
        let current = self.value.read().clone();
        self.notify(&current, &current);
    }

    /// Register a no-argument callback, invoked on every assignment.
    ///
    /// This is the shape a UI binding subscribes for re-render: the callback
    /// ignores the value pair. The returned handle is the token needed by
    /// [`unsubscribe_from_value_change`](Self::unsubscribe_from_value_change)
    /// when the component unmounts.
    pub fn watch<F>(&self, callback: F) -> Subscriber<T>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let subscriber: Subscriber<T> = Arc::new(move |_new: &T, _old: &T| callback());
        self.subscribe_to_value_change(&subscriber);
        subscriber
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&self, new: &T, old: &T) {
        let snapshot = self.subscribers.snapshot();
        trace!(subscribers = snapshot.len(), "notifying value change");
        for subscriber in snapshot {
            subscriber(new, old);
        }
    }
}

impl<T> Clone for Reactive<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Reactive<T>
where
    T: Default + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Reactive<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactive")
            .field("value", &self.get())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::subscriber::subscriber;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recorder() -> (Subscriber<i32>, Arc<Mutex<Vec<(i32, i32)>>>) {
        let pairs = Arc::new(Mutex::new(Vec::new()));
        let handle = {
            let pairs = pairs.clone();
            subscriber(move |new: &i32, old: &i32| {
                pairs.lock().unwrap().push((*new, *old));
            })
        };
        (handle, pairs)
    }

    #[test]
    fn set_and_get() {
        let value = Reactive::new(0);
        assert_eq!(value.get(), 0);

        value.set(42);
        assert_eq!(value.get(), 42);
    }

    #[test]
    fn notifies_with_new_and_old_pair() {
        let value = Reactive::new(10);
        let (handle, pairs) = recorder();
        value.subscribe_to_value_change(&handle);

        value.set(20);
        value.set(30);

        assert_eq!(*pairs.lock().unwrap(), [(20, 10), (30, 20)]);
    }

    #[test]
    fn duplicate_subscription_notifies_once() {
        let value = Reactive::new(0);
        let (handle, pairs) = recorder();
        value.subscribe_to_value_change(&handle);
        value.subscribe_to_value_change(&handle);

        value.set(1);
        assert_eq!(pairs.lock().unwrap().len(), 1);
        assert_eq!(value.subscriber_count(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let value = Reactive::new(0);
        let (handle, pairs) = recorder();
        value.subscribe_to_value_change(&handle);

        value.set(1);
        value.unsubscribe_from_value_change(&handle);
        value.set(2);

        assert_eq!(*pairs.lock().unwrap(), [(1, 0)]);
    }

    #[test]
    fn unsubscribing_an_unknown_handle_is_a_noop() {
        let value = Reactive::new(0);
        let (registered, pairs) = recorder();
        let (stranger, _) = recorder();
        value.subscribe_to_value_change(&registered);

        value.unsubscribe_from_value_change(&stranger);
        value.set(1);

        assert_eq!(*pairs.lock().unwrap(), [(1, 0)]);
    }

    #[test]
    fn force_update_passes_current_value_twice() {
        let value = Reactive::new(7);
        let (handle, pairs) = recorder();
        value.subscribe_to_value_change(&handle);

        value.force_update();
        assert_eq!(*pairs.lock().unwrap(), [(7, 7)]);
    }

    #[test]
    fn force_update_without_subscribers_does_nothing() {
        let value = Reactive::new(7);
        value.force_update();
        assert_eq!(value.get(), 7);
    }

    #[test]
    fn update_maps_the_current_value() {
        let value = Reactive::new(10);
        let (handle, pairs) = recorder();
        value.subscribe_to_value_change(&handle);

        value.update(|v| v + 5);

        assert_eq!(value.get(), 15);
        assert_eq!(*pairs.lock().unwrap(), [(15, 10)]);
    }

    #[test]
    fn clones_share_state() {
        let value = Reactive::new(0);
        let alias = value.clone();
        let (handle, pairs) = recorder();
        value.subscribe_to_value_change(&handle);

        alias.set(9);

        assert_eq!(value.get(), 9);
        assert_eq!(*pairs.lock().unwrap(), [(9, 0)]);
    }

    #[test]
    fn watch_fires_until_unsubscribed() {
        let value = Reactive::new(String::from("draft"));
        let renders = Arc::new(AtomicUsize::new(0));
        let binding = {
            let renders = renders.clone();
            value.watch(move || {
                renders.fetch_add(1, Ordering::SeqCst);
            })
        };

        value.set("review".into());
        value.force_update();
        assert_eq!(renders.load(Ordering::SeqCst), 2);

        value.unsubscribe_from_value_change(&binding);
        value.set("final".into());
        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn with_borrows_without_cloning() {
        let value = Reactive::new(vec![1, 2, 3]);
        let sum: i32 = value.with(|v| v.iter().sum());
        assert_eq!(sum, 6);
    }
}
