//! Flattened Multi-Field Observable
//!
//! A [`FlatReactive`] wraps an existing record in place, turning each of its
//! fields into an independently observable slot. The record keeps its own
//! field names and types; what changes is that writes route through
//! [`set`](FlatReactive::set) and notify only the subscribers registered
//! under the written field.
//!
//! # Declaring Observable Fields
//!
//! The set of observable field names is fixed when the record type is
//! declared, not probed at runtime. [`observable_fields!`] generates one
//! zero-sized marker type per field; the marker carries the field's name and
//! typed accessors via the [`Field`] trait:
//!
//! ```rust,ignore
//! struct Document {
//!     title: String,
//!     revision: u32,
//! }
//!
//! observable_fields!(Document {
//!     title: String => Title,
//!     revision: u32 => Revision,
//! });
//!
//! let doc = FlatReactive::wrap(Document { title: "untitled".into(), revision: 0 });
//! doc.subscribe_to_key_value_change(Title, &on_title);
//! doc.set(Title, "draft".into()); // on_title runs with ("draft", "untitled")
//! doc.set(Revision, 1);           // on_title stays silent
//! ```
//!
//! Only marker types generated from the record's own fields implement
//! [`Field`], so nothing but the original fields can be addressed or
//! observed. The subscriber map and the management methods themselves are
//! not assignable surfaces.
//!
//! # Subscriber Map
//!
//! Per-key subscriber lists are created lazily on first subscription, and a
//! key whose last subscriber unsubscribes is dropped from the map again. A
//! field nobody subscribed to costs nothing to assign beyond the field write
//! itself.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::trace;

use super::subscriber::{handle_identity, Subscriber};

/// A record whose fields have been declared observable.
///
/// Implemented by [`observable_fields!`]; the field-name list is the finite
/// key set captured at declaration time.
pub trait Record: Send + Sync + 'static {
    /// Names of the observable fields, in declaration order.
    fn field_names() -> &'static [&'static str];
}

/// A typed accessor for one observable field of `R`.
///
/// Implementors are the zero-sized marker types generated by
/// [`observable_fields!`]. Passing the marker to [`FlatReactive`] methods
/// selects the field both by name (the subscriber-map key) and by type.
pub trait Field<R: Record>: Copy + Send + Sync + 'static {
    /// The field's value type.
    type Value: Clone + Send + Sync + 'static;

    /// The field's name, used as the subscriber-map key.
    fn name(self) -> &'static str;

    /// Borrow the field from the record.
    fn get(self, record: &R) -> &Self::Value;

    /// Mutably borrow the field from the record.
    fn get_mut(self, record: &mut R) -> &mut Self::Value;
}

/// Declare the observable fields of an existing struct.
///
/// Generates one marker type per listed field, a [`Field`] impl for each
/// marker, and the [`Record`] impl naming the full field set. Fields not
/// listed stay plain: they cannot be addressed through the observable at
/// all.
#[macro_export]
macro_rules! observable_fields {
    ($record:ty { $( $field:ident : $value:ty => $marker:ident ),+ $(,)? }) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $marker;

            impl $crate::reactive::Field<$record> for $marker {
                type Value = $value;

                fn name(self) -> &'static str {
                    stringify!($field)
                }

                fn get(self, record: &$record) -> &$value {
                    &record.$field
                }

                fn get_mut(self, record: &mut $record) -> &mut $value {
                    &mut record.$field
                }
            }
        )+

        impl $crate::reactive::Record for $record {
            fn field_names() -> &'static [&'static str] {
                &[$( stringify!($field) ),+]
            }
        }
    };
}

type KeyEntries<R> = SmallVec<[KeyEntry<R>; 2]>;

/// One registered subscriber under one key.
///
/// `callback` holds the typed handle, type-erased; the call sites that fire
/// it (`set`, `force_key_update`) know the field type statically and recover
/// it by downcast. `force` is pre-bound to the field accessor so the global
/// force-update can fire without knowing the field's type.
struct KeyEntry<R>
where
    R: Record,
{
    identity: usize,
    callback: Box<dyn Any + Send + Sync>,
    force: Arc<dyn Fn(&RwLock<R>) + Send + Sync>,
}

impl<R> KeyEntry<R>
where
    R: Record,
{
    fn new<F>(field: F, subscriber: &Subscriber<F::Value>) -> Self
    where
        F: Field<R>,
    {
        let force = {
            let subscriber = Arc::clone(subscriber);
            move |record: &RwLock<R>| {
                let current = field.get(&*record.read()).clone();
                subscriber(&current, &current);
            }
        };
        Self {
            identity: handle_identity(subscriber),
            callback: Box::new(Arc::clone(subscriber)),
            force: Arc::new(force),
        }
    }

    fn typed<V>(&self) -> Option<Subscriber<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.callback.downcast_ref::<Subscriber<V>>().cloned()
    }
}

/// An existing record augmented in place with per-field observability.
///
/// `FlatReactive` is a cheap `Clone` handle over shared state, like
/// [`Reactive`](super::Reactive). Assignment to one field notifies exactly
/// that field's subscribers with the field's `(new, old)` pair; subscribers
/// under other keys never run.
pub struct FlatReactive<R>
where
    R: Record,
{
    /// The wrapped record. The lock is never held while subscribers run.
    record: Arc<RwLock<R>>,

    /// Per-key subscriber lists, keyed lazily on first subscription.
    subscribers: Arc<Mutex<IndexMap<&'static str, KeyEntries<R>>>>,
}

impl<R> FlatReactive<R>
where
    R: Record,
{
    /// Take ownership of `record` and augment it with the subscriber map.
    ///
    /// The record is moved, not copied. Its fields are read through
    /// [`get`](Self::get)/[`with`](Self::with) and written through
    /// [`set`](Self::set)/[`update`](Self::update).
    pub fn wrap(record: R) -> Self {
        Self {
            record: Arc::new(RwLock::new(record)),
            subscribers: Arc::new(Mutex::new(IndexMap::with_capacity(R::field_names().len()))),
        }
    }

    /// Get a clone of one field's current value.
    pub fn get<F>(&self, field: F) -> F::Value
    where
        F: Field<R>,
    {
        field.get(&*self.record.read()).clone()
    }

    /// Call a closure with a borrow of the whole record.
    ///
    /// All fields are readable directly, by their original names. The record
    /// lock is held for the duration of the closure, so do not assign from
    /// inside it.
    pub fn with<Ret>(&self, f: impl FnOnce(&R) -> Ret) -> Ret {
        f(&*self.record.read())
    }

    /// Assign `value` to `field` and notify that field's subscribers with
    /// `(new, old)`, in registration order.
    ///
    /// Subscribers under every other key stay silent. The field is written
    /// before the first subscriber runs.
    pub fn set<F>(&self, field: F, value: F::Value)
    where
        F: Field<R>,
    {
        let old = {
            let mut record = self.record.write();
            std::mem::replace(field.get_mut(&mut record), value.clone())
        };
        let snapshot = self.key_snapshot::<F::Value>(field.name());
        if snapshot.is_empty() {
            return;
        }
        trace!(key = field.name(), subscribers = snapshot.len(), "notifying field change");
        for subscriber in snapshot {
            subscriber(&value, &old);
        }
    }

    /// Update one field using a function of its current value.
    ///
    /// Routed through [`set`](Self::set), so subscribers are notified.
    pub fn update<F, U>(&self, field: F, f: U)
    where
        F: Field<R>,
        U: FnOnce(&F::Value) -> F::Value,
    {
        let new = {
            let record = self.record.read();
            f(field.get(&*record))
        };
        self.set(field, new);
    }

    /// Register `subscriber` under `field`, creating the key's list if this
    /// is its first subscriber.
    ///
    /// A handle already registered under this key is ignored; the same
    /// handle may be registered independently under other keys.
    pub fn subscribe_to_key_value_change<F>(&self, field: F, subscriber: &Subscriber<F::Value>)
    where
        F: Field<R>,
    {
        let mut map = self.subscribers.lock();
        let entries = map.entry(field.name()).or_default();
        if entries
            .iter()
            .any(|entry| entry.identity == handle_identity(subscriber))
        {
            return;
        }
        entries.push(KeyEntry::new(field, subscriber));
    }

    /// Remove `subscriber` from `field`'s list; no-op if the key has no list
    /// or the handle is absent.
    ///
    /// Dropping the last subscriber removes the key from the map entirely.
    pub fn unsubscribe_to_key_value_change<F>(&self, field: F, subscriber: &Subscriber<F::Value>)
    where
        F: Field<R>,
    {
        let mut map = self.subscribers.lock();
        let mut emptied = false;
        if let Some(entries) = map.get_mut(field.name()) {
            if let Some(index) = entries
                .iter()
                .position(|entry| entry.identity == handle_identity(subscriber))
            {
                entries.remove(index);
            }
            emptied = entries.is_empty();
        }
        if emptied {
            map.shift_remove(field.name());
        }
    }

    /// Notify `field`'s subscribers with the current value as both new and
    /// old. No-op if the field has no subscribers.
    pub fn force_key_update<F>(&self, field: F)
    where
        F: Field<R>,
    {
        let snapshot = self.key_snapshot::<F::Value>(field.name());
        if snapshot.is_empty() {
            return;
        }
        let current = self.get(field);
        for subscriber in snapshot {
            subscriber(&current, &current);
        }
    }

    /// For every key that currently has at least one subscriber, notify all
    /// of that key's subscribers with `(current, current)`.
    ///
    /// Order across keys is unspecified; within a key, registration order is
    /// preserved.
    pub fn force_global_update(&self) {
        let forces: Vec<Arc<dyn Fn(&RwLock<R>) + Send + Sync>> = {
            let map = self.subscribers.lock();
            map.values()
                .flat_map(|entries| entries.iter().map(|entry| Arc::clone(&entry.force)))
                .collect()
        };
        trace!(subscribers = forces.len(), "forcing global update");
        for force in forces {
            force(&self.record);
        }
    }

    /// Register a no-argument callback under `field`, invoked on every
    /// assignment to it.
    ///
    /// The re-render shape a UI binding subscribes; the returned handle is
    /// the token needed by
    /// [`unsubscribe_to_key_value_change`](Self::unsubscribe_to_key_value_change)
    /// on unmount.
    pub fn watch_key<F, C>(&self, field: F, callback: C) -> Subscriber<F::Value>
    where
        F: Field<R>,
        C: Fn() + Send + Sync + 'static,
    {
        let subscriber: Subscriber<F::Value> =
            Arc::new(move |_new: &F::Value, _old: &F::Value| callback());
        self.subscribe_to_key_value_change(field, &subscriber);
        subscriber
    }

    /// Get the number of subscribers registered under `field`.
    pub fn key_subscriber_count<F>(&self, field: F) -> usize
    where
        F: Field<R>,
    {
        self.subscribers
            .lock()
            .get(field.name())
            .map_or(0, |entries| entries.len())
    }

    /// Get the total number of subscribers across all keys.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .values()
            .map(|entries| entries.len())
            .sum()
    }

    fn key_snapshot<V>(&self, name: &str) -> Vec<Subscriber<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let map = self.subscribers.lock();
        match map.get(name) {
            Some(entries) => entries.iter().filter_map(|entry| entry.typed()).collect(),
            None => Vec::new(),
        }
    }
}

impl<R> Clone for FlatReactive<R>
where
    R: Record,
{
    fn clone(&self) -> Self {
        Self {
            record: Arc::clone(&self.record),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<R> Debug for FlatReactive<R>
where
    R: Record + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatReactive")
            .field("record", &*self.record.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
