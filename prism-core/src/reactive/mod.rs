//! Reactive Primitives
//!
//! This module implements the two observable-value primitives that connect
//! imperative mutation to observer-driven re-render.
//!
//! # Concepts
//!
//! ## Single-Value Observables
//!
//! A [`Reactive`] wraps one value. Every assignment through [`Reactive::set`]
//! replaces the value and then invokes each registered subscriber with the
//! `(new, old)` pair, synchronously and in registration order.
//!
//! ## Flattened Observables
//!
//! A [`FlatReactive`] wraps an existing record in place, making each of its
//! fields an independently observable slot. Fields keep their original names
//! and types; subscribers register under a single field and are never
//! invoked for writes to other fields.
//!
//! # Implementation Notes
//!
//! Rust has no transparent assignment interception, so every write path
//! routes through the observables' setter surface (`set`/`update`). Reads
//! are offered both as clones (`get`) and as borrows (`with`).
//!
//! Subscribers are `Arc`-held callbacks; the `Arc` pointer is the
//! subscriber's identity. Registering the same handle twice is a no-op, and
//! the handle is the token required to unsubscribe.
//!
//! Notification takes a snapshot of the subscriber list and releases every
//! internal lock before invoking callbacks. A callback may therefore
//! subscribe, unsubscribe, or assign again from inside a fan-out; there is
//! no guard against unbounded recursion from a callback that keeps
//! re-triggering the assignment that invoked it.

mod record;
mod subscriber;
mod value;

pub use record::{Field, FlatReactive, Record};
pub use subscriber::{subscriber, Subscriber};
pub use value::Reactive;
