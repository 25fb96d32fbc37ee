//! Prism Core
//!
//! This crate provides the observable-value core for the Prism reactive UI
//! layer. It implements:
//!
//! - A single-value observable that notifies subscribers on every assignment
//! - A flattened multi-field observable that turns each field of an existing
//!   record into an independently observable slot
//!
//! The UI binding (subscribing a re-render callback on mount, unsubscribing
//! on unmount) lives outside this crate and consumes the API defined here.
//!
//! # Architecture
//!
//! Everything lives in a single module:
//!
//! - `reactive`: the two observable primitives and the subscriber handle type
//!
//! Both primitives share one pattern: a write routed through the observable's
//! setter surface replaces the stored value and then synchronously invokes
//! every registered subscriber with the `(new, old)` pair, in registration
//! order, before the setter returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use prism_core::reactive::{subscriber, Reactive};
//!
//! let count = Reactive::new(0);
//!
//! let log = subscriber(|new: &i32, old: &i32| {
//!     println!("count: {old} -> {new}");
//! });
//! count.subscribe_to_value_change(&log);
//!
//! count.set(5);
//! // prints: count: 0 -> 5
//!
//! count.unsubscribe_from_value_change(&log);
//! ```

pub mod reactive;
