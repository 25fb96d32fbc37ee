use std::sync::{Arc, Mutex};

use prism_core::reactive::{subscriber, Subscriber};

/// Build a subscriber that records every `(new, old)` pair, plus a checker
/// that drains what was recorded so far.
#[allow(unused)]
pub fn pair_watcher<T>() -> (Subscriber<T>, Box<dyn Fn() -> Vec<(T, T)>>)
where
    T: Clone + Send + Sync + 'static,
{
    let pairs = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let pairs = pairs.clone();
        subscriber(move |new: &T, old: &T| {
            pairs.lock().unwrap().push((new.clone(), old.clone()));
        })
    };

    let check = Box::new(move || {
        let drained: Vec<(T, T)> = pairs.lock().unwrap().drain(..).collect();
        drained
    });

    (watcher, check)
}

#[allow(unused)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
