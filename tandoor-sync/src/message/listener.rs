//! Listener registry shared by bus channels and per-table session feeds

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Callback registered on a channel
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slots<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

/// Ordered set of listeners
///
/// Dispatch works on a snapshot taken before the first listener runs, so a
/// listener may subscribe, unsubscribe or publish without deadlocking. Those
/// changes take effect from the next dispatch.
pub struct ListenerSet<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T> Clone for ListenerSet<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T: 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl<T: 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a listener after the existing ones
    pub fn add<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut slots = self.slots.lock();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Slots<T>>> = Arc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = weak.upgrade() {
                slots.lock().entries.retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Listener<T>> {
        self.slots
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Invoke every listener in registration order
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn dispatch(&self, channel: &str, value: &T) -> DispatchReport {
        let mut report = DispatchReport::default();
        for listener in self.snapshot() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(value))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.failed += 1;
                    tracing::error!(
                        channel = %channel,
                        panic = %panic_message(payload.as_ref()),
                        "Listener panicked, continuing delivery"
                    );
                }
            }
        }
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// De-registration handle
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
