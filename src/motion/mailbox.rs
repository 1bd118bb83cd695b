//! # Single-Slot Mailbox
//!
//! Hand-off cell between the sampler and the actuation task.
//!
//! The mailbox holds at most one value. [`Mailbox::set`] overwrites whatever
//! is stored and wakes the consumer; [`Mailbox::take`] waits until a value is
//! present, then removes and returns it. A slow consumer therefore only ever
//! sees the freshest target and never works through a backlog.
//!
//! ```
//! use plotjog::motion::mailbox::Mailbox;
//!
//! # tokio_test::block_on(async {
//! let mailbox = Mailbox::new();
//! mailbox.set(1);
//! mailbox.set(2);
//! assert_eq!(mailbox.take().await, 2);
//! # });
//! ```

use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Overwrite-on-write single value channel with one consumer.
#[derive(Debug, Default)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Mailbox<T> {
    /// Creates an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Stores `value`, dropping any value that was not yet taken.
    ///
    /// Returns `true` if an unconsumed value was replaced.
    pub fn set(&self, value: T) -> bool {
        let replaced = self.lock().replace(value).is_some();
        // Stores a permit if the consumer is not waiting yet
        self.notify.notify_one();
        replaced
    }

    /// Waits for a value, then removes and returns it.
    ///
    /// Must only be called from a single consumer.
    pub async fn take(&self) -> T {
        loop {
            if let Some(value) = self.lock().take() {
                return value;
            }
            self.notify.notified().await;
        }
    }

    /// Removes and returns the stored value without waiting.
    pub fn try_take(&self) -> Option<T> {
        self.lock().take()
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // The slot is a plain Option, so a poisoned lock still holds a usable value
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
