//! Single-slot mailbox between the tracker thread and the UI.
//!
//! Holds at most one value. Posting overwrites whatever the UI has not read
//! yet, so the UI always sees the newest reading and never a backlog.

use std::sync::Mutex;

pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Stores `value`, replacing any unread one.
    pub fn post(&self, value: T) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(value);
        }
    }

    /// Removes and returns the newest value, if any.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}
