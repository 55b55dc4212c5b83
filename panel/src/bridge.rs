use std::sync::Mutex;

use tokio::sync::Notify;

/// Single-slot mailbox carrying broker events from the MQTT task onto the
/// presentation task. Publishing replaces any event not yet consumed
/// (last-write-wins) and schedules one consumer wakeup; neither side ever
/// blocks. This is deliberately not a queue.
pub struct EventBridge<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> Default for EventBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBridge<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Producer side, callable from any task. The slot mutex is held only
    /// for the assignment, so this never blocks meaningfully.
    pub fn publish(&self, event: T) {
        *self.lock_slot() = Some(event);
        self.notify.notify_one();
    }

    /// Consumer side: take and clear the pending event, if any. Call once
    /// per observed wakeup.
    pub fn drain(&self) -> Option<T> {
        self.lock_slot().take()
    }

    /// Resolves once a publish has happened since the last drain. The
    /// published event is visible to `drain` before this returns.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        // A poisoned slot only means a panic elsewhere mid-assignment; the
        // Option inside is still coherent.
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
