use std::sync::Mutex;

use crate::item::Item;
use crate::queue::Snapshot;

/// Something that happened to an item, reported to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// The consumer is up and about to wait for its first item.
    Ready,
    /// The item was placed in the queue.
    Produced { item: Item, snapshot: Snapshot },
    /// The item left the queue and is now owned by the consumer.
    Released { item: Item, snapshot: Snapshot },
    /// The consumer finished working on the item.
    Processed { item: Item },
}

/// Receives events from both tasks.
///
/// Called from the producer and the consumer threads concurrently, but never
/// while the queue lock is held.
pub trait Observer: Sync {
    fn observe(&self, event: Event);
}

impl<O: Observer + ?Sized> Observer for &O {
    fn observe(&self, event: Event) {
        (**self).observe(event)
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Observer for Silent {
    fn observe(&self, _event: Event) {}
}

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.0.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl Observer for Recorder {
    fn observe(&self, event: Event) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

/// Renders the slot bar, e.g. `[# # . . .] (2/5)`.
pub fn render_slots(snapshot: Snapshot) -> String {
    let Snapshot {
        occupied, capacity, ..
    } = snapshot;
    let slots = (0..capacity)
        .map(|i| if i < occupied { "#" } else { "." })
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{slots}] ({occupied}/{capacity})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_bar() {
        let snapshot = |occupied, capacity| Snapshot {
            occupied,
            capacity,
            version: 1,
        };
        assert_eq!(render_slots(snapshot(2, 5)), "[# # . . .] (2/5)");
        assert_eq!(render_slots(snapshot(0, 1)), "[.] (0/1)");
        assert_eq!(render_slots(snapshot(3, 3)), "[# # #] (3/3)");
    }
}
