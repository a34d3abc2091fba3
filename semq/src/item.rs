use std::fmt;
use std::num::NonZeroU64;

/// Tricks a skater may announce when entering the queue.
pub const TRICKS: &[&str] = &[
    "Handplant (Invert)",
    "McTwist",
    "Method Air",
    "Kickflip Indy",
    "Backside Mute 900",
];

/// One unit of work flowing from the producer to the consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item {
    sequence_id: NonZeroU64,
    payload: &'static str,
}

impl Item {
    pub const fn new(sequence_id: NonZeroU64, payload: &'static str) -> Self {
        Self {
            sequence_id,
            payload,
        }
    }

    pub const fn sequence_id(&self) -> u64 {
        self.sequence_id.get()
    }

    pub const fn payload(&self) -> &'static str {
        self.payload
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02} ({})", self.sequence_id, self.payload)
    }
}
