//! Order-independent conversation identifier.

use std::fmt;

/// The unordered pair of participants of a one-to-one conversation.
///
/// `ConversationId::new(a, b) == ConversationId::new(b, a)` for every pair, so
/// both directions of a chat share one cache entry and one broker partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId {
    low: u64,
    high: u64,
}

impl ConversationId {
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    /// Stable partition index in `0..partitions`.
    pub fn partition(&self, partitions: u32) -> u32 {
        if partitions <= 1 {
            return 0;
        }
        let mixed = self
            .low
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .rotate_left(29)
            ^ self.high.wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        (mixed % partitions as u64) as u32
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}
