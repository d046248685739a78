//! Relay queue between the radio-notification context and the network side
//!
//! A bounded, lock-free, multi-producer/multi-consumer queue. Producers never
//! block: when the queue is full the message being pushed is discarded and the
//! caller is told so. Already-queued messages are never evicted, which keeps
//! each channel's delivered sequence numbers monotonic with visible gaps.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::Q64;

use crate::message::OutboundMessage;

/// Maximum number of messages held in the relay.
pub const RELAY_CAPACITY: usize = 64;

/// Returned when a push is rejected because the relay is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayFull;

impl fmt::Display for RelayFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relay queue full ({RELAY_CAPACITY} messages)")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RelayFull {}

#[cfg(feature = "defmt")]
impl defmt::Format for RelayFull {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Relay full");
    }
}

/// Counters since the relay was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Messages accepted by `push`
    pub accepted: u32,
    /// Messages rejected because the relay was full
    pub dropped: u32,
}

/// Lossy bounded message relay.
///
/// Designed to live in a `static` so both execution contexts can share it:
///
/// ```
/// use brainclaw_core::relay::RelayQueue;
///
/// static RELAY: RelayQueue = RelayQueue::new();
/// assert!(RELAY.pop().is_none());
/// ```
pub struct RelayQueue {
    queue: Q64<OutboundMessage>,
    accepted: AtomicU32,
    dropped: AtomicU32,
}

impl RelayQueue {
    /// Create an empty relay.
    pub const fn new() -> Self {
        Self {
            queue: Q64::new(),
            accepted: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a message without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`RelayFull`] and discards `message` if the relay already holds
    /// [`RELAY_CAPACITY`] messages.
    pub fn push(&self, message: OutboundMessage) -> Result<(), RelayFull> {
        if self.queue.enqueue(message).is_ok() {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            Ok(())
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            Err(RelayFull)
        }
    }

    /// Dequeue the oldest message without blocking.
    pub fn pop(&self) -> Option<OutboundMessage> {
        self.queue.dequeue()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayQueue {
    fn default() -> Self {
        Self::new()
    }
}
