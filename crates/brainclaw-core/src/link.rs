//! Link state shared between the notification and scheduling contexts
//!
//! Three flags, each with a small set of writers:
//!
//! | Flag | Set by | Cleared by |
//! |------|--------|------------|
//! | `radio_connected` | orchestrator (connect done) | radio disconnect callback |
//! | `transport_connected` | transport pump | transport pump |
//! | `streaming` | orchestrator (handshake done) | radio disconnect, transport disconnect, stop |

use core::sync::atomic::{AtomicBool, Ordering};

/// Point-in-time copy of the link flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    /// Peripheral connected
    pub radio_connected: bool,
    /// Network transport connected
    pub transport_connected: bool,
    /// Peripheral has been told to stream
    pub streaming: bool,
}

impl LinkSnapshot {
    /// Both links are up and no stream is running.
    #[inline]
    pub const fn should_start(self) -> bool {
        self.radio_connected && self.transport_connected && !self.streaming
    }
}

/// Atomic link flags.
pub struct LinkState {
    radio_connected: AtomicBool,
    transport_connected: AtomicBool,
    streaming: AtomicBool,
}

impl LinkState {
    /// All links down.
    pub const fn new() -> Self {
        Self {
            radio_connected: AtomicBool::new(false),
            transport_connected: AtomicBool::new(false),
            streaming: AtomicBool::new(false),
        }
    }

    /// Check if the peripheral is connected
    #[inline]
    pub fn radio_connected(&self) -> bool {
        self.radio_connected.load(Ordering::Acquire)
    }

    /// Check if the transport is connected
    #[inline]
    pub fn transport_connected(&self) -> bool {
        self.transport_connected.load(Ordering::Acquire)
    }

    /// Check if the peripheral is streaming
    #[inline]
    pub fn streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    /// Record a completed peripheral connection
    pub fn set_radio_connected(&self) {
        self.radio_connected.store(true, Ordering::Release);
    }

    /// Radio disconnect callback. Clears `streaming` along with the radio flag.
    pub fn on_radio_disconnected(&self) {
        self.streaming.store(false, Ordering::Release);
        self.radio_connected.store(false, Ordering::Release);
    }

    /// Set transport flag
    pub fn set_transport_connected(&self, connected: bool) {
        self.transport_connected.store(connected, Ordering::Release);
    }

    /// Set streaming flag
    pub fn set_streaming(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::Release);
    }

    /// Copy all three flags
    pub fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            radio_connected: self.radio_connected(),
            transport_connected: self.transport_connected(),
            streaming: self.streaming(),
        }
    }

    /// Shorthand for `snapshot().should_start()`
    pub fn should_start(&self) -> bool {
        self.snapshot().should_start()
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let link = LinkState::new();
        assert_eq!(link.snapshot(), LinkSnapshot::default());
        assert!(!link.should_start());
    }

    #[test]
    fn test_should_start_requires_both_links() {
        let link = LinkState::new();
        link.set_radio_connected();
        assert!(!link.should_start());

        link.set_transport_connected(true);
        assert!(link.should_start());

        link.set_streaming(true);
        assert!(!link.should_start());
    }

    #[test]
    fn test_radio_loss_clears_streaming() {
        let link = LinkState::new();
        link.set_radio_connected();
        link.set_transport_connected(true);
        link.set_streaming(true);

        link.on_radio_disconnected();

        let snap = link.snapshot();
        assert!(!snap.radio_connected);
        assert!(!snap.streaming);
        assert!(snap.transport_connected);
    }
}
