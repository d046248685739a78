//! Transport pump: relay queue → transport
//!
//! Each scheduler tick the pump services the transport once, mirrors its
//! connection changes into [`LinkState`], and drains the relay completely.
//! Messages drained while the transport is down are discarded; the relay has
//! already done its buffering.

use heapless::Vec;

use brainclaw_core::{LinkState, RelayQueue, RelayStats};

use crate::transport::{Endpoint, Transport, TransportEvent};

/// Maximum connection changes reported from one poll
pub const MAX_LINK_CHANGES: usize = 4;

/// Transport connection change observed during a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkChange {
    /// Transport connected
    Up,
    /// Transport disconnected
    Down,
}

/// Connection changes from one poll, oldest first
pub type LinkChanges = Vec<LinkChange, MAX_LINK_CHANGES>;

/// Pump counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    /// Messages handed to the transport
    pub sent: u32,
    /// Messages discarded because the transport was down
    pub discarded: u32,
    /// Messages the transport refused
    pub send_failed: u32,
}

/// Moves messages from the relay to the transport.
pub struct TransportPump<'a, T: Transport> {
    transport: T,
    relay: &'a RelayQueue,
    link: &'a LinkState,
    stats: PumpStats,
}

impl<'a, T: Transport> TransportPump<'a, T> {
    /// Create a pump over `transport`.
    pub fn new(transport: T, relay: &'a RelayQueue, link: &'a LinkState) -> Self {
        Self { transport, relay, link, stats: PumpStats::default() }
    }

    /// Start the transport connecting to `endpoint`.
    pub fn connect(&mut self, endpoint: &Endpoint<'_>) {
        tracing::info!("Connecting transport to {}:{}{}", endpoint.host, endpoint.port, endpoint.path);
        self.transport.connect(endpoint);
    }

    /// Service the transport once and mirror its connection state.
    pub fn poll(&mut self) -> LinkChanges {
        let link = self.link;
        let mut changes = LinkChanges::new();

        self.transport.poll(&mut |event| {
            let change = match event {
                TransportEvent::Connected => {
                    tracing::info!("Transport connected");
                    link.set_transport_connected(true);
                    LinkChange::Up
                }
                TransportEvent::Disconnected => {
                    tracing::warn!("Transport disconnected");
                    link.set_transport_connected(false);
                    LinkChange::Down
                }
                TransportEvent::Text(text) => {
                    tracing::debug!("Transport message ignored: {}", text);
                    return;
                }
            };
            if changes.push(change).is_err() {
                tracing::warn!("Too many transport events in one poll, dropping {:?}", change);
            }
        });

        // A transport that went down without reporting it still counts as down
        if link.transport_connected() && !self.transport.is_connected() {
            tracing::warn!("Transport down without a disconnect event");
            link.set_transport_connected(false);
            if changes.push(LinkChange::Down).is_err() {
                tracing::warn!("Too many transport events in one poll, dropping Down");
            }
        }

        changes
    }

    /// Drain the relay into the transport. Returns the number of messages taken.
    pub fn drain(&mut self) -> usize {
        let mut taken = 0;
        while let Some(message) = self.relay.pop() {
            taken += 1;

            if !self.link.transport_connected() {
                self.stats.discarded += 1;
                continue;
            }

            match self.transport.send(message.as_str()) {
                Ok(()) => self.stats.sent += 1,
                Err(e) => {
                    self.stats.send_failed += 1;
                    tracing::warn!("Send failed: {}", e);
                }
            }
        }
        taken
    }

    /// Counters since creation
    pub fn stats(&self) -> PumpStats {
        self.stats
    }

    /// Counters of the relay this pump drains
    pub fn relay_stats(&self) -> RelayStats {
        self.relay.stats()
    }

    /// Transport collaborator
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Transport collaborator (mutable)
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
