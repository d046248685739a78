//! Radio-notification context: decode, encode, enqueue
//!
//! [`NotificationHandler::on_notification`] is the only code that runs in the
//! radio's context. It never blocks and its one side effect is a non-blocking
//! push into the relay.

use tracing::{debug, trace, warn};

use brainclaw_core::message::OutboundMessage;
use brainclaw_core::protocol;
use brainclaw_core::{DataChannel, LinkState, RelayQueue};

/// What happened to one notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Decoded and queued for the transport
    Queued,
    /// Dropped because the transport is down
    Offline,
    /// Characteristic is not a data channel
    UnknownChannel,
    /// Payload too short for its channel
    Malformed,
    /// Dropped because the relay is full
    RelayFull,
}

/// Capability handed to the radio so it can deliver notifications.
#[derive(Clone, Copy)]
pub struct NotificationHandler<'a> {
    relay: &'a RelayQueue,
    link: &'a LinkState,
}

impl<'a> NotificationHandler<'a> {
    /// Create a handler that feeds `relay` and reads `link`.
    pub const fn new(relay: &'a RelayQueue, link: &'a LinkState) -> Self {
        Self { relay, link }
    }

    /// Handle one notification from characteristic `uuid`.
    pub fn on_notification(&self, uuid: u128, payload: &[u8]) -> NotifyOutcome {
        let Some(channel) = DataChannel::from_uuid(uuid) else {
            trace!("notification from unknown characteristic {uuid:032x}");
            return NotifyOutcome::UnknownChannel;
        };

        // Nothing could deliver it
        if !self.link.transport_connected() {
            return NotifyOutcome::Offline;
        }

        let sample = match protocol::decode(channel, payload) {
            Ok(sample) => sample,
            Err(e) => {
                debug!(channel = channel.label(), error = %e, "dropping notification");
                return NotifyOutcome::Malformed;
            }
        };

        let message = match OutboundMessage::encode(&sample) {
            Ok(message) => message,
            Err(e) => {
                warn!(channel = channel.label(), error = %e, "failed to encode sample");
                return NotifyOutcome::Malformed;
            }
        };

        match self.relay.push(message) {
            Ok(()) => NotifyOutcome::Queued,
            Err(e) => {
                debug!(channel = channel.label(), "{e}");
                NotifyOutcome::RelayFull
            }
        }
    }
}
