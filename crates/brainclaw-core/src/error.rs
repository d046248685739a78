//! Error types for the BrainClaw bridge core
//!
//! These errors work in `no_std` environments and carry enough context to be
//! logged from the radio-notification context without allocating.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors in decoding peripheral payloads or framing outbound data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtocolError {
    /// Notification shorter than the channel's fixed layout
    IncompletePacket {
        /// Bytes received
        received: usize,
        /// Bytes expected
        expected: usize,
    },
    /// Notification from a characteristic the bridge does not decode
    UnknownChannel {
        /// Characteristic UUID as a 128-bit integer
        uuid: u128,
    },
    /// Control command frame would not fit the command buffer
    CommandTooLong {
        /// Frame size the command needs
        required: usize,
        /// Command buffer capacity
        available: usize,
    },
    /// Control command contains non-ASCII bytes
    NonAsciiCommand,
    /// Serialized message exceeded the fixed message capacity
    MessageOverflow {
        /// Message capacity in bytes
        capacity: usize,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompletePacket { received, expected } => {
                write!(f, "Incomplete packet: got {received}/{expected} bytes")
            }
            Self::UnknownChannel { uuid } => {
                write!(f, "Unknown characteristic: {uuid:032x}")
            }
            Self::CommandTooLong { required, available } => {
                write!(f, "Command frame too long: need {required} bytes, have {available}")
            }
            Self::NonAsciiCommand => write!(f, "Command contains non-ASCII characters"),
            Self::MessageOverflow { capacity } => {
                write!(f, "Message exceeds {capacity} byte capacity")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

#[cfg(feature = "defmt")]
impl defmt::Format for ProtocolError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::IncompletePacket { received, expected } => {
                defmt::write!(f, "Incomplete: {}/{}", received, expected);
            }
            Self::UnknownChannel { uuid } => {
                defmt::write!(f, "Unknown char: {=u128:x}", uuid);
            }
            Self::CommandTooLong { required, available } => {
                defmt::write!(f, "Cmd: {} > {}", required, available);
            }
            Self::NonAsciiCommand => defmt::write!(f, "Cmd not ASCII"),
            Self::MessageOverflow { capacity } => {
                defmt::write!(f, "Msg > {}", capacity);
            }
        }
    }
}
