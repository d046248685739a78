//! BrainClaw Core - `no_std` building blocks for the Muse BLE bridge
//!
//! This crate holds everything that must run inside the radio-notification
//! context of the bridge: bit-exact decoding of the headset's GATT payloads,
//! fixed-size JSON encoding of decoded samples, the lock-free relay queue that
//! hands messages to the network side, and the atomic link-state flags.
//!
//! Nothing in here allocates, blocks, or performs I/O.
//!
//! # Modules
//!
//! - [`types`]: Channel identifiers and decoded sample types
//! - [`protocol`]: GATT UUIDs, payload decoders, control command framing
//! - [`message`]: Outbound JSON message encoding
//! - [`relay`]: Bounded drop-newest relay queue
//! - [`link`]: Radio/transport/streaming link flags
//! - [`error`]: Protocol error type
//!
//! # Features
//!
//! - `std`: Enable standard library support
//! - `defmt`: Enable `defmt` formatting for embedded logging
//!
//! # Example
//!
//! ```rust
//! use brainclaw_core::message::OutboundMessage;
//! use brainclaw_core::protocol::decode_telemetry;
//! use brainclaw_core::types::DecodedSample;
//!
//! let payload = [0, 1, 0x00, 0x32, 0, 0, 0, 0, 0x00, 0xC8];
//! let frame = decode_telemetry(&payload).unwrap();
//! let msg = OutboundMessage::encode(&DecodedSample::Telemetry(frame)).unwrap();
//! assert_eq!(msg.as_str(), r#"{"type":"telemetry","battery":50,"temp":20.0}"#);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod error;
pub mod link;
pub mod message;
pub mod protocol;
pub mod relay;
pub mod types;

// Re-export commonly used types at crate root
pub use error::ProtocolError;
pub use link::{LinkSnapshot, LinkState};
pub use message::{OutboundMessage, MAX_MESSAGE_LEN};
pub use protocol::{CommandFrame, COMMAND_BUFFER_SIZE};
pub use relay::{RelayFull, RelayQueue, RelayStats, RELAY_CAPACITY};
pub use types::{DataChannel, DecodedSample, EegChannel, EegFrame, MotionFrame, MotionKind, TelemetryFrame};
