//! BrainClaw Native - host radio and network transport
//!
//! This crate plugs the host platform into the bridge state machine from
//! `brainclaw-embedded`:
//! - [`BtleplugRadio`]: the Muse headset over the system Bluetooth adapter
//! - [`WsTransport`]: a reconnecting WebSocket client to the relay server
//! - [`SystemClock`]: monotonic milliseconds from `std::time::Instant`
//!
//! # Threading
//!
//! The bridge itself is synchronous and runs on one dedicated thread. Both
//! collaborators hold a [`tokio::runtime::Handle`]: the radio blocks on it
//! for each BLE operation, the transport spawns its socket task on it.
//! Never call the radio from inside an async task.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod bridge;
pub mod clock;
pub mod config;
pub mod error;

pub use bridge::{BtleplugRadio, MuseHandle, WsTransport};
pub use clock::SystemClock;
pub use config::{BleConfig, WsConfig};
pub use error::{NativeError, NativeResult};
