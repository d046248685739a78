//! BrainClaw Embedded - stream control for the Muse BLE bridge
//!
//! This crate holds the platform-independent half of the bridge. It talks to
//! the radio, the network transport and the clock only through the traits in
//! [`radio`], [`transport`] and [`clock`], so the same state machine runs on a
//! microcontroller BLE host or on a desktop through `brainclaw-native`.
//!
//! # Execution Contexts
//!
//! ```text
//!  radio context                      main scheduling context
//!  ─────────────                      ───────────────────────
//!  NotificationHandler ──▶ RelayQueue ──▶ TransportPump ──▶ Transport
//!        │                                     │
//!        ▼                                     ▼
//!   (disconnect) ──────▶ LinkState ◀──── StreamOrchestrator ──▶ RadioLink
//! ```
//!
//! Only the relay queue and the link flags are shared between the two
//! contexts. All radio writes, subscriptions and transport sends happen in
//! [`Bridge::tick`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod bridge;
pub mod clock;
pub mod config;
pub mod notify;
pub mod orchestrator;
pub mod pump;
pub mod radio;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::Bridge;
pub use clock::Clock;
pub use config::BridgeConfig;
pub use notify::{NotificationHandler, NotifyOutcome};
pub use orchestrator::{OrchestratorState, StreamOrchestrator};
pub use pump::{LinkChange, PumpStats, TransportPump};
pub use radio::{Advertisement, ConnectionParams, RadioLink, ScanResults};
pub use transport::{Endpoint, Transport, TransportEvent};
