//! Host implementations of the bridge collaborators
//!
//! - [`ble`]: Muse headset access through btleplug
//! - [`websocket`]: Reconnecting WebSocket client to the relay server

pub mod ble;
pub mod websocket;

pub use ble::{BtleplugRadio, MuseHandle};
pub use websocket::WsTransport;
