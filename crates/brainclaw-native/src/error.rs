//! Error types for the host radio and transport

use thiserror::Error;
use uuid::Uuid;

/// Errors from the host BLE radio or WebSocket transport.
#[derive(Debug, Error)]
pub enum NativeError {
    /// No Bluetooth adapter available
    #[error("No Bluetooth adapter found")]
    NoAdapter,

    /// Advertisement token not from the most recent scan
    #[error("Device not found: token {0}")]
    DeviceNotFound(u32),

    /// Peripheral lacks a required characteristic
    #[error("Characteristic not found: {0}")]
    MissingCharacteristic(Uuid),

    /// Connection attempt exceeded its timeout
    #[error("Connection timed out after {0} ms")]
    ConnectTimeout(u64),

    /// BLE stack error
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Send attempted while the transport is down
    #[error("Transport not connected")]
    NotConnected,

    /// Outbound buffer full
    #[error("Transport send buffer full")]
    Backpressure,

    /// Background task has exited
    #[error("Transport task stopped")]
    ChannelClosed,
}

/// Result type for host radio and transport operations
pub type NativeResult<T> = Result<T, NativeError>;
