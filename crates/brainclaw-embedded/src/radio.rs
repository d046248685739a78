//! Radio central abstraction
//!
//! The orchestrator drives the peripheral through [`RadioLink`]. Every call is
//! made from the main scheduling context. Notifications travel the other way,
//! from the radio's own context into a [`NotificationHandler`] the radio was
//! given at construction, and disconnects are reported straight into
//! [`LinkState::on_radio_disconnected`].
//!
//! [`NotificationHandler`]: crate::notify::NotificationHandler
//! [`LinkState::on_radio_disconnected`]: brainclaw_core::LinkState::on_radio_disconnected

use core::fmt;

use heapless::{String, Vec};

use brainclaw_core::protocol::MUSE_SERVICE_UUID;
use brainclaw_core::DataChannel;

/// Maximum advertisements returned from one scan
pub const MAX_SCAN_RESULTS: usize = 16;

/// Maximum service UUIDs kept per advertisement
pub const MAX_ADVERTISED_SERVICES: usize = 8;

/// Advertisements collected by one scan
pub type ScanResults = Vec<Advertisement, MAX_SCAN_RESULTS>;

/// One advertising device seen during a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Advertisement {
    /// Opaque identifier the radio uses to find this device again
    pub token: u32,
    /// Advertised local name
    pub name: Option<String<32>>,
    /// Advertised service UUIDs
    pub services: Vec<u128, MAX_ADVERTISED_SERVICES>,
    /// Signal strength (dBm)
    pub rssi: Option<i16>,
}

impl Advertisement {
    /// Check if this advertisement looks like a Muse headset.
    ///
    /// Matches on the Muse service UUID, or on `name_filter` appearing in the
    /// advertised name. An empty filter disables name matching.
    pub fn is_muse(&self, name_filter: &str) -> bool {
        if self.services.contains(&MUSE_SERVICE_UUID) {
            return true;
        }
        !name_filter.is_empty()
            && self
                .name
                .as_ref()
                .is_some_and(|name| name.as_str().contains(name_filter))
    }
}

/// BLE connection parameters requested on connect.
///
/// Intervals are in 1.25 ms units, the supervision timeout in 10 ms units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionParams {
    /// Minimum connection interval
    pub min_interval: u16,
    /// Maximum connection interval
    pub max_interval: u16,
    /// Peripheral latency (connection events it may skip)
    pub latency: u16,
    /// Supervision timeout
    pub supervision_timeout: u16,
    /// ATT MTU to request
    pub mtu: u16,
}

impl ConnectionParams {
    /// 7.5 ms interval, no latency, 2 s supervision timeout, 185-byte MTU.
    ///
    /// Four EEG channels at 256 Hz need roughly 85 notifications per second.
    pub const LOW_LATENCY: Self = Self {
        min_interval: 6,
        max_interval: 6,
        latency: 0,
        supervision_timeout: 200,
        mtu: 185,
    };
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::LOW_LATENCY
    }
}

/// Central-role radio operations used by the orchestrator.
pub trait RadioLink {
    /// Connected-peripheral handle, owned by the orchestrator
    type Handle;
    /// Radio error
    type Error: fmt::Display;

    /// Scan for advertisements, blocking for at most `duration_ms`.
    fn scan(&mut self, duration_ms: u64) -> Result<ScanResults, Self::Error>;

    /// Connect to an advertised device.
    fn connect(
        &mut self,
        target: &Advertisement,
        params: &ConnectionParams,
    ) -> Result<Self::Handle, Self::Error>;

    /// Enable notifications on a data channel.
    fn subscribe(&mut self, handle: &Self::Handle, channel: DataChannel) -> Result<(), Self::Error>;

    /// Disable notifications on a data channel.
    fn unsubscribe(&mut self, handle: &Self::Handle, channel: DataChannel)
        -> Result<(), Self::Error>;

    /// Write a framed command to the control characteristic.
    fn write_control(&mut self, handle: &Self::Handle, frame: &[u8]) -> Result<(), Self::Error>;

    /// Tear down the connection.
    fn disconnect(&mut self, handle: Self::Handle);
}
