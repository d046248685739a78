//! Bridge timing and matching configuration

use heapless::String;

use brainclaw_core::protocol::{COMMAND_BUFFER_SIZE, PRESET_DEFAULT};

use crate::radio::ConnectionParams;

/// Maximum length of the advertised-name filter
pub const NAME_FILTER_LEN: usize = 32;

/// Orchestrator and scheduler configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    /// How long one scan runs
    pub scan_duration_ms: u64,
    /// Backoff after an empty scan, a failed connect, or a failed subscribe pass
    pub scan_retry_delay_ms: u64,
    /// Backoff after the peripheral drops
    pub reconnect_delay_ms: u64,
    /// Gap between handshake writes
    pub command_interval_ms: u64,
    /// How often the scheduler logs counters
    pub stats_interval_ms: u64,
    /// Substring matched against advertised names (empty disables name matching)
    pub name_filter: String<NAME_FILTER_LEN>,
    /// Preset command sent between halt and start
    pub preset: String<COMMAND_BUFFER_SIZE>,
    /// Connection parameters requested on connect
    pub connection: ConnectionParams,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scan_duration_ms: 10_000,
            scan_retry_delay_ms: 5_000,
            reconnect_delay_ms: 2_000,
            command_interval_ms: 100,
            stats_interval_ms: 10_000,
            name_filter: bounded("Muse"),
            preset: bounded(PRESET_DEFAULT),
            connection: ConnectionParams::LOW_LATENCY,
        }
    }
}

impl BridgeConfig {
    /// Replace the name filter. Text beyond [`NAME_FILTER_LEN`] bytes is cut.
    #[must_use]
    pub fn with_name_filter(mut self, filter: &str) -> Self {
        self.name_filter = bounded(filter);
        self
    }

    /// Replace the preset command. Text beyond [`COMMAND_BUFFER_SIZE`] bytes is cut.
    #[must_use]
    pub fn with_preset(mut self, preset: &str) -> Self {
        self.preset = bounded(preset);
        self
    }
}

/// Copy as many whole characters of `text` as fit.
fn bounded<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
