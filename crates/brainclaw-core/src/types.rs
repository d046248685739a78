//! Core types for the BrainClaw bridge
//!
//! This module provides the identifiers and sample types shared by every
//! tier of the bridge:
//! - EEG electrode identifiers (Muse 10-20 positions)
//! - Data channel identity (which GATT characteristic a payload came from)
//! - Decoded sample frames for EEG, motion and telemetry

use serde::{Deserialize, Serialize};

/// Number of EEG samples packed into one notification.
pub const EEG_SAMPLES_PER_PACKET: usize = 12;

// ============================================================================
// EEG Channels
// ============================================================================

/// EEG electrode on the headband.
///
/// The discriminant is the channel index emitted on the wire (`"ch"`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EegChannel {
    /// Left ear
    Tp9 = 0,
    /// Left forehead
    Af7 = 1,
    /// Right forehead
    Af8 = 2,
    /// Right ear
    Tp10 = 3,
}

impl EegChannel {
    /// Channel index (0-3)
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Electrode label
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tp9 => "TP9",
            Self::Af7 => "AF7",
            Self::Af8 => "AF8",
            Self::Tp10 => "TP10",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EegChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

// ============================================================================
// Motion Sensors
// ============================================================================

/// Which inertial sensor a motion frame came from.
///
/// The kind is implied by the characteristic, never by payload content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionKind {
    /// Accelerometer, values in g
    Accel,
    /// Gyroscope, values in degrees per second
    Gyro,
}

impl MotionKind {
    /// Multiplier from raw `i16` to physical units
    #[must_use]
    pub fn scale(self) -> f32 {
        match self {
            Self::Accel => 1.0 / 16384.0,
            // ±2000 dps range
            Self::Gyro => 1.0 / 16.4,
        }
    }

    /// Wire discriminator
    #[must_use]
    pub const fn type_tag(self) -> &'static str {
        match self {
            Self::Accel => "accel",
            Self::Gyro => "gyro",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MotionKind {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.type_tag());
    }
}

// ============================================================================
// Data Channels
// ============================================================================

/// A notify characteristic carrying sensor data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataChannel {
    /// One EEG electrode
    Eeg(EegChannel),
    /// Accelerometer
    Accelerometer,
    /// Gyroscope
    Gyroscope,
    /// Battery / temperature telemetry
    Telemetry,
}

impl DataChannel {
    /// Short label for logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eeg(ch) => ch.name(),
            Self::Accelerometer => "accel",
            Self::Gyroscope => "gyro",
            Self::Telemetry => "telemetry",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DataChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.label());
    }
}

// ============================================================================
// Decoded Samples
// ============================================================================

/// Twelve consecutive samples from one electrode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EegFrame {
    /// Source electrode
    pub channel: EegChannel,
    /// Packet sequence number (gaps mean dropped packets)
    pub sequence: u16,
    /// Samples in microvolts, payload order
    pub samples: [f32; EEG_SAMPLES_PER_PACKET],
}

/// One X/Y/Z reading from an inertial sensor.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionFrame {
    /// Sensor kind (determines units)
    pub kind: MotionKind,
    /// X axis
    pub x: f32,
    /// Y axis
    pub y: f32,
    /// Z axis
    pub z: f32,
}

/// Battery and temperature report.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Battery level in percent
    pub battery_percent: u16,
    /// Temperature in °C
    pub temperature_c: f32,
}

/// Any sample the bridge forwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DecodedSample {
    /// EEG packet
    Eeg(EegFrame),
    /// Accelerometer or gyroscope packet
    Motion(MotionFrame),
    /// Telemetry packet
    Telemetry(TelemetryFrame),
}

impl DecodedSample {
    /// Wire discriminator (`"type"` field)
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Eeg(_) => "eeg",
            Self::Motion(m) => m.kind.type_tag(),
            Self::Telemetry(_) => "telemetry",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
