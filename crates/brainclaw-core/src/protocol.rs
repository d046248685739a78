//! Muse GATT protocol: characteristic identities, payload decoders, and
//! control command framing
//!
//! All vendor characteristics live in the namespace
//! `273eXXXX-4c4d-454d-96be-f03bac821358`. Every data characteristic
//! notifies a fixed-size payload that starts with a big-endian `u16`
//! sequence counter.
//!
//! # Payload Layouts
//!
//! ```text
//! EEG (20 bytes):       seq(2) | 12 × 12-bit samples, MSB-first (18)
//! Accel / Gyro (8+):    seq(2) | x i16 BE | y i16 BE | z i16 BE
//! Telemetry (10+):      seq(2) | battery u16 BE | fuel gauge(2) | adc mV(2) | temp i16 BE
//! Control write:        len | ascii command | '\n'      (len = command + 1)
//! ```

use heapless::Vec;

use crate::error::ProtocolError;
use crate::types::{
    DataChannel, DecodedSample, EegChannel, EegFrame, MotionFrame, MotionKind, TelemetryFrame,
    EEG_SAMPLES_PER_PACKET,
};

// ============================================================================
// Service and Characteristic UUIDs
// ============================================================================

/// Primary service UUID advertised by Muse headsets.
pub const MUSE_SERVICE_UUID: u128 = 0x0000fe8d_0000_1000_8000_00805f9b34fb;

/// Control characteristic (write commands, notify responses)
pub const CONTROL_CHAR_UUID: u128 = 0x273e0001_4c4d_454d_96be_f03bac821358;

/// EEG TP9 characteristic
pub const EEG_TP9_CHAR_UUID: u128 = 0x273e0003_4c4d_454d_96be_f03bac821358;

/// EEG AF7 characteristic
pub const EEG_AF7_CHAR_UUID: u128 = 0x273e0004_4c4d_454d_96be_f03bac821358;

/// EEG AF8 characteristic
pub const EEG_AF8_CHAR_UUID: u128 = 0x273e0005_4c4d_454d_96be_f03bac821358;

/// EEG TP10 characteristic
pub const EEG_TP10_CHAR_UUID: u128 = 0x273e0006_4c4d_454d_96be_f03bac821358;

/// Gyroscope characteristic
pub const GYRO_CHAR_UUID: u128 = 0x273e0009_4c4d_454d_96be_f03bac821358;

/// Accelerometer characteristic
pub const ACCEL_CHAR_UUID: u128 = 0x273e000a_4c4d_454d_96be_f03bac821358;

/// Telemetry characteristic
pub const TELEMETRY_CHAR_UUID: u128 = 0x273e000b_4c4d_454d_96be_f03bac821358;

/// Data channels in the order they are subscribed.
pub const SUBSCRIPTION_ORDER: [DataChannel; 7] = [
    DataChannel::Eeg(EegChannel::Tp9),
    DataChannel::Eeg(EegChannel::Af7),
    DataChannel::Eeg(EegChannel::Af8),
    DataChannel::Eeg(EegChannel::Tp10),
    DataChannel::Accelerometer,
    DataChannel::Gyroscope,
    DataChannel::Telemetry,
];

impl DataChannel {
    /// Resolve a characteristic UUID to a data channel.
    #[must_use]
    pub const fn from_uuid(uuid: u128) -> Option<Self> {
        match uuid {
            EEG_TP9_CHAR_UUID => Some(Self::Eeg(EegChannel::Tp9)),
            EEG_AF7_CHAR_UUID => Some(Self::Eeg(EegChannel::Af7)),
            EEG_AF8_CHAR_UUID => Some(Self::Eeg(EegChannel::Af8)),
            EEG_TP10_CHAR_UUID => Some(Self::Eeg(EegChannel::Tp10)),
            ACCEL_CHAR_UUID => Some(Self::Accelerometer),
            GYRO_CHAR_UUID => Some(Self::Gyroscope),
            TELEMETRY_CHAR_UUID => Some(Self::Telemetry),
            _ => None,
        }
    }

    /// Characteristic UUID for this channel.
    #[must_use]
    pub const fn uuid(self) -> u128 {
        match self {
            Self::Eeg(EegChannel::Tp9) => EEG_TP9_CHAR_UUID,
            Self::Eeg(EegChannel::Af7) => EEG_AF7_CHAR_UUID,
            Self::Eeg(EegChannel::Af8) => EEG_AF8_CHAR_UUID,
            Self::Eeg(EegChannel::Tp10) => EEG_TP10_CHAR_UUID,
            Self::Accelerometer => ACCEL_CHAR_UUID,
            Self::Gyroscope => GYRO_CHAR_UUID,
            Self::Telemetry => TELEMETRY_CHAR_UUID,
        }
    }
}

// ============================================================================
// Packet Sizes and Scaling
// ============================================================================

/// EEG notification length (sequence + packed samples)
pub const EEG_PACKET_LEN: usize = 20;

/// Packed EEG sample bytes (12 × 12 bits)
pub const EEG_PACKED_LEN: usize = 18;

/// Minimum accelerometer / gyroscope notification length
pub const MOTION_PACKET_LEN: usize = 8;

/// Minimum telemetry notification length
pub const TELEMETRY_PACKET_LEN: usize = 10;

/// Raw EEG value at zero microvolts (mid-scale of the 12-bit ADC)
pub const EEG_OFFSET: f32 = 2048.0;

/// Microvolts per raw EEG LSB
pub const EEG_SCALE: f32 = 0.48828125;

const TELEMETRY_BATTERY_OFFSET: usize = 2;
const TELEMETRY_TEMP_OFFSET: usize = 8;

// ============================================================================
// Decoders
// ============================================================================

/// Decode twelve packed 12-bit samples into microvolts.
///
/// Samples are packed MSB-first with no byte alignment. Sample `i` starts at
/// bit `i * 12`; when it starts at bit 0..=4 of its first byte it fits in two
/// bytes, otherwise it straddles three.
///
/// # Example
///
/// ```
/// use brainclaw_core::protocol::{decode_samples, pack_samples};
///
/// let packed = pack_samples(&[2048; 12]);
/// assert!(decode_samples(&packed).iter().all(|&uv| uv == 0.0));
/// ```
#[must_use]
pub fn decode_samples(packed: &[u8; EEG_PACKED_LEN]) -> [f32; EEG_SAMPLES_PER_PACKET] {
    let mut samples = [0.0f32; EEG_SAMPLES_PER_PACKET];
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample = raw_to_microvolts(unpack_sample(packed, i));
    }
    samples
}

#[inline]
fn unpack_sample(packed: &[u8; EEG_PACKED_LEN], index: usize) -> u16 {
    let bit_offset = index * 12;
    let byte = bit_offset / 8;
    let shift = bit_offset % 8;

    let raw = if shift <= 4 {
        let word = (u16::from(packed[byte]) << 8) | u16::from(packed[byte + 1]);
        word >> (4 - shift)
    } else {
        let word = (u32::from(packed[byte]) << 16)
            | (u32::from(packed[byte + 1]) << 8)
            | u32::from(packed[byte + 2]);
        (word >> (12 - shift)) as u16
    };
    raw & 0x0FFF
}

/// Convert a raw 12-bit EEG value to microvolts.
#[inline]
#[must_use]
pub fn raw_to_microvolts(raw: u16) -> f32 {
    (f32::from(raw) - EEG_OFFSET) * EEG_SCALE
}

/// Pack twelve 12-bit values MSB-first (inverse of [`decode_samples`] before scaling).
///
/// Values wider than 12 bits are masked.
#[must_use]
pub fn pack_samples(raw: &[u16; EEG_SAMPLES_PER_PACKET]) -> [u8; EEG_PACKED_LEN] {
    let mut packed = [0u8; EEG_PACKED_LEN];
    for (pair, chunk) in raw.chunks_exact(2).zip(packed.chunks_exact_mut(3)) {
        let a = pair[0] & 0x0FFF;
        let b = pair[1] & 0x0FFF;
        chunk[0] = (a >> 4) as u8;
        chunk[1] = (((a & 0x0F) << 4) | (b >> 8)) as u8;
        chunk[2] = (b & 0xFF) as u8;
    }
    packed
}

/// Decode a 20-byte EEG notification.
///
/// # Errors
///
/// Returns [`ProtocolError::IncompletePacket`] for payloads under 20 bytes.
pub fn decode_eeg(channel: EegChannel, payload: &[u8]) -> Result<EegFrame, ProtocolError> {
    check_len(payload, EEG_PACKET_LEN)?;

    let mut packed = [0u8; EEG_PACKED_LEN];
    packed.copy_from_slice(&payload[2..EEG_PACKET_LEN]);

    Ok(EegFrame {
        channel,
        sequence: read_u16_be(payload, 0),
        samples: decode_samples(&packed),
    })
}

/// Decode an accelerometer or gyroscope notification.
///
/// # Errors
///
/// Returns [`ProtocolError::IncompletePacket`] for payloads under 8 bytes.
pub fn decode_motion(payload: &[u8], kind: MotionKind) -> Result<MotionFrame, ProtocolError> {
    check_len(payload, MOTION_PACKET_LEN)?;

    let scale = kind.scale();
    Ok(MotionFrame {
        kind,
        x: f32::from(read_i16_be(payload, 2)) * scale,
        y: f32::from(read_i16_be(payload, 4)) * scale,
        z: f32::from(read_i16_be(payload, 6)) * scale,
    })
}

/// Decode a telemetry notification.
///
/// # Errors
///
/// Returns [`ProtocolError::IncompletePacket`] for payloads under 10 bytes.
pub fn decode_telemetry(payload: &[u8]) -> Result<TelemetryFrame, ProtocolError> {
    check_len(payload, TELEMETRY_PACKET_LEN)?;

    Ok(TelemetryFrame {
        battery_percent: read_u16_be(payload, TELEMETRY_BATTERY_OFFSET),
        temperature_c: f32::from(read_i16_be(payload, TELEMETRY_TEMP_OFFSET)) / 10.0,
    })
}

/// Decode a notification according to the channel it arrived on.
///
/// # Errors
///
/// Returns [`ProtocolError::IncompletePacket`] if the payload is shorter than
/// the channel's layout.
pub fn decode(channel: DataChannel, payload: &[u8]) -> Result<DecodedSample, ProtocolError> {
    match channel {
        DataChannel::Eeg(ch) => decode_eeg(ch, payload).map(DecodedSample::Eeg),
        DataChannel::Accelerometer => decode_motion(payload, MotionKind::Accel).map(DecodedSample::Motion),
        DataChannel::Gyroscope => decode_motion(payload, MotionKind::Gyro).map(DecodedSample::Motion),
        DataChannel::Telemetry => decode_telemetry(payload).map(DecodedSample::Telemetry),
    }
}

#[inline]
fn check_len(payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() < expected {
        return Err(ProtocolError::IncompletePacket { received: payload.len(), expected });
    }
    Ok(())
}

#[inline]
fn read_u16_be(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
fn read_i16_be(buf: &[u8], offset: usize) -> i16 {
    i16::from_be_bytes([buf[offset], buf[offset + 1]])
}

// ============================================================================
// Control Commands
// ============================================================================

/// Capacity of the control characteristic write buffer.
pub const COMMAND_BUFFER_SIZE: usize = 32;

/// Encoded control command.
pub type CommandFrame = Vec<u8, COMMAND_BUFFER_SIZE>;

/// Halt streaming
pub const HALT: &str = "h";

/// Default preset: four EEG channels plus IMU and telemetry
pub const PRESET_DEFAULT: &str = "p21";

/// Start streaming
pub const START: &str = "s";

/// Commands written to start streaming, in order.
#[must_use]
pub const fn handshake_sequence(preset: &str) -> [&str; 3] {
    [HALT, preset, START]
}

/// Frame a text command for the control characteristic.
///
/// ```text
/// byte 0      : command length + 1 (the trailing newline)
/// bytes 1..=n : ASCII command
/// byte n + 1  : 0x0A
/// ```
///
/// # Errors
///
/// Returns [`ProtocolError::NonAsciiCommand`] for non-ASCII text and
/// [`ProtocolError::CommandTooLong`] if the frame exceeds
/// [`COMMAND_BUFFER_SIZE`].
///
/// # Example
///
/// ```
/// use brainclaw_core::protocol::encode_command;
///
/// assert_eq!(encode_command("h").unwrap().as_slice(), &[0x02, b'h', 0x0A]);
/// ```
pub fn encode_command(command: &str) -> Result<CommandFrame, ProtocolError> {
    if !command.is_ascii() {
        return Err(ProtocolError::NonAsciiCommand);
    }

    let required = command.len() + 2;
    let too_long = ProtocolError::CommandTooLong { required, available: COMMAND_BUFFER_SIZE };
    if required > COMMAND_BUFFER_SIZE {
        return Err(too_long);
    }

    let mut frame = CommandFrame::new();
    frame.push((command.len() + 1) as u8).map_err(|_| too_long.clone())?;
    frame.extend_from_slice(command.as_bytes()).map_err(|()| too_long.clone())?;
    frame.push(b'\n').map_err(|_| too_long)?;
    Ok(frame)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: [u16; 12] = [0, 1, 2047, 2048, 2049, 4095, 0x0ABC, 0x0123, 0x0F0F, 0x00F0, 0x0800, 0x07FF];

    #[test]
    fn test_pack_decode_roundtrip() {
        let packed = pack_samples(&RAW);
        let decoded = decode_samples(&packed);

        for (i, (&raw, &uv)) in RAW.iter().zip(decoded.iter()).enumerate() {
            let expected = (f32::from(raw) - 2048.0) * 0.48828125;
            assert_eq!(uv, expected, "sample {i} mismatch");
        }
    }

    #[test]
    fn test_decode_known_bits() {
        // 0xABC, 0xDEF, ... hand-packed: AB CD EF
        let mut packed = [0u8; EEG_PACKED_LEN];
        packed[0] = 0xAB;
        packed[1] = 0xCD;
        packed[2] = 0xEF;

        let decoded = decode_samples(&packed);
        assert_eq!(decoded[0], raw_to_microvolts(0x0ABC));
        assert_eq!(decoded[1], raw_to_microvolts(0x0DEF));
        assert_eq!(decoded[2], raw_to_microvolts(0));
    }

    #[test]
    fn test_decode_scaling_endpoints() {
        assert_eq!(raw_to_microvolts(2048), 0.0);
        assert_eq!(raw_to_microvolts(0), -1000.0);
        assert_eq!(raw_to_microvolts(4095), 999.51171875);
    }

    #[test]
    fn test_decode_always_twelve() {
        for fill in [0x00u8, 0x5A, 0xFF] {
            let decoded = decode_samples(&[fill; EEG_PACKED_LEN]);
            assert_eq!(decoded.len(), 12);
        }
    }

    #[test]
    fn test_decode_eeg_sequence() {
        let mut payload = [0u8; EEG_PACKET_LEN];
        payload[0] = 0x12;
        payload[1] = 0x34;
        payload[2..].copy_from_slice(&pack_samples(&RAW));

        let frame = decode_eeg(EegChannel::Af8, &payload).unwrap();
        assert_eq!(frame.channel, EegChannel::Af8);
        assert_eq!(frame.sequence, 0x1234);
        assert_eq!(frame.samples[5], raw_to_microvolts(4095));
    }

    #[test]
    fn test_decode_eeg_short() {
        let result = decode_eeg(EegChannel::Tp9, &[0u8; 19]);
        assert_eq!(result, Err(ProtocolError::IncompletePacket { received: 19, expected: 20 }));
    }

    #[test]
    fn test_decode_accel() {
        // x = 16384 (1 g), y = -16384, z = 8192
        let payload = [0x00, 0x01, 0x40, 0x00, 0xC0, 0x00, 0x20, 0x00];
        let frame = decode_motion(&payload, MotionKind::Accel).unwrap();
        assert_eq!(frame.x, 1.0);
        assert_eq!(frame.y, -1.0);
        assert_eq!(frame.z, 0.5);
    }

    #[test]
    fn test_decode_gyro() {
        // x = 164 → 10 dps
        let payload = [0x00, 0x01, 0x00, 0xA4, 0x00, 0x00, 0xFF, 0x5C];
        let frame = decode_motion(&payload, MotionKind::Gyro).unwrap();
        assert!((frame.x - 10.0).abs() < 1e-4);
        assert_eq!(frame.y, 0.0);
        assert!((frame.z + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_decode_motion_short() {
        let result = decode_motion(&[0u8; 7], MotionKind::Accel);
        assert!(matches!(result, Err(ProtocolError::IncompletePacket { received: 7, expected: 8 })));
    }

    #[test]
    fn test_decode_telemetry() {
        let payload = [0x00, 0x07, 0x00, 0x32, 0xAA, 0xBB, 0x0F, 0xA0, 0x00, 0xC8];
        let frame = decode_telemetry(&payload).unwrap();
        assert_eq!(frame.battery_percent, 50);
        assert_eq!(frame.temperature_c, 20.0);
    }

    #[test]
    fn test_decode_telemetry_negative_temp() {
        let payload = [0, 0, 0, 100, 0, 0, 0, 0, 0xFF, 0xCE];
        let frame = decode_telemetry(&payload).unwrap();
        assert_eq!(frame.battery_percent, 100);
        assert_eq!(frame.temperature_c, -5.0);
    }

    #[test]
    fn test_decode_telemetry_short() {
        assert!(decode_telemetry(&[0u8; 9]).is_err());
    }

    #[test]
    fn test_channel_uuid_roundtrip() {
        for channel in SUBSCRIPTION_ORDER {
            assert_eq!(DataChannel::from_uuid(channel.uuid()), Some(channel));
        }
        assert_eq!(DataChannel::from_uuid(CONTROL_CHAR_UUID), None);
        assert_eq!(DataChannel::from_uuid(MUSE_SERVICE_UUID), None);
    }

    #[test]
    fn test_decode_dispatch() {
        let payload = [0x00, 0x01, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00];
        match decode(DataChannel::Gyroscope, &payload).unwrap() {
            DecodedSample::Motion(m) => assert_eq!(m.kind, MotionKind::Gyro),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_encode_halt() {
        assert_eq!(encode_command("h").unwrap().as_slice(), &[0x02, b'h', 0x0A]);
    }

    #[test]
    fn test_encode_preset() {
        assert_eq!(encode_command("p21").unwrap().as_slice(), &[0x04, b'p', b'2', b'1', 0x0A]);
    }

    #[test]
    fn test_encode_capacity_limit() {
        // 30 chars + length byte + newline = 32
        let fits = "abcdefghijklmnopqrstuvwxyzabcd";
        assert_eq!(encode_command(fits).unwrap().len(), 32);

        let too_long = "abcdefghijklmnopqrstuvwxyzabcde";
        assert_eq!(
            encode_command(too_long),
            Err(ProtocolError::CommandTooLong { required: 33, available: 32 })
        );
    }

    #[test]
    fn test_encode_non_ascii() {
        assert_eq!(encode_command("p2µ"), Err(ProtocolError::NonAsciiCommand));
    }

    #[test]
    fn test_handshake_sequence() {
        assert_eq!(handshake_sequence(PRESET_DEFAULT), ["h", "p21", "s"]);
    }
}
