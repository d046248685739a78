//! Outbound JSON messages
//!
//! Each decoded sample becomes one self-contained JSON object. Numbers use
//! fixed decimal precision so consumers see a stable textual format:
//!
//! ```text
//! {"type":"eeg","ch":0,"seq":12,"samples":[-1000.00,...]}
//! {"type":"accel","x":0.0012,"y":-0.9998,"z":0.0151}
//! {"type":"gyro","x":1.22,"y":-0.61,"z":0.00}
//! {"type":"telemetry","battery":87,"temp":31.5}
//! ```

use core::fmt::{self, Write};

use heapless::String;

use crate::error::ProtocolError;
use crate::types::{DecodedSample, EegFrame, MotionFrame, MotionKind, TelemetryFrame};

/// Capacity of one serialized message in bytes.
///
/// The largest message is an EEG packet at full negative scale
/// (12 × `-1000.00`), which stays well under this bound.
pub const MAX_MESSAGE_LEN: usize = 320;

/// One serialized sample, ready to hand to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    text: String<MAX_MESSAGE_LEN>,
}

impl OutboundMessage {
    /// Serialize a decoded sample.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MessageOverflow`] if the text does not fit in
    /// [`MAX_MESSAGE_LEN`] bytes.
    pub fn encode(sample: &DecodedSample) -> Result<Self, ProtocolError> {
        let mut text = String::new();
        let tag = sample.type_tag();
        let result = match sample {
            DecodedSample::Eeg(frame) => write_eeg(&mut text, tag, frame),
            DecodedSample::Motion(frame) => write_motion(&mut text, tag, frame),
            DecodedSample::Telemetry(frame) => write_telemetry(&mut text, tag, frame),
        };
        result.map_err(|fmt::Error| ProtocolError::MessageOverflow { capacity: MAX_MESSAGE_LEN })?;
        Ok(Self { text })
    }

    /// Message text
    #[inline]
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    /// Length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True if no text was written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn write_eeg(out: &mut impl Write, tag: &str, frame: &EegFrame) -> fmt::Result {
    write!(out, r#"{{"type":"{tag}","ch":{},"seq":{},"samples":["#, frame.channel.index(), frame.sequence)?;
    for (i, sample) in frame.samples.iter().enumerate() {
        if i > 0 {
            out.write_char(',')?;
        }
        write!(out, "{sample:.2}")?;
    }
    out.write_str("]}")
}

fn write_motion(out: &mut impl Write, tag: &str, frame: &MotionFrame) -> fmt::Result {
    match frame.kind {
        MotionKind::Accel => write!(
            out,
            r#"{{"type":"{tag}","x":{:.4},"y":{:.4},"z":{:.4}}}"#,
            frame.x, frame.y, frame.z
        ),
        MotionKind::Gyro => write!(
            out,
            r#"{{"type":"{tag}","x":{:.2},"y":{:.2},"z":{:.2}}}"#,
            frame.x, frame.y, frame.z
        ),
    }
}

fn write_telemetry(out: &mut impl Write, tag: &str, frame: &TelemetryFrame) -> fmt::Result {
    write!(
        out,
        r#"{{"type":"{tag}","battery":{},"temp":{:.1}}}"#,
        frame.battery_percent, frame.temperature_c
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EegChannel;

    #[test]
    fn test_encode_telemetry() {
        let sample = DecodedSample::Telemetry(TelemetryFrame { battery_percent: 50, temperature_c: 20.0 });
        let msg = OutboundMessage::encode(&sample).unwrap();
        assert_eq!(msg.as_str(), r#"{"type":"telemetry","battery":50,"temp":20.0}"#);
    }

    #[test]
    fn test_encode_accel_precision() {
        let sample = DecodedSample::Motion(MotionFrame { kind: MotionKind::Accel, x: 1.0, y: -0.5, z: 0.25 });
        let msg = OutboundMessage::encode(&sample).unwrap();
        assert_eq!(msg.as_str(), r#"{"type":"accel","x":1.0000,"y":-0.5000,"z":0.2500}"#);
    }

    #[test]
    fn test_encode_gyro_precision() {
        let sample = DecodedSample::Motion(MotionFrame { kind: MotionKind::Gyro, x: 10.0, y: -2.5, z: 0.0 });
        let msg = OutboundMessage::encode(&sample).unwrap();
        assert_eq!(msg.as_str(), r#"{"type":"gyro","x":10.00,"y":-2.50,"z":0.00}"#);
    }

    #[test]
    fn test_encode_eeg() {
        let mut samples = [0.0f32; 12];
        samples[0] = -1000.0;
        samples[11] = 999.51171875;
        let sample = DecodedSample::Eeg(EegFrame { channel: EegChannel::Tp10, sequence: 513, samples });

        let msg = OutboundMessage::encode(&sample).unwrap();
        assert_eq!(
            msg.as_str(),
            r#"{"type":"eeg","ch":3,"seq":513,"samples":[-1000.00,0.00,0.00,0.00,0.00,0.00,0.00,0.00,0.00,0.00,0.00,999.51]}"#
        );
    }

    #[test]
    fn test_worst_case_eeg_fits() {
        let sample = DecodedSample::Eeg(EegFrame {
            channel: EegChannel::Af7,
            sequence: u16::MAX,
            samples: [-1000.0; 12],
        });
        let msg = OutboundMessage::encode(&sample).unwrap();
        assert!(msg.len() < MAX_MESSAGE_LEN);
    }
}
