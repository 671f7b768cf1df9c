//! MSP (MultiWii Serial Protocol) SET_RAW_GPS frames.
//!
//! The fused position is injected into the flight controller as if it came
//! from a raw GNSS receiver. Frames are a fixed 24 bytes: `$M<` header,
//! payload length, command id, 18 little-endian payload bytes, XOR
//! checksum over length + command + payload.

use serde::{Deserialize, Serialize};

use crate::types::GeoPoint;

pub const CMD_SET_RAW_GPS: u8 = 201;
pub const PAYLOAD_LEN: usize = 18;
/// `$M<` + len + cmd + payload + checksum.
pub const FRAME_LEN: usize = 5 + PAYLOAD_LEN + 1;

/// Payload of a SET_RAW_GPS frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MspRawGps {
    /// 0 = no fix, 2 = 2D, 3 = 3D.
    pub fix_type: u8,
    pub num_sat: u8,
    /// Degrees scaled by 1e7.
    pub lat: i32,
    /// Degrees scaled by 1e7.
    pub lon: i32,
    pub altitude_m: i16,
    /// Ground speed [cm/s].
    pub speed_cms: u16,
    /// Heading [tenths of a degree].
    pub heading_deg10: u16,
    /// HDOP scaled by 100.
    pub hdop: u16,
}

impl MspRawGps {
    /// Build a frame payload from a fused position.
    ///
    /// A valid fix is reported as a 2D fix with 12 satellites so the
    /// controller treats it as healthy GPS; altitude is pass-through zero.
    pub fn from_position(
        pos: GeoPoint,
        speed_mps: f64,
        heading_deg: f64,
        hdop: f64,
        has_fix: bool,
    ) -> Self {
        MspRawGps {
            fix_type: if has_fix { 2 } else { 0 },
            num_sat: if has_fix { 12 } else { 0 },
            lat: (pos.lat * 1e7) as i32,
            lon: (pos.lon * 1e7) as i32,
            altitude_m: 0,
            speed_cms: (speed_mps * 100.0) as u16,
            heading_deg10: (heading_deg * 10.0) as u16,
            hdop: (hdop * 100.0) as u16,
        }
    }

    /// Encode the full 24-byte frame.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = b'$';
        frame[1] = b'M';
        frame[2] = b'<';
        frame[3] = PAYLOAD_LEN as u8;
        frame[4] = CMD_SET_RAW_GPS;

        let p = &mut frame[5..5 + PAYLOAD_LEN];
        p[0] = self.fix_type;
        p[1] = self.num_sat;
        p[2..6].copy_from_slice(&self.lat.to_le_bytes());
        p[6..10].copy_from_slice(&self.lon.to_le_bytes());
        p[10..12].copy_from_slice(&self.altitude_m.to_le_bytes());
        p[12..14].copy_from_slice(&self.speed_cms.to_le_bytes());
        p[14..16].copy_from_slice(&self.heading_deg10.to_le_bytes());
        p[16..18].copy_from_slice(&self.hdop.to_le_bytes());

        frame[FRAME_LEN - 1] = checksum(&frame[3..FRAME_LEN - 1]);
        frame
    }

    /// Parse a SET_RAW_GPS frame, validating header, length, command and
    /// checksum. `None` on any mismatch.
    pub fn decode(frame: &[u8]) -> Option<MspRawGps> {
        if frame.len() != FRAME_LEN || &frame[..3] != b"$M<" {
            return None;
        }
        if frame[3] as usize != PAYLOAD_LEN || frame[4] != CMD_SET_RAW_GPS {
            return None;
        }
        if checksum(&frame[3..FRAME_LEN - 1]) != frame[FRAME_LEN - 1] {
            return None;
        }

        let p = &frame[5..5 + PAYLOAD_LEN];
        Some(MspRawGps {
            fix_type: p[0],
            num_sat: p[1],
            lat: i32::from_le_bytes(p[2..6].try_into().ok()?),
            lon: i32::from_le_bytes(p[6..10].try_into().ok()?),
            altitude_m: i16::from_le_bytes(p[10..12].try_into().ok()?),
            speed_cms: u16::from_le_bytes(p[12..14].try_into().ok()?),
            heading_deg10: u16::from_le_bytes(p[14..16].try_into().ok()?),
            hdop: u16::from_le_bytes(p[16..18].try_into().ok()?),
        })
    }
}

/// XOR checksum over length, command and payload bytes.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |cs, &b| cs ^ b)
}
