//! Operations-mode (main line) CV writes.
//!
//! Unlike service mode, operations-mode programming addresses one specific
//! decoder on the powered main line and gets no acknowledgement back; the
//! packet is simply repeated a few times and assumed delivered. Used for
//! tweaking running locomotives (momentum, function mapping) without a
//! trip to the programming track.

use crate::traits::Track;
use log::{debug, warn};

/// Transmission repeats for every operations-mode write.
pub const OPS_WRITE_REPEATS: u8 = 4;

/// Highest short (one-byte) locomotive address.
pub const MAX_SHORT_ADDRESS: u16 = 127;

/// Highest long (two-byte) locomotive address.
pub const MAX_LONG_ADDRESS: u16 = 10239;

/// Largest operations-mode payload: two address bytes plus the three-byte
/// CV instruction.
type OpsPayload = heapless::Vec<u8, 5>;

/// Fire-and-forget CV writer for the operations track.
///
/// # Example
///
/// ```rust
/// use rs_dcc::hal::mock::{MockTrack, TrackOp};
/// use rs_dcc::ops_mode::OpsWriter;
///
/// let mut ops = OpsWriter::new(MockTrack::new());
/// ops.write_cv_byte(3, 1, 42);
///
/// let TrackOp::Send(payload, repeats) = &ops.track().ops[0] else {
///     panic!("expected a send");
/// };
/// assert_eq!(payload, &[0x03, 0xEC, 0x00, 42]);
/// assert_eq!(*repeats, 4);
/// ```
pub struct OpsWriter<T: Track> {
    track: T,
}

impl<T: Track> OpsWriter<T> {
    /// Wraps the operations track.
    pub fn new(track: T) -> Self {
        Self { track }
    }

    /// The underlying track, for inspection.
    pub fn track(&self) -> &T {
        &self.track
    }

    /// Releases the track.
    pub fn into_inner(self) -> T {
        self.track
    }

    /// Writes `value` into `cv` of the decoder at `loco`.
    pub fn write_cv_byte(&mut self, loco: u16, cv: u16, value: u8) {
        let Some(mut payload) = self.address_payload(loco, cv) else {
            return;
        };
        debug!("[OPS] updating CV {} to {} for loco {}", cv, value, loco);
        let address = cv - 1;
        let _ = payload.push(0xEC | ((address >> 8) & 0x03) as u8);
        let _ = payload.push((address & 0xFF) as u8);
        let _ = payload.push(value);
        let _ = self.track.send(&payload, OPS_WRITE_REPEATS);
    }

    /// Writes a single bit of `cv` on the decoder at `loco`.
    pub fn write_cv_bit(&mut self, loco: u16, cv: u16, bit: u8, value: bool) {
        if bit > 7 {
            warn!("[OPS] bit {} out of range", bit);
            return;
        }
        let Some(mut payload) = self.address_payload(loco, cv) else {
            return;
        };
        debug!(
            "[OPS] updating CV {} bit {} to {} for loco {}",
            cv, bit, value, loco
        );
        let address = cv - 1;
        let _ = payload.push(0xE8 | ((address >> 8) & 0x03) as u8);
        let _ = payload.push((address & 0xFF) as u8);
        let _ = payload.push(0xF0 | bit | ((value as u8) << 3));
        let _ = self.track.send(&payload, OPS_WRITE_REPEATS);
    }

    /// Validates the arguments and starts a payload with the short or long
    /// address header.
    fn address_payload(&self, loco: u16, cv: u16) -> Option<OpsPayload> {
        if loco == 0 || loco > MAX_LONG_ADDRESS {
            warn!("[OPS] loco address {} out of range", loco);
            return None;
        }
        if !(crate::service_mode::MIN_CV..=crate::service_mode::MAX_CV).contains(&cv) {
            warn!("[OPS] CV {} out of range", cv);
            return None;
        }

        let mut payload = OpsPayload::new();
        if loco > MAX_SHORT_ADDRESS {
            let _ = payload.push(0xC0 | (loco >> 8) as u8);
            let _ = payload.push((loco & 0xFF) as u8);
        } else {
            let _ = payload.push(loco as u8);
        }
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockTrack, TrackOp};

    fn writer() -> OpsWriter<MockTrack> {
        OpsWriter::new(MockTrack::new())
    }

    #[test]
    fn long_address_byte_write() {
        let mut ops = writer();
        ops.write_cv_byte(3000, 29, 0x06);

        let expected = vec![0xCB, 0xB8, 0xEC, 0x1C, 0x06];
        assert_eq!(
            ops.track.ops,
            vec![TrackOp::Send(expected.clone(), OPS_WRITE_REPEATS)]
        );
        // the serializer will append XOR of the payload as the checksum
        assert_eq!(expected.iter().fold(0u8, |acc, b| acc ^ b), 0x85);
    }

    #[test]
    fn short_address_bit_write() {
        let mut ops = writer();
        ops.write_cv_bit(3, 1, 2, true);

        assert_eq!(
            ops.track.ops,
            vec![TrackOp::Send(vec![0x03, 0xE8, 0x00, 0xFA], OPS_WRITE_REPEATS)]
        );
    }

    #[test]
    fn short_long_address_boundary() {
        let mut ops = writer();
        ops.write_cv_byte(127, 1, 1);
        ops.write_cv_byte(128, 1, 1);

        let TrackOp::Send(short, _) = &ops.track.ops[0] else {
            panic!("expected a send");
        };
        let TrackOp::Send(long, _) = &ops.track.ops[1] else {
            panic!("expected a send");
        };
        assert_eq!(short[0], 127);
        assert_eq!(&long[..2], &[0xC0, 0x80]);
    }

    #[test]
    fn rejects_out_of_range_arguments() {
        let mut ops = writer();
        ops.write_cv_byte(0, 1, 1);
        ops.write_cv_byte(MAX_LONG_ADDRESS + 1, 1, 1);
        ops.write_cv_byte(3, 0, 1);
        ops.write_cv_byte(3, 1025, 1);
        ops.write_cv_bit(3, 1, 8, true);
        assert!(ops.track.ops.is_empty());
    }
}
