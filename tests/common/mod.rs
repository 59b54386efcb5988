//! Shared helpers: reconstructing and parsing the transmitted DCC bit
//! stream from a mock full-cycle timer's alarm log.

use rs_dcc::hal::mock::MockTimer;
use rs_dcc::waveform::BitShape;

/// Maps each recorded full-cycle alarm period back to the bit it shaped.
pub fn bits_from(timer: &MockTimer) -> Vec<bool> {
    timer
        .alarms
        .iter()
        .map(|&cell_us| {
            assert!(
                cell_us == BitShape::ONE.cell_us || cell_us == BitShape::ZERO.cell_us,
                "unexpected cell duration {} µs",
                cell_us
            );
            cell_us == BitShape::ONE.cell_us
        })
        .collect()
}

/// Parses a bit stream into packets by standard DCC rules: a preamble of
/// at least 14 "1"s, then "0"-prefixed bytes until a "1" ends the packet
/// (here supplied by the next packet's preamble). Incomplete trailing data
/// is dropped.
pub fn parse_packets(bits: &[bool]) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    let mut i = 0;

    while i < bits.len() {
        // preamble
        let mut ones = 0;
        while i < bits.len() && bits[i] {
            ones += 1;
            i += 1;
        }
        if i >= bits.len() {
            break;
        }
        assert!(ones >= 14, "short preamble of {} bits at {}", ones, i);

        // "0"-prefixed data bytes
        let mut bytes = Vec::new();
        let mut complete = false;
        while i < bits.len() {
            if bits[i] {
                complete = true;
                break;
            }
            i += 1; // start bit
            if i + 8 > bits.len() {
                break;
            }
            let mut byte = 0u8;
            for _ in 0..8 {
                byte = (byte << 1) | u8::from(bits[i]);
                i += 1;
            }
            bytes.push(byte);
        }
        // a frame only counts once the closing "1" (the next preamble) is
        // seen, so a truncated tail never produces a bogus packet
        if complete && bytes.len() >= 3 {
            packets.push(bytes);
        }
    }
    packets
}

/// XOR of all bytes but the last must equal the last (checksum) byte.
pub fn checksum_ok(frame: &[u8]) -> bool {
    let (checksum, payload) = frame.split_last().expect("non-empty frame");
    payload.iter().fold(0u8, |acc, byte| acc ^ byte) == *checksum
}
