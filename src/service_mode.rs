//! Service-mode (programming track) CV reads and writes.
//!
//! Service mode is a synchronous request/response protocol whose "response"
//! is a current pulse on the track: a decoder acknowledges an operation by
//! drawing at least 60 mA above baseline for at least 6 ms (S-9.2.3). The
//! [`CvProgrammer`] sends the mandated packet choreography through a
//! [`Track`], waits for the queue to reach the rails, then averages a burst
//! of ADC samples against a board-specific threshold.
//!
//! Reads are bit-wise: eight verify-bit probes reconstruct the byte, then a
//! verify-byte packet confirms the assembled value. Writes are attempted up
//! to five times and only count when both the write and a following verify
//! draw an ACK.

use crate::packet::RESET_PAYLOAD;
use crate::traits::{CurrentSense, Delay, Track};
use log::{debug, info, warn};

/// ADC samples taken per ACK detection window.
pub const CV_SAMPLE_COUNT: u8 = 250;

/// Delay between ACK current samples, in milliseconds.
const SAMPLE_INTERVAL_MS: u32 = 2;

/// Write attempts before giving up on a CV write.
pub const MAX_WRITE_ATTEMPTS: u8 = 5;

/// Lowest addressable configuration variable.
pub const MIN_CV: u16 = 1;

/// Highest addressable configuration variable.
pub const MAX_CV: u16 = 1024;

/// Full-scale raw value of the motor board's 12-bit current ADC.
const ADC_FULL_SCALE: u32 = 4096;

/// Decoder acknowledgement current above baseline, in milliamps (S-9.2.3).
const ACK_MILLIAMPS: u32 = 60;

/// Splits a 1-based CV number into the two instruction address bytes
/// (the wire encodes `cv - 1` as a 10-bit address).
fn cv_address(cv: u16) -> (u8, u8) {
    let address = cv - 1;
    (((address >> 8) & 0x03) as u8, (address & 0xFF) as u8)
}

/// Verify-bit instruction asking "is `bit` of `cv` equal to 1?".
fn verify_bit_payload(cv: u16, bit: u8) -> [u8; 3] {
    let (high, low) = cv_address(cv);
    [0x78 | high, low, 0xE8 | bit]
}

/// Verify-byte instruction comparing `cv` against `value`.
fn verify_byte_payload(cv: u16, value: u8) -> [u8; 3] {
    let (high, low) = cv_address(cv);
    [0x74 | high, low, value]
}

/// Write-byte instruction storing `value` into `cv`.
fn write_byte_payload(cv: u16, value: u8) -> [u8; 3] {
    let (high, low) = cv_address(cv);
    [0x7C | high, low, value]
}

/// Write-bit instruction storing `value` into `bit` of `cv`.
fn write_bit_payload(cv: u16, bit: u8, value: bool) -> [u8; 3] {
    let (high, low) = cv_address(cv);
    [0x78 | high, low, 0xF0 | bit | ((value as u8) << 3)]
}

/// Verify instruction paired with [`write_bit_payload`].
fn verify_written_bit_payload(cv: u16, bit: u8, value: bool) -> [u8; 3] {
    let (high, low) = cv_address(cv);
    [0x74 | high, low, 0xB0 | bit | ((value as u8) << 3)]
}

/// CV programmer for the isolated programming track.
///
/// Owns the programming [`Track`], the motor board's current-sense channel,
/// and a delay source for sample pacing. The ACK threshold is derived from
/// the board's peak output current: `4096 * 60 / max_milliamps` raw counts.
///
/// # Example
///
/// ```rust
/// use rs_dcc::hal::mock::{MockCurrentSense, MockDelay, MockTrack};
/// use rs_dcc::service_mode::CvProgrammer;
///
/// let mut programmer =
///     CvProgrammer::new(MockTrack::new(), MockCurrentSense::new(), MockDelay::new(), 2000);
/// assert_eq!(programmer.ack_threshold(), 122); // 4096 * 60 / 2000
///
/// // no decoder on the mock track: every window is silent
/// assert_eq!(programmer.read_cv(8), -1);
/// ```
pub struct CvProgrammer<T: Track, A: CurrentSense, D: Delay> {
    track: T,
    sense: A,
    delay: D,
    ack_threshold: u16,
}

impl<T: Track, A: CurrentSense, D: Delay> CvProgrammer<T, A, D> {
    /// Creates a programmer for a motor board rated at `max_milliamps` peak
    /// output current.
    pub fn new(track: T, sense: A, delay: D, max_milliamps: u16) -> Self {
        debug_assert!(max_milliamps > 0);
        let ack_threshold =
            (ADC_FULL_SCALE * ACK_MILLIAMPS / u32::from(max_milliamps.max(1))) as u16;
        Self {
            track,
            sense,
            delay,
            ack_threshold,
        }
    }

    /// ACK detection threshold in raw ADC counts.
    #[inline]
    pub fn ack_threshold(&self) -> u16 {
        self.ack_threshold
    }

    /// Releases the track, sense channel, and delay source.
    pub fn into_parts(self) -> (T, A, D) {
        (self.track, self.sense, self.delay)
    }

    /// Averages one ACK detection window: 250 reads at 2 ms intervals,
    /// discarding failed (zero) conversions. Returns 0 when every read
    /// failed.
    fn sample_current(&mut self) -> u32 {
        let mut sum: u32 = 0;
        let mut successful: u32 = 0;
        for _ in 0..CV_SAMPLE_COUNT {
            let reading = self.sense.read_raw();
            if reading > 0 {
                sum += u32::from(reading);
                successful += 1;
            }
            self.delay.delay_ms(SAMPLE_INTERVAL_MS);
        }
        if successful > 0 {
            sum / successful
        } else {
            0
        }
    }

    fn ack_received(&mut self) -> bool {
        self.sample_current() > u32::from(self.ack_threshold)
    }

    /// Reads `cv` bit by bit, then verifies the assembled byte.
    ///
    /// Returns the value (0..=255) on success, or `-1` when the final
    /// verify drew no acknowledgement (no decoder present, or the bit
    /// probes were misread).
    pub fn read_cv(&mut self, cv: u16) -> i16 {
        if !(MIN_CV..=MAX_CV).contains(&cv) {
            warn!("[PROG] CV {} out of range", cv);
            return -1;
        }
        debug!(
            "[PROG] reading CV {}, samples: {}, ack threshold: {}",
            cv, CV_SAMPLE_COUNT, self.ack_threshold
        );

        let mut value: u8 = 0;
        for bit in 0..8 {
            let _ = self.track.send(&RESET_PAYLOAD, 3);
            let _ = self.track.send(&verify_bit_payload(cv, bit), 5);
            self.track.flush();
            if self.ack_received() {
                debug!("[PROG] CV {}, bit [{}/7] ON", cv, bit);
                value |= 1 << bit;
            } else {
                debug!("[PROG] CV {}, bit [{}/7] OFF", cv, bit);
            }
        }

        debug!("[PROG] CV {}, read value {}, verifying", cv, value);
        let _ = self.track.send(&RESET_PAYLOAD, 3);
        let _ = self.track.send(&verify_byte_payload(cv, value), 5);
        self.track.flush();

        if self.ack_received() {
            debug!("[PROG] CV {}, verified", cv);
            i16::from(value)
        } else {
            warn!("[PROG] CV {} could not be verified", cv);
            -1
        }
    }

    /// Writes `value` into `cv`, confirming with a verify pass.
    ///
    /// Returns `true` once a write and its verify both draw an ACK, within
    /// five attempts.
    pub fn write_cv_byte(&mut self, cv: u16, value: u8) -> bool {
        if !(MIN_CV..=MAX_CV).contains(&cv) {
            warn!("[PROG] CV {} out of range", cv);
            return false;
        }
        self.write_verified(
            write_byte_payload(cv, value),
            verify_byte_payload(cv, value),
        )
    }

    /// Writes a single bit of `cv`, confirming with a verify pass.
    ///
    /// Returns `true` once a write and its verify both draw an ACK, within
    /// five attempts.
    pub fn write_cv_bit(&mut self, cv: u16, bit: u8, value: bool) -> bool {
        if !(MIN_CV..=MAX_CV).contains(&cv) || bit > 7 {
            warn!("[PROG] CV {} bit {} out of range", cv, bit);
            return false;
        }
        self.write_verified(
            write_bit_payload(cv, bit, value),
            verify_written_bit_payload(cv, bit, value),
        )
    }

    /// Shared write/verify attempt loop (S-9.2.3 choreography):
    /// 1 reset + 4 write packets, ACK check, then on ACK 3 resets + 5
    /// verifies and a second ACK check. Every attempt ends with 3 resets to
    /// return the decoder to a known state.
    fn write_verified(&mut self, write: [u8; 3], verify: [u8; 3]) -> bool {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            debug!(
                "[PROG {}/{}] writing {:02X?}",
                attempt, MAX_WRITE_ATTEMPTS, write
            );
            let _ = self.track.send(&RESET_PAYLOAD, 1);
            let _ = self.track.send(&write, 4);
            self.track.flush();

            let mut verified = false;
            if self.ack_received() {
                let _ = self.track.send(&RESET_PAYLOAD, 3);
                let _ = self.track.send(&verify, 5);
                self.track.flush();
                verified = self.ack_received();
            }

            if !verified {
                warn!(
                    "[PROG {}/{}] {:02X?} could not be verified",
                    attempt, MAX_WRITE_ATTEMPTS, write
                );
            }

            info!("[PROG] sending decoder reset packet");
            let _ = self.track.send(&RESET_PAYLOAD, 3);

            if verified {
                return true;
            }
        }
        false
    }
}
