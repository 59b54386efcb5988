//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for the hardware and track traits,
//! enabling development and testing on desktop without a base station.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockPin`] | [`DirectionPin`] | Counts edges, exposes pin state |
//! | [`MockTimer`] | [`BitTimer`] | Records every alarm write |
//! | [`MockCurrentSense`] | [`CurrentSense`] | Scripted ADC sample windows |
//! | [`MockDelay`] | [`Delay`] | Logs requested sleeps |
//! | [`MockTrack`] | [`Track`] | Records sends and flush marks |
//!
//! The recorded full-cycle alarm periods double as a transcript of the
//! transmitted bit stream: a 116 µs cell is a "1", a 196 µs cell a "0".
//!
//! [`DirectionPin`]: crate::traits::DirectionPin
//! [`BitTimer`]: crate::traits::BitTimer
//! [`CurrentSense`]: crate::traits::CurrentSense
//! [`Delay`]: crate::traits::Delay
//! [`Track`]: crate::traits::Track

use crate::service_mode::CV_SAMPLE_COUNT;
use crate::traits::{BitTimer, CurrentSense, Delay, DirectionPin, Track};
use core::convert::Infallible;

/// Mock direction pin that counts edges.
///
/// # Example
///
/// ```rust
/// use rs_dcc::hal::mock::MockPin;
/// use rs_dcc::traits::DirectionPin;
///
/// let mut pin = MockPin::new();
/// pin.set_high();
/// pin.set_low();
/// assert_eq!((pin.high_count, pin.low_count), (1, 1));
/// assert!(!pin.state);
/// ```
#[derive(Debug, Default)]
pub struct MockPin {
    /// Current pin level.
    pub state: bool,
    /// Number of `set_high` calls.
    pub high_count: u32,
    /// Number of `set_low` calls.
    pub low_count: u32,
}

impl MockPin {
    /// Creates a pin at the low level.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectionPin for MockPin {
    fn set_high(&mut self) {
        self.state = true;
        self.high_count += 1;
    }

    fn set_low(&mut self) {
        self.state = false;
        self.low_count += 1;
    }
}

/// Mock hardware timer recording every alarm write.
///
/// `alarms` only collects ISR-path writes (`set_alarm_us`), so a test can
/// reconstruct the transmitted bit stream from the full-cycle timer's log
/// without the initial arming period getting in the way.
#[derive(Debug, Default)]
pub struct MockTimer {
    /// Whether the timer is counting.
    pub running: bool,
    /// Most recently programmed alarm period.
    pub period_us: u64,
    /// Every period written via `set_alarm_us`, in order.
    pub alarms: Vec<u64>,
    /// Number of one-shot rearms.
    pub rearm_count: u32,
    /// Number of `start` calls.
    pub start_count: u32,
    /// Number of `stop` calls.
    pub stop_count: u32,
}

impl MockTimer {
    /// Creates a stopped timer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BitTimer for MockTimer {
    type Error = Infallible;

    fn start(&mut self, period_us: u64) -> Result<(), Infallible> {
        self.running = true;
        self.period_us = period_us;
        self.start_count += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        self.running = false;
        self.stop_count += 1;
        Ok(())
    }

    fn set_alarm_us(&mut self, period_us: u64) {
        self.period_us = period_us;
        self.alarms.push(period_us);
    }

    fn rearm(&mut self) {
        self.rearm_count += 1;
    }
}

/// Mock current-sense ADC with scripted samples.
///
/// Samples are consumed front to back; once the script runs out every read
/// returns 0 (a failed conversion, discarded by the averaging logic).
///
/// # Example
///
/// ```rust
/// use rs_dcc::hal::mock::MockCurrentSense;
/// use rs_dcc::traits::CurrentSense;
///
/// let mut sense = MockCurrentSense::new();
/// sense.samples.push(180);
/// assert_eq!(sense.read_raw(), 180);
/// assert_eq!(sense.read_raw(), 0); // script exhausted
/// ```
#[derive(Debug, Default)]
pub struct MockCurrentSense {
    /// Pending scripted samples, consumed front to back.
    pub samples: Vec<u16>,
    /// Total number of reads taken.
    pub read_count: u32,
}

impl MockCurrentSense {
    /// Creates a sense channel with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts one full ACK detection window of `raw` counts.
    pub fn queue_window(&mut self, raw: u16) {
        for _ in 0..CV_SAMPLE_COUNT {
            self.samples.push(raw);
        }
    }

    /// Scripts one full window of failed (zero) conversions.
    pub fn queue_silent_window(&mut self) {
        self.queue_window(0);
    }
}

impl CurrentSense for MockCurrentSense {
    fn read_raw(&mut self) -> u16 {
        self.read_count += 1;
        if self.samples.is_empty() {
            0
        } else {
            self.samples.remove(0)
        }
    }
}

/// Mock delay that records every requested sleep.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Requested sleeps, in order.
    pub calls: Vec<u32>,
}

impl MockDelay {
    /// Creates a delay with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total milliseconds slept.
    pub fn total_ms(&self) -> u64 {
        self.calls.iter().map(|&ms| u64::from(ms)).sum()
    }
}

impl Delay for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

/// One recorded track operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackOp {
    /// A payload queued for transmission with its repeat count.
    Send(Vec<u8>, u8),
    /// A flush marker: everything before it was on the rails before the
    /// caller proceeded.
    Flush,
}

/// Mock track recording the packet choreography.
///
/// # Example
///
/// ```rust
/// use rs_dcc::hal::mock::{MockTrack, TrackOp};
/// use rs_dcc::traits::Track;
///
/// let mut track = MockTrack::new();
/// track.send(&[0x00, 0x00], 3).unwrap();
/// track.flush();
///
/// assert_eq!(track.ops, vec![
///     TrackOp::Send(vec![0x00, 0x00], 3),
///     TrackOp::Flush,
/// ]);
/// assert_eq!(track.flush_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockTrack {
    /// Recorded operations in order.
    pub ops: Vec<TrackOp>,
}

impl MockTrack {
    /// Creates a track with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded sends, in order.
    pub fn sends(&self) -> Vec<(&[u8], u8)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                TrackOp::Send(payload, repeats) => Some((payload.as_slice(), *repeats)),
                TrackOp::Flush => None,
            })
            .collect()
    }

    /// Number of flush marks recorded.
    pub fn flush_count(&self) -> usize {
        self.ops.iter().filter(|op| **op == TrackOp::Flush).count()
    }
}

impl Track for MockTrack {
    type Error = Infallible;

    fn send(&mut self, payload: &[u8], repeats: u8) -> Result<(), Infallible> {
        self.ops.push(TrackOp::Send(payload.to_vec(), repeats));
        Ok(())
    }

    fn flush(&mut self) {
        self.ops.push(TrackOp::Flush);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_pin_tracks_edges() {
        let mut pin = MockPin::new();
        assert!(!pin.state);

        pin.set_high();
        assert!(pin.state);
        pin.set_high();
        pin.set_low();
        assert!(!pin.state);
        assert_eq!(pin.high_count, 2);
        assert_eq!(pin.low_count, 1);
    }

    #[test]
    fn mock_timer_logs_isr_writes_only() {
        let mut timer = MockTimer::new();
        timer.start(116).unwrap();
        assert!(timer.running);
        assert!(timer.alarms.is_empty());

        timer.set_alarm_us(196);
        timer.set_alarm_us(116);
        assert_eq!(timer.alarms, vec![196, 116]);
        assert_eq!(timer.period_us, 116);

        timer.rearm();
        assert_eq!(timer.rearm_count, 1);

        timer.stop().unwrap();
        assert!(!timer.running);
    }

    #[test]
    fn mock_sense_scripts_windows() {
        let mut sense = MockCurrentSense::new();
        sense.queue_window(150);
        assert_eq!(sense.samples.len(), usize::from(CV_SAMPLE_COUNT));
        assert_eq!(sense.read_raw(), 150);

        sense.samples.clear();
        sense.queue_silent_window();
        assert_eq!(sense.read_raw(), 0);
    }

    #[test]
    fn mock_delay_totals() {
        let mut delay = MockDelay::new();
        delay.delay_ms(2);
        delay.delay_ms(10);
        assert_eq!(delay.calls, vec![2, 10]);
        assert_eq!(delay.total_ms(), 12);
    }

    #[test]
    fn mock_track_records_choreography() {
        let mut track = MockTrack::new();
        track.send(&[0x00, 0x00], 1).unwrap();
        track.send(&[0x7C, 0x06, 0x55], 4).unwrap();
        track.flush();

        assert_eq!(track.sends().len(), 2);
        assert_eq!(track.sends()[1], (&[0x7C, 0x06, 0x55][..], 4));
        assert_eq!(track.flush_count(), 1);
    }
}
