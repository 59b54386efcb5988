//! Hardware abstraction traits for waveform timers, the track direction
//! pin, current sensing, and blocking delays.
//!
//! This module defines the hardware interfaces that allow rs-dcc to work
//! across different platforms (ESP32, desktop mocks, etc.).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`DirectionPin`] | H-bridge direction GPIO toggled by the waveform ISRs |
//! | [`BitTimer`] | Microsecond-resolution hardware timer with an alarm |
//! | [`CurrentSense`] | Raw ADC reads for decoder ACK detection |
//! | [`Delay`] | Blocking millisecond delay for foreground polling |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations from
//! [`crate::hal::mock`]. For ESP32 hardware, use the implementations from
//! `hal::esp32` (requires the `esp32` feature).

/// The GPIO that feeds the H-bridge direction input.
///
/// Because DCC is differential across the bridge outputs, toggling this
/// single pin inverts track polarity; the ISRs drive it high at the start
/// of each bit cell and low at the mid-point.
///
/// Both methods are called from interrupt context and must be infallible
/// register writes.
pub trait DirectionPin {
    /// Drives the pin high (positive half of the bit cell).
    fn set_high(&mut self);

    /// Drives the pin low (negative half of the bit cell).
    fn set_low(&mut self);
}

/// A hardware timer ticking at 1 µs with a programmable alarm.
///
/// Each signal generator owns two: an auto-reloading full-cycle timer that
/// fires at every bit cell boundary, and a one-shot pulse timer rearmed
/// from inside the full-cycle ISR. Whether the alarm auto-reloads is fixed
/// when the concrete timer is constructed.
///
/// ISR subscription is a platform concern and happens at construction
/// time; see `hal::esp32::Esp32BitTimer`.
pub trait BitTimer {
    /// Error type for lifecycle operations.
    type Error;

    /// Zeroes the counter, programs the alarm to `period_us`, and starts
    /// counting with the alarm and its interrupt enabled.
    fn start(&mut self, period_us: u64) -> Result<(), Self::Error>;

    /// Stops counting and disables the alarm and its interrupt.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Reprograms the alarm period. Called from interrupt context; must be
    /// an infallible register write.
    fn set_alarm_us(&mut self, period_us: u64);

    /// Zeroes the counter and re-enables the alarm for one more shot.
    /// Called from interrupt context.
    fn rearm(&mut self);
}

/// Raw current reads from the motor board's sense ADC.
///
/// A decoder acknowledges a service-mode operation by drawing at least
/// 60 mA above baseline for at least 6 ms; [`CvProgrammer`] averages a
/// burst of these reads against a board-specific threshold.
///
/// [`CvProgrammer`]: crate::service_mode::CvProgrammer
pub trait CurrentSense {
    /// Returns one 12-bit sample (0..=4095). A reading of 0 means the
    /// conversion failed and is discarded by the averaging logic.
    fn read_raw(&mut self) -> u16;
}

/// Blocking millisecond delay for foreground polling loops.
///
/// Used while waiting for a free packet slot, for the pending queue to
/// drain, and between ACK current samples. Never used from an ISR.
pub trait Delay {
    /// Sleeps for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
