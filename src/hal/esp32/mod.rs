//! ESP32 hardware abstraction layer for the DCC base station.
//!
//! The classic ESP32 has four general-purpose hardware timers, exactly
//! enough for two signal generators (full-cycle plus pulse timer each).
//! Both generators live in `critical_section` statics so the timer ISRs
//! and the foreground task share them safely: every access, from either
//! side, briefly masks interrupts. Blocking choreography (pool waits,
//! queue drains, the stop settle window) happens between those critical
//! sections so interrupts are never masked across a sleep.
//!
//! # Typical bring-up
//!
//! ```ignore
//! use esp_idf_hal::peripherals::Peripherals;
//! use rs_dcc::hal::esp32;
//! use rs_dcc::TrackId;
//!
//! let p = Peripherals::take()?;
//! esp32::configure_ops(p.pins.gpio25.downgrade_output(), p.timer00, p.timer01)?;
//! esp32::configure_prog(p.pins.gpio23.downgrade_output(), p.timer10, p.timer11)?;
//! esp32::load_packet(TrackId::Ops, &[0x03, 0x3F, 0x80], 0)?;
//! ```

mod adc;
mod timer;

pub use adc::Esp32CurrentSense;
pub use timer::Esp32BitTimer;

use crate::config::{TrackId, OPS_QUEUE_DEPTH, PROG_QUEUE_DEPTH};
use crate::generator::{SignalGenerator, POOL_POLL_MS, QUEUE_POLL_MS, STOP_SETTLE_MS};
use crate::traits::{Delay, DirectionPin, Track};
use crate::Error;
use core::cell::RefCell;
use critical_section::Mutex;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;
use esp_idf_hal::timer::Timer;

/// Default wiring for the station.
pub mod pins {
    /// Operations track direction signal.
    pub const OPS_SIGNAL: i32 = 25;

    /// Programming track direction signal.
    pub const PROG_SIGNAL: i32 = 23;

    /// Operations motor board current sense (ADC1 channel 0).
    pub const OPS_CURRENT_SENSE: i32 = 36;

    /// Programming motor board current sense (ADC1 channel 3).
    pub const PROG_CURRENT_SENSE: i32 = 39;
}

impl DirectionPin for PinDriver<'_, AnyOutputPin, Output> {
    fn set_high(&mut self) {
        // register write; failure is not reportable from the ISR
        let _ = PinDriver::set_high(self);
    }

    fn set_low(&mut self) {
        let _ = PinDriver::set_low(self);
    }
}

impl Delay for FreeRtos {
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

type TrackPin = PinDriver<'static, AnyOutputPin, Output>;
type OpsGenerator = SignalGenerator<TrackPin, Esp32BitTimer<'static>, OPS_QUEUE_DEPTH>;
type ProgGenerator = SignalGenerator<TrackPin, Esp32BitTimer<'static>, PROG_QUEUE_DEPTH>;

static OPS_TRACK: Mutex<RefCell<Option<OpsGenerator>>> = Mutex::new(RefCell::new(None));
static PROG_TRACK: Mutex<RefCell<Option<ProgGenerator>>> = Mutex::new(RefCell::new(None));

/// Runs `$body` against the chosen generator under a critical section.
/// Yields `None` when that track has not been configured.
macro_rules! with_track {
    ($track:expr, $generator:ident => $body:expr) => {
        match $track {
            TrackId::Ops => critical_section::with(|cs| {
                OPS_TRACK.borrow_ref_mut(cs).as_mut().map(|$generator| $body)
            }),
            TrackId::Prog => critical_section::with(|cs| {
                PROG_TRACK
                    .borrow_ref_mut(cs)
                    .as_mut()
                    .map(|$generator| $body)
            }),
        }
    };
}

fn ops_full_cycle_isr() {
    critical_section::with(|cs| {
        if let Some(generator) = OPS_TRACK.borrow_ref_mut(cs).as_mut() {
            generator.on_full_cycle();
        }
    });
}

fn ops_pulse_isr() {
    critical_section::with(|cs| {
        if let Some(generator) = OPS_TRACK.borrow_ref_mut(cs).as_mut() {
            generator.on_pulse();
        }
    });
}

fn prog_full_cycle_isr() {
    critical_section::with(|cs| {
        if let Some(generator) = PROG_TRACK.borrow_ref_mut(cs).as_mut() {
            generator.on_full_cycle();
        }
    });
}

fn prog_pulse_isr() {
    critical_section::with(|cs| {
        if let Some(generator) = PROG_TRACK.borrow_ref_mut(cs).as_mut() {
            generator.on_pulse();
        }
    });
}

/// Claims the operations track: direction pin low then output, both timers
/// subscribed, the generator installed, and the signal started (power-on
/// resets and idles included).
///
/// # Errors
///
/// Returns an error if pin or timer setup fails; the generator is not
/// installed in that case.
pub fn configure_ops(
    pin: AnyOutputPin,
    full_cycle: impl Peripheral<P = impl Timer> + 'static,
    pulse: impl Peripheral<P = impl Timer> + 'static,
) -> Result<(), EspError> {
    let mut pin = PinDriver::output(pin)?;
    let _ = PinDriver::set_low(&mut pin);

    let mut full_cycle = Esp32BitTimer::new(full_cycle, true)?;
    let mut pulse = Esp32BitTimer::new(pulse, false)?;
    unsafe {
        full_cycle.subscribe(ops_full_cycle_isr)?;
        pulse.subscribe(ops_pulse_isr)?;
    }

    let generator = SignalGenerator::new(TrackId::Ops.name(), pin, full_cycle, pulse);
    critical_section::with(|cs| {
        OPS_TRACK.borrow_ref_mut(cs).replace(generator);
    });
    start(TrackId::Ops)
}

/// Claims the programming track. See [`configure_ops`].
///
/// # Errors
///
/// Returns an error if pin or timer setup fails; the generator is not
/// installed in that case.
pub fn configure_prog(
    pin: AnyOutputPin,
    full_cycle: impl Peripheral<P = impl Timer> + 'static,
    pulse: impl Peripheral<P = impl Timer> + 'static,
) -> Result<(), EspError> {
    let mut pin = PinDriver::output(pin)?;
    let _ = PinDriver::set_low(&mut pin);

    let mut full_cycle = Esp32BitTimer::new(full_cycle, true)?;
    let mut pulse = Esp32BitTimer::new(pulse, false)?;
    unsafe {
        full_cycle.subscribe(prog_full_cycle_isr)?;
        pulse.subscribe(prog_pulse_isr)?;
    }

    let generator = SignalGenerator::new(TrackId::Prog.name(), pin, full_cycle, pulse);
    critical_section::with(|cs| {
        PROG_TRACK.borrow_ref_mut(cs).replace(generator);
    });
    start(TrackId::Prog)
}

/// Queues the boot sequence and arms the waveform timers.
///
/// # Errors
///
/// Propagates timer failures; a no-op for an unconfigured track.
pub fn start(track: TrackId) -> Result<(), EspError> {
    match with_track!(track, generator => generator.start()) {
        Some(result) => result,
        None => Ok(()),
    }
}

/// Stops the waveform, waits out the 250 ms quiescence window, then
/// reclaims every packet slot.
///
/// # Errors
///
/// Propagates timer failures; the queues are not drained in that case.
pub fn stop(track: TrackId) -> Result<(), EspError> {
    match with_track!(track, generator => generator.halt()) {
        Some(result) => result?,
        None => return Ok(()),
    }
    FreeRtos::delay_ms(STOP_SETTLE_MS);
    let _ = with_track!(track, generator => generator.drain());
    Ok(())
}

/// Serializes and queues a packet, sleeping in 2 ms steps while the pool
/// is momentarily exhausted.
///
/// # Errors
///
/// [`Error::InvalidPayloadLen`] for payloads outside 2..=5 bytes.
pub fn load_packet(track: TrackId, payload: &[u8], repeats: u8) -> Result<(), Error> {
    loop {
        match with_track!(track, generator => generator.try_load(payload, repeats)) {
            Some(Err(Error::PoolExhausted)) => FreeRtos::delay_ms(POOL_POLL_MS),
            Some(other) => return other,
            None => return Ok(()),
        }
    }
}

/// True when nothing is waiting behind the packet on the wire.
pub fn is_empty(track: TrackId) -> bool {
    with_track!(track, generator => generator.is_empty()).unwrap_or(true)
}

/// Polls until the pending queue is empty, sleeping 10 ms between checks.
pub fn wait_empty(track: TrackId) {
    while !is_empty(track) {
        FreeRtos::delay_ms(QUEUE_POLL_MS);
    }
}

/// [`Track`] handle for the operations line, backed by the global
/// generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpsTrack;

impl Track for OpsTrack {
    type Error = Error;

    fn send(&mut self, payload: &[u8], repeats: u8) -> Result<(), Error> {
        load_packet(TrackId::Ops, payload, repeats)
    }

    fn flush(&mut self) {
        wait_empty(TrackId::Ops);
    }
}

/// [`Track`] handle for the programming track, backed by the global
/// generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProgTrack;

impl Track for ProgTrack {
    type Error = Error;

    fn send(&mut self, payload: &[u8], repeats: u8) -> Result<(), Error> {
        load_packet(TrackId::Prog, payload, repeats)
    }

    fn flush(&mut self) {
        wait_empty(TrackId::Prog);
    }
}
