//! DCC bit timers over the ESP32 general-purpose hardware timers.

use crate::traits::BitTimer;
use crate::waveform::DCC_TIMER_PRESCALER;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;
use esp_idf_hal::timer::{config::Config as TimerConfig, Timer, TimerDriver};

/// One ESP32 hardware timer prescaled so that one tick equals 1 µs
/// (80 MHz APB / 80).
///
/// The full-cycle timer of each generator is constructed auto-reloading;
/// the pulse timer is one-shot and gets rearmed from inside the full-cycle
/// ISR.
pub struct Esp32BitTimer<'d> {
    driver: TimerDriver<'d>,
}

impl<'d> Esp32BitTimer<'d> {
    /// Claims a timer peripheral at the DCC prescale.
    ///
    /// # Errors
    ///
    /// Returns an error if the timer driver cannot be initialized.
    pub fn new(
        timer: impl Peripheral<P = impl Timer> + 'd,
        auto_reload: bool,
    ) -> Result<Self, EspError> {
        let config = TimerConfig::new()
            .divider(DCC_TIMER_PRESCALER)
            .auto_reload(auto_reload);
        Ok(Self {
            driver: TimerDriver::new(timer, &config)?,
        })
    }

    /// Attaches `callback` to the timer's alarm interrupt.
    ///
    /// # Safety
    ///
    /// `callback` runs in interrupt context: it must not allocate, block,
    /// or call non-ISR-safe ESP-IDF services.
    pub unsafe fn subscribe(
        &mut self,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<(), EspError> {
        self.driver.subscribe(callback)
    }
}

impl BitTimer for Esp32BitTimer<'_> {
    type Error = EspError;

    fn start(&mut self, period_us: u64) -> Result<(), EspError> {
        self.driver.set_counter(0)?;
        self.driver.set_alarm(period_us)?;
        self.driver.enable_interrupt()?;
        self.driver.enable_alarm(true)?;
        self.driver.enable(true)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EspError> {
        self.driver.enable(false)?;
        self.driver.enable_alarm(false)?;
        self.driver.disable_interrupt()?;
        Ok(())
    }

    fn set_alarm_us(&mut self, period_us: u64) {
        // register write; failure is not reportable from the ISR
        let _ = self.driver.set_alarm(period_us);
    }

    fn rearm(&mut self) {
        let _ = self.driver.set_counter(0);
        let _ = self.driver.enable_alarm(true);
    }
}
