//! Programming-track current sensing via the ESP32 oneshot ADC.
//!
//! The motor board scales its output current linearly onto a 0..3.3 V sense
//! output; a 12-bit raw read therefore maps the board's `max_milliamps`
//! onto 0..4095 counts, which is what the ACK threshold formula assumes.

use crate::traits::CurrentSense;
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::gpio::ADCPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

/// Motor board current-sense channel.
///
/// # Example
///
/// ```ignore
/// use esp_idf_hal::adc::oneshot::AdcDriver;
/// use esp_idf_hal::peripherals::Peripherals;
/// use rs_dcc::hal::esp32::Esp32CurrentSense;
///
/// let peripherals = Peripherals::take()?;
/// let adc1 = AdcDriver::new(peripherals.adc1)?;
/// let mut sense = Esp32CurrentSense::new(&adc1, peripherals.pins.gpio39)?;
/// ```
pub struct Esp32CurrentSense<'d, P: ADCPin> {
    channel: AdcChannelDriver<'d, P, &'d AdcDriver<'d, P::Adc>>,
}

impl<'d, P: ADCPin> Esp32CurrentSense<'d, P> {
    /// Claims the sense pin on the given ADC unit at 11 dB attenuation
    /// (full 0..3.3 V range).
    ///
    /// # Errors
    ///
    /// Returns an error if ADC channel initialization fails.
    pub fn new(
        adc: &'d AdcDriver<'d, P::Adc>,
        pin: impl Peripheral<P = P> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        Ok(Self {
            channel: AdcChannelDriver::new(adc, pin, &config)?,
        })
    }
}

impl<P: ADCPin> CurrentSense for Esp32CurrentSense<'_, P> {
    fn read_raw(&mut self) -> u16 {
        // failed conversions read as 0 and are discarded by the averaging
        self.channel.read().unwrap_or(0)
    }
}
