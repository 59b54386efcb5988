//! ESP32 DCC base station entry point.
//!
//! Brings up both signal generators (operations main line and programming
//! track), demonstrates a service-mode identity read and an ops-mode CV
//! write, then parks in a status loop. Higher layers (command parser,
//! throttles, web UI) hang off the same public API this binary exercises.
//!
//! # Hardware Setup
//!
//! - **MCU**: classic ESP32 (four general-purpose hardware timers)
//! - **Motor boards**: one H-bridge per track; direction inputs on GPIO25
//!   (OPS) and GPIO23 (PROG), current sense on GPIO36/GPIO39 (ADC1)
//!
//! # Build
//!
//! ```bash
//! cargo build --features esp32 --target xtensa-esp32-espidf
//! ```

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use log::info;
use rs_dcc::hal::esp32::{self, Esp32CurrentSense, OpsTrack, ProgTrack};
use rs_dcc::{CvProgrammer, OpsWriter, StationConfig, TrackId};

/// Status log interval in milliseconds.
const STATUS_INTERVAL_MS: u32 = 10_000;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("================================");
    info!("  rs-dcc base station");
    info!("================================");

    let config = StationConfig::default();
    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Signal generators (timers 0/1 for OPS, 2/3 for PROG)
    // =========================================================================
    esp32::configure_ops(
        peripherals.pins.gpio25.downgrade_output(),
        peripherals.timer00,
        peripherals.timer01,
    )?;
    info!("[OK] OPS generator running (GPIO25, 512-packet pool)");

    esp32::configure_prog(
        peripherals.pins.gpio23.downgrade_output(),
        peripherals.timer10,
        peripherals.timer11,
    )?;
    info!("[OK] PROG generator running (GPIO23, 64-packet pool)");

    // =========================================================================
    // Programming-track current sense (motor board ACK detection)
    // =========================================================================
    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let prog_sense = Esp32CurrentSense::new(&adc1, peripherals.pins.gpio39)?;
    info!("[OK] PROG current sense initialized (GPIO39 ADC)");

    let mut programmer =
        CvProgrammer::new(ProgTrack, prog_sense, FreeRtos, config.prog.max_milliamps);
    info!(
        "[OK] service mode ready, ack threshold {} counts",
        programmer.ack_threshold()
    );

    // =========================================================================
    // Demonstration: identify the decoder on the programming track
    // =========================================================================
    let manufacturer = programmer.read_cv(8);
    if manufacturer >= 0 {
        info!("[PROG] decoder manufacturer id: {}", manufacturer);
    } else {
        info!("[PROG] no decoder detected on programming track");
    }

    // Demonstration: ops-mode write, fire and forget
    let mut ops = OpsWriter::new(OpsTrack);
    ops.write_cv_byte(3, 3, 5); // loco 3: acceleration momentum

    // =========================================================================
    // Status loop
    // =========================================================================
    loop {
        FreeRtos::delay_ms(STATUS_INTERVAL_MS);
        info!(
            "[OPS] queue empty: {} / [PROG] queue empty: {}",
            esp32::is_empty(TrackId::Ops),
            esp32::is_empty(TrackId::Prog),
        );
    }
}
