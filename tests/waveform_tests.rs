//! Waveform-level tests: what actually goes out on the direction pin,
//! reconstructed from the full-cycle timer's alarm log.

mod common;

use common::{bits_from, checksum_ok, parse_packets};
use rs_dcc::generator::SignalGenerator;
use rs_dcc::hal::mock::{MockDelay, MockPin, MockTimer};
use rs_dcc::waveform::BitShape;
use rs_dcc::{Error, RESET_PAYLOAD};

type TestGenerator = SignalGenerator<MockPin, MockTimer, 9>;

fn generator() -> TestGenerator {
    SignalGenerator::new("TEST", MockPin::new(), MockTimer::new(), MockTimer::new())
}

fn pump(generator: &mut TestGenerator, cells: usize) {
    for _ in 0..cells {
        generator.on_full_cycle();
        generator.on_pulse();
    }
}

const RESET_FRAME: [u8; 3] = [0x00, 0x00, 0x00];
const IDLE_FRAME: [u8; 3] = [0xFF, 0x00, 0xFF];

#[test]
fn boot_stream_is_resets_then_idles_then_idle_fill() {
    let mut generator = generator();
    generator.start().unwrap();

    // 21 reset passes + 11 idle passes at 49 bits each, plus idle fill
    pump(&mut generator, 2000);

    let packets = parse_packets(&bits_from(generator.full_cycle_timer()));
    assert!(packets.len() > 34, "only {} packets decoded", packets.len());

    for (index, frame) in packets.iter().enumerate() {
        assert!(checksum_ok(frame), "bad checksum in frame {}", index);
        if index < 21 {
            assert_eq!(frame[..], RESET_FRAME, "frame {} should be a reset", index);
        } else if index < 32 {
            assert_eq!(frame[..], IDLE_FRAME, "frame {} should be an idle", index);
        } else {
            // nothing queued: the idle singleton fills the line
            assert_eq!(frame[..], IDLE_FRAME, "frame {} should be idle fill", index);
        }
    }
}

#[test]
fn empty_queue_transmits_idle_forever() {
    let mut generator = generator();
    pump(&mut generator, 49 * 6 + 1);

    let packets = parse_packets(&bits_from(generator.full_cycle_timer()));
    assert_eq!(packets.len(), 6);
    for frame in &packets {
        assert_eq!(frame[..], IDLE_FRAME);
    }
    // the idle singleton never borrows from the pool
    assert_eq!(generator.free_len(), generator.pool_size());
}

#[test]
fn long_address_ops_frame_on_the_wire() {
    let mut generator = generator();
    // loco 3000, CV 29 := 0x06, as the ops-mode writer would queue it
    generator.try_load(&[0xCB, 0xB8, 0xEC, 0x1C, 0x06], 0).unwrap();

    pump(&mut generator, 76 + 49);
    let packets = parse_packets(&bits_from(generator.full_cycle_timer()));

    let frame = &packets[0];
    assert_eq!(frame[..5], [0xCB, 0xB8, 0xEC, 0x1C, 0x06]);
    assert_eq!(frame[5], 0xCB ^ 0xB8 ^ 0xEC ^ 0x1C ^ 0x06);
    assert!(checksum_ok(frame));
}

#[test]
fn pulse_timer_always_shadows_half_the_cell() {
    let mut generator = generator();
    generator.try_load(&[0x03, 0x3F, 0x80], 1).unwrap();
    pump(&mut generator, 300);

    let cells = &generator.full_cycle_timer().alarms;
    let pulses = &generator.pulse_timer().alarms;
    assert_eq!(cells.len(), pulses.len());
    for (cell, pulse) in cells.iter().zip(pulses) {
        assert_eq!(pulse * 2, *cell, "bit cell must have 50% duty");
    }
    assert_eq!(
        generator.pulse_timer().rearm_count as usize,
        cells.len(),
        "the pulse one-shot is rearmed every cell"
    );
}

#[test]
fn direction_pin_toggles_once_per_half_cell() {
    let mut generator = generator();
    pump(&mut generator, 100);

    let pin = generator.pin();
    // one rising edge per full-cycle tick, one falling per pulse tick,
    // plus the initial low from construction
    assert_eq!(pin.high_count, 100);
    assert_eq!(pin.low_count, 101);
    assert!(!pin.state);
}

#[test]
fn first_armed_periods_use_the_one_shape() {
    let mut generator = generator();
    generator.start().unwrap();
    assert_eq!(generator.full_cycle_timer().period_us, BitShape::ONE.cell_us);
    assert_eq!(generator.pulse_timer().period_us, BitShape::ONE.pulse_us);
}

#[test]
fn packets_conserved_through_start_run_stop() {
    let mut generator = generator();
    let mut delay = MockDelay::new();
    let pool = generator.pool_size();
    generator.start().unwrap();

    for i in 0..400 {
        generator.on_full_cycle();
        if i % 97 == 0 {
            // interleave foreground loads with the ISR
            let _ = generator.try_load(&RESET_PAYLOAD, 1);
        }
        assert_eq!(
            generator.free_len() + generator.pending_len() + generator.in_flight(),
            pool
        );
    }

    generator.stop(&mut delay).unwrap();
    assert!(generator.is_empty());
    assert_eq!(generator.free_len(), pool);
}

#[test]
fn overfilling_the_pool_reports_exhaustion() {
    let mut generator = generator();
    let pool = generator.pool_size();
    for _ in 0..pool {
        generator.try_load(&RESET_PAYLOAD, 0).unwrap();
    }
    assert_eq!(
        generator.try_load(&RESET_PAYLOAD, 0),
        Err(Error::PoolExhausted)
    );

    // one full packet later a slot is free again
    pump(&mut generator, 50);
    generator.try_load(&RESET_PAYLOAD, 0).unwrap();
}
