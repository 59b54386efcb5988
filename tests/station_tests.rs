//! Full-stack tests: the CV programmer driving a real signal generator,
//! with the transmitted waveform decoded back from the timer log.
//!
//! The `PumpedTrack` stands in for the platform glue: `send` loads the
//! generator's pool and `flush` turns the ISR crank until the pending
//! queue has reached the rails, exactly what the hardware layer does with
//! real timers.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{bits_from, checksum_ok, parse_packets};
use rs_dcc::config::PROG_QUEUE_DEPTH;
use rs_dcc::generator::SignalGenerator;
use rs_dcc::hal::mock::{MockCurrentSense, MockDelay, MockPin, MockTimer};
use rs_dcc::service_mode::CvProgrammer;
use rs_dcc::traits::Track;
use rs_dcc::Error;

type ProgGenerator = SignalGenerator<MockPin, MockTimer, PROG_QUEUE_DEPTH>;

/// Drives the generator the way the platform glue does: loads on send,
/// cranks the ISRs on flush until everything queued has been transmitted.
struct PumpedTrack {
    generator: Rc<RefCell<ProgGenerator>>,
}

impl Track for PumpedTrack {
    type Error = Error;

    fn send(&mut self, payload: &[u8], repeats: u8) -> Result<(), Error> {
        self.generator.borrow_mut().try_load(payload, repeats)
    }

    fn flush(&mut self) {
        for _ in 0..200_000 {
            let mut generator = self.generator.borrow_mut();
            generator.on_full_cycle();
            generator.on_pulse();
            if generator.is_empty() && generator.in_flight() == 0 {
                return;
            }
        }
        panic!("pending queue never drained");
    }
}

fn prog_track() -> (Rc<RefCell<ProgGenerator>>, PumpedTrack) {
    let generator = Rc::new(RefCell::new(SignalGenerator::new(
        "PROG",
        MockPin::new(),
        MockTimer::new(),
        MockTimer::new(),
    )));
    let track = PumpedTrack {
        generator: generator.clone(),
    };
    (generator, track)
}

const RESET_FRAME: [u8; 3] = [0x00, 0x00, 0x00];

#[test]
fn failed_write_choreography_reaches_the_rails() {
    let (generator, track) = prog_track();
    // silent ADC: no decoder ever acknowledges
    let mut programmer =
        CvProgrammer::new(track, MockCurrentSense::new(), MockDelay::new(), 2000);

    assert!(!programmer.write_cv_byte(7, 0x55));

    let bits = bits_from(generator.borrow().full_cycle_timer());
    let packets = parse_packets(&bits);
    for (index, frame) in packets.iter().enumerate() {
        assert!(checksum_ok(frame), "bad checksum in frame {}", index);
    }

    let write_frames = packets
        .iter()
        .filter(|frame| frame[..3] == [0x7C, 0x06, 0x55])
        .count();
    let reset_frames = packets
        .iter()
        .filter(|frame| frame[..] == RESET_FRAME)
        .count();

    // 5 attempts of a 1-repeat reset (2 passes) and a 4-repeat write
    // (5 passes); the 3-repeat trailing resets of attempts 1-4 reach the
    // rails during the following attempt's flush (4 passes each). The
    // final attempt's trailing resets stay queued.
    assert_eq!(write_frames, 25);
    assert_eq!(reset_frames, 26);
}

#[test]
fn bitwise_read_choreography_reaches_the_rails() {
    let (generator, track) = prog_track();
    let mut sense = MockCurrentSense::new();
    // bit 0 acknowledges, bits 1..7 stay silent, the byte verify acknowledges
    sense.queue_window(200);
    for _ in 1..8 {
        sense.queue_silent_window();
    }
    sense.queue_window(200);

    let mut programmer = CvProgrammer::new(track, sense, MockDelay::new(), 2000);
    assert_eq!(programmer.read_cv(29), 1);

    let bits = bits_from(generator.borrow().full_cycle_timer());
    let packets = parse_packets(&bits);

    let probe_bit0 = packets
        .iter()
        .filter(|frame| frame[..3] == [0x78, 0x1C, 0xE8])
        .count();
    let verify_byte = packets
        .iter()
        .filter(|frame| frame[..3] == [0x74, 0x1C, 0x01])
        .count();
    let resets = packets
        .iter()
        .filter(|frame| frame[..] == RESET_FRAME)
        .count();

    // every probe burst is a 5-repeat packet (6 passes) preceded by a
    // 3-repeat reset (4 passes); nine bursts in total
    assert_eq!(probe_bit0, 6);
    assert_eq!(verify_byte, 6);
    assert_eq!(resets, 9 * 4);
}

#[test]
fn pool_is_intact_after_a_full_service_session() {
    let (generator, track) = prog_track();
    let mut programmer =
        CvProgrammer::new(track, MockCurrentSense::new(), MockDelay::new(), 2000);

    let _ = programmer.write_cv_byte(7, 0x55);
    let _ = programmer.read_cv(8);

    let mut delay = MockDelay::new();
    let mut generator = generator.borrow_mut();
    let pool = generator.pool_size();
    assert_eq!(
        generator.free_len() + generator.pending_len() + generator.in_flight(),
        pool
    );

    generator.stop(&mut delay).unwrap();
    assert!(generator.is_empty());
    assert_eq!(generator.free_len(), pool);
}
