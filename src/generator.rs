//! Per-track DCC signal generator.
//!
//! A [`SignalGenerator`] owns everything one physical track output needs:
//! the pre-allocated packet pool (a free set and a pending FIFO), the idle
//! packet played in place when nothing is queued, the direction pin, and
//! the two hardware timers shaping the bit cells.
//!
//! # Concurrency
//!
//! The generator is written for a single foreground task plus the two timer
//! ISRs. Foreground code calls [`try_load`], [`start`], [`halt`] and
//! [`drain`]; the ISRs call [`on_full_cycle`] and [`on_pulse`]. Platform
//! glue is responsible for making those two sides exclusive, either by
//! owning the generator inside a `critical_section::Mutex` (see
//! `hal::esp32`) or by driving everything from one thread in tests. The
//! ISR paths never allocate and do a bounded amount of work.
//!
//! # Pool accounting
//!
//! A pool of `N - 1` packets is filled into the free queue at construction
//! (heapless queues store one element fewer than their const capacity).
//! Slots only ever migrate free → pending → in-flight → free, so
//! `free + pending + in-flight` is constant for the life of the generator.
//!
//! [`try_load`]: SignalGenerator::try_load
//! [`start`]: SignalGenerator::start
//! [`halt`]: SignalGenerator::halt
//! [`drain`]: SignalGenerator::drain
//! [`on_full_cycle`]: SignalGenerator::on_full_cycle
//! [`on_pulse`]: SignalGenerator::on_pulse

use crate::packet::{Packet, IDLE_PAYLOAD, RESET_PAYLOAD};
use crate::traits::{BitTimer, Delay, DirectionPin};
use crate::waveform::BitShape;
use crate::Error;
use heapless::spsc::Queue;
use log::{debug, info};

/// Power-on reset packet repeat count (S-9.2.4 section A: at least 20 reset
/// packets on initialization force decoders out of service mode).
pub const BOOT_RESET_REPEATS: u8 = 20;

/// Power-on idle packet repeat count (S-9.2.4 section A).
pub const BOOT_IDLE_REPEATS: u8 = 10;

/// Foreground poll period while the free set is empty, in milliseconds.
pub const POOL_POLL_MS: u32 = 2;

/// Foreground poll period while draining the pending queue, in milliseconds.
pub const QUEUE_POLL_MS: u32 = 10;

/// Quiescence window after stopping the timers, before packet slots are
/// reclaimed, in milliseconds.
pub const STOP_SETTLE_MS: u32 = 250;

/// What the ISR is currently transmitting.
enum Playing {
    /// Between packets; the next full-cycle tick selects a new one.
    None,
    /// A packet checked out of the pool.
    Pool(Packet),
    /// The idle singleton, aliased in place. Never returned to the pool.
    Idle,
}

/// One physical track output: pool, queues, pin, and timer pair.
///
/// `N` is the queue storage size; the usable pool holds `N - 1` packets.
/// The operations track uses a large pool (see
/// [`OPS_QUEUE_DEPTH`](crate::config::OPS_QUEUE_DEPTH)), the programming
/// track a small one.
///
/// # Example
///
/// ```rust
/// use rs_dcc::generator::SignalGenerator;
/// use rs_dcc::hal::mock::{MockPin, MockTimer};
///
/// let mut track: SignalGenerator<MockPin, MockTimer, 9> =
///     SignalGenerator::new("PROG", MockPin::new(), MockTimer::new(), MockTimer::new());
/// assert_eq!(track.pool_size(), 8);
/// assert_eq!(track.free_len(), 8);
///
/// track.try_load(&[0x00, 0x00], 3).unwrap();
/// assert_eq!(track.pending_len(), 1);
/// ```
pub struct SignalGenerator<P: DirectionPin, T: BitTimer, const N: usize> {
    name: &'static str,
    pin: P,
    full_cycle: T,
    pulse: T,
    free: Queue<Packet, N>,
    pending: Queue<Packet, N>,
    playing: Playing,
    idle: Packet,
    running: bool,
}

impl<P: DirectionPin, T: BitTimer, const N: usize> SignalGenerator<P, T, N> {
    /// Creates a generator with a full free set and the direction pin driven
    /// low. The pin must already be configured as an output; the timers must
    /// already have their ISRs attached but not be running.
    pub fn new(name: &'static str, mut pin: P, full_cycle: T, pulse: T) -> Self {
        let mut free: Queue<Packet, N> = Queue::new();
        while free.enqueue(Packet::default()).is_ok() {}

        // held low until the first full-cycle tick takes over
        pin.set_low();

        Self {
            name,
            pin,
            full_cycle,
            pulse,
            free,
            pending: Queue::new(),
            playing: Playing::None,
            idle: Packet::idle(),
            running: false,
        }
    }

    /// Queues the mandatory power-on sequence (20 resets then 10 idles) and
    /// arms both timers at the "1" bit shape.
    ///
    /// # Errors
    ///
    /// Propagates timer start failures; the generator is not marked running
    /// in that case.
    pub fn start(&mut self) -> Result<(), T::Error> {
        info!("[{}] queueing power-on reset and idle packets", self.name);
        // the pool is full here (fresh construction or a drained stop), so
        // these cannot fail
        let _ = self.try_load(&RESET_PAYLOAD, BOOT_RESET_REPEATS);
        let _ = self.try_load(&IDLE_PAYLOAD, BOOT_IDLE_REPEATS);

        info!("[{}] arming waveform timers", self.name);
        self.full_cycle.start(BitShape::ONE.cell_us)?;
        self.pulse.start(BitShape::ONE.pulse_us)?;
        self.running = true;
        Ok(())
    }

    /// Stops both timers. Call [`drain`](Self::drain) after a quiescence
    /// delay of at least 250 ms so an in-flight ISR cannot touch reclaimed
    /// slots.
    pub fn halt(&mut self) -> Result<(), T::Error> {
        info!("[{}] stopping waveform timers", self.name);
        self.full_cycle.stop()?;
        self.pulse.stop()?;
        self.running = false;
        Ok(())
    }

    /// Reclaims the in-flight packet and every pending packet into the free
    /// set, zeroing their bodies. Only call once the timers are stopped and
    /// settled.
    pub fn drain(&mut self) {
        if let Playing::Pool(mut packet) = core::mem::replace(&mut self.playing, Playing::None) {
            packet.clear();
            let _ = self.free.enqueue(packet);
        }
        self.playing = Playing::None;

        while let Some(mut packet) = self.pending.dequeue() {
            packet.clear();
            let _ = self.free.enqueue(packet);
        }
        debug!("[{}] drained, {} packets free", self.name, self.free.len());
    }

    /// Stops the generator: timers off, 250 ms settle, queues drained.
    ///
    /// # Errors
    ///
    /// Propagates timer stop failures before any slot is reclaimed.
    pub fn stop(&mut self, delay: &mut impl Delay) -> Result<(), T::Error> {
        self.halt()?;
        delay.delay_ms(STOP_SETTLE_MS);
        self.drain();
        Ok(())
    }

    /// Serializes `payload` into a free slot and queues it for transmission,
    /// without blocking.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPayloadLen`] for payloads outside 2..=5 bytes
    /// - [`Error::PoolExhausted`] when no free slot is available right now
    pub fn try_load(&mut self, payload: &[u8], repeats: u8) -> Result<(), Error> {
        if !(crate::packet::MIN_PAYLOAD_BYTES..=crate::packet::MAX_PAYLOAD_BYTES)
            .contains(&payload.len())
        {
            return Err(Error::InvalidPayloadLen(payload.len()));
        }

        let mut packet = self.free.dequeue().ok_or(Error::PoolExhausted)?;
        packet.encode_into(payload, repeats)?;

        debug!(
            "[{}] <* {:02X?} / {} / {}>",
            self.name,
            packet.frame(),
            packet.num_bits(),
            repeats
        );

        match self.pending.enqueue(packet) {
            Ok(()) => Ok(()),
            // unreachable by pool accounting; hand the slot back rather
            // than lose it
            Err(packet) => {
                let _ = self.free.enqueue(packet);
                Err(Error::PoolExhausted)
            }
        }
    }

    /// Like [`try_load`](Self::try_load) but sleeps in ~2 ms steps while the
    /// pool is exhausted. Packets drain at one per ≤196 µs, so the wait is
    /// short and self-correcting.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPayloadLen`] for payloads outside 2..=5 bytes.
    pub fn load_packet(
        &mut self,
        payload: &[u8],
        repeats: u8,
        delay: &mut impl Delay,
    ) -> Result<(), Error> {
        loop {
            match self.try_load(payload, repeats) {
                Err(Error::PoolExhausted) => delay.delay_ms(POOL_POLL_MS),
                other => return other,
            }
        }
    }

    /// True when no packet is waiting in the pending queue. The packet
    /// currently on the wire (and its remaining repeats) is not counted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Polls until the pending queue is empty, sleeping 10 ms between
    /// checks. Used by service-mode code to line ACK sampling up with the
    /// end of a packet burst.
    pub fn wait_empty(&mut self, delay: &mut impl Delay) {
        while !self.is_empty() {
            debug!(
                "[{}] waiting for {} packets to send...",
                self.name,
                self.pending.len()
            );
            delay.delay_ms(QUEUE_POLL_MS);
        }
    }

    /// Full-cycle timer ISR: selects the next bit, shapes both timers for
    /// it, rearms the pulse one-shot, and begins the positive half.
    ///
    /// ISR-safe: no allocation, bounded work.
    pub fn on_full_cycle(&mut self) {
        let shape = BitShape::for_bit(self.next_bit());
        self.pulse.set_alarm_us(shape.pulse_us);
        self.full_cycle.set_alarm_us(shape.cell_us);
        self.pulse.rearm();
        self.pin.set_high();
    }

    /// Pulse timer ISR: begins the negative half of the current bit cell.
    #[inline]
    pub fn on_pulse(&mut self) {
        self.pin.set_low();
    }

    /// Advances the bit serializer by one bit.
    ///
    /// Retires the current packet once its final repeat completes (pool
    /// packets go back to the free set, the idle singleton never does),
    /// then pulls the next pending packet, falling back to idle.
    pub fn next_bit(&mut self) -> bool {
        // retire the current packet once its pass (and repeats) are done
        let retire = match &mut self.playing {
            Playing::Pool(packet) => {
                if packet.pass_complete() && packet.repeats() > 0 {
                    packet.consume_repeat();
                }
                packet.pass_complete()
            }
            Playing::Idle => self.idle.pass_complete(),
            Playing::None => false,
        };
        if retire {
            match core::mem::replace(&mut self.playing, Playing::None) {
                Playing::Pool(mut done) => {
                    done.rewind();
                    let _ = self.free.enqueue(done);
                }
                // the idle singleton is aliased in place, never pooled
                Playing::Idle | Playing::None => {}
            }
        }

        if matches!(self.playing, Playing::None) {
            if let Some(packet) = self.pending.dequeue() {
                self.playing = Playing::Pool(packet);
            } else {
                self.idle.rewind();
                self.playing = Playing::Idle;
            }
        }

        match &mut self.playing {
            Playing::Pool(packet) => packet.next_bit(),
            Playing::Idle => self.idle.next_bit(),
            // a packet was installed just above; an empty pending queue
            // falls back to the idle singleton
            Playing::None => false,
        }
    }

    /// Generator name, used in log lines ("OPS", "PROG").
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Usable pool size (`N - 1`).
    #[inline]
    pub fn pool_size(&self) -> usize {
        N - 1
    }

    /// Free slots available to [`try_load`](Self::try_load).
    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Packets queued behind the one on the wire.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// 1 while a pool packet is on the wire, 0 between packets or while
    /// idling.
    #[inline]
    pub fn in_flight(&self) -> usize {
        matches!(self.playing, Playing::Pool(_)) as usize
    }

    /// True between [`start`](Self::start) and [`halt`](Self::halt).
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The direction pin, for inspection in tests.
    #[inline]
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// The full-cycle timer, for inspection in tests.
    #[inline]
    pub fn full_cycle_timer(&self) -> &T {
        &self.full_cycle
    }

    /// The pulse timer, for inspection in tests.
    #[inline]
    pub fn pulse_timer(&self) -> &T {
        &self.pulse
    }
}
