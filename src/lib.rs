//! # rs-dcc
//!
//! The hardware-timing core of an NMRA DCC (Digital Command Control) base
//! station: a bit-exact track waveform generator plus the service-mode and
//! operations-mode CV programming protocols.
//!
//! ## Features
//!
//! - **Waveform generation**: two hardware timers per track output drive a
//!   direction pin with the 58/116 µs ("1") and 98/196 µs ("0") DCC bit cells
//! - **Pre-allocated packet pool**: packets recycle between a free set and a
//!   pending queue; the timer ISR never allocates
//! - **Service mode**: CV read (bit-wise search), byte and bit writes with
//!   ACK detection through timed current sampling
//! - **Operations mode**: fire-and-forget CV writes addressed to a specific
//!   locomotive on the main line
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and track abstractions
//! - `packet` - DCC packet buffers, preamble/frame bit layout, XOR checksum
//! - `waveform` - Bit cell timing shapes shared by every timer backend
//! - `generator` - The per-track signal generator and its ISR entry points
//! - `service_mode` - CV programming over the isolated programming track
//! - `ops_mode` - CV writes to decoders on the main line
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_dcc::generator::SignalGenerator;
//! use rs_dcc::hal::mock::{MockPin, MockTimer};
//!
//! // A 17-slot queue holds a 16-packet pool.
//! let mut track: SignalGenerator<MockPin, MockTimer, 17> =
//!     SignalGenerator::new("OPS", MockPin::new(), MockTimer::new(), MockTimer::new());
//!
//! // Queue a speed packet for the decoder at address 3.
//! track.try_load(&[0x03, 0x3F, 0x80], 0).unwrap();
//! assert!(!track.is_empty());
//!
//! // The full-cycle timer ISR pulls one bit per cell and shapes the timers.
//! track.on_full_cycle();
//! track.on_pulse();
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

/// Track configuration and pool sizing.
pub mod config;
/// Per-track signal generator: packet pool, queues, and ISR entry points.
pub mod generator;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Operations-mode (main line) CV writes.
pub mod ops_mode;
/// DCC packet buffers and the preamble/frame bit layout.
pub mod packet;
/// Service-mode (programming track) CV reads and writes.
pub mod service_mode;
/// Core traits for hardware abstraction and the track seam.
pub mod traits;
/// DCC bit cell timing shapes.
pub mod waveform;

// Re-exports for convenience
pub use config::{StationConfig, TrackConfig, TrackId, OPS_POOL_SIZE, PROG_POOL_SIZE};
pub use generator::SignalGenerator;
pub use ops_mode::OpsWriter;
pub use packet::{Packet, IDLE_PAYLOAD, RESET_PAYLOAD};
pub use service_mode::CvProgrammer;
pub use traits::{BitTimer, CurrentSense, Delay, DirectionPin, Track};
pub use waveform::BitShape;

/// Errors surfaced by the packet serializer and the loading path.
///
/// Service-mode outcomes are not errors: a missing decoder acknowledgement
/// is reported through the return value (`-1` from a read, `false` from a
/// write) because it is an expected condition on an empty or occupied
/// programming track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Payload length outside the supported 2..=5 byte range
    /// (before the checksum byte is appended).
    InvalidPayloadLen(usize),
    /// No free packet slot available right now. Transient: the pool refills
    /// as the ISR finishes transmitting queued packets.
    PoolExhausted,
}
