//! Core traits for hardware abstraction and the track seam.
//!
//! Hardware traits live in [`hardware`]; the [`Track`] seam that the CV
//! programming engines talk through lives in [`track`].
//!
//! [`Track`]: track::Track

/// Hardware abstractions: timers, pins, current sensing, delays.
pub mod hardware;
/// The track seam between protocol engines and a signal generator.
pub mod track;

pub use hardware::{BitTimer, CurrentSense, Delay, DirectionPin};
pub use track::Track;
