//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits defined in
//! [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `esp32`: ESP32 timer/GPIO/ADC drivers (requires the `esp32` feature)

#[cfg(feature = "std")]
pub mod mock;

#[cfg(feature = "esp32")]
pub mod esp32;
