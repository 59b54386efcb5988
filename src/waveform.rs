//! DCC bit cell timing shapes.
//!
//! Every DCC bit is a bipolar square cell with 50% duty: the direction pin
//! goes high at the start of the cell and low at the mid-point. Only the
//! cell length distinguishes a "1" from a "0".

/// Hardware timer prescaler so that one timer tick equals 1 µs
/// (80 MHz APB clock / 80).
pub const DCC_TIMER_PRESCALER: u32 = 80;

/// Timer periods for one DCC bit cell, in microseconds.
///
/// `cell_us` programs the auto-reloading full-cycle timer; `pulse_us`
/// programs the one-shot pulse timer that ends the positive half.
///
/// # Example
///
/// ```rust
/// use rs_dcc::waveform::BitShape;
///
/// assert_eq!(BitShape::for_bit(true), BitShape::ONE);
/// assert_eq!(BitShape::ONE.cell_us, 116);
/// assert_eq!(BitShape::ZERO.pulse_us, 98);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitShape {
    /// Full bit cell duration in microseconds.
    pub cell_us: u64,
    /// Positive half duration in microseconds.
    pub pulse_us: u64,
}

impl BitShape {
    /// Shape of a DCC "1" bit: 116 µs cell, 58 µs halves.
    pub const ONE: Self = Self {
        cell_us: 116,
        pulse_us: 58,
    };

    /// Shape of a DCC "0" bit: 196 µs cell, 98 µs halves.
    pub const ZERO: Self = Self {
        cell_us: 196,
        pulse_us: 98,
    };

    /// Selects the shape for a bit value.
    #[inline]
    pub const fn for_bit(bit: bool) -> Self {
        if bit {
            Self::ONE
        } else {
            Self::ZERO
        }
    }
}
