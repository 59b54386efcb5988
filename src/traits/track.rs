//! The track seam between the CV programming engines and a signal
//! generator.
//!
//! Service-mode choreography is "send these packets, wait until they are on
//! the rails, then sample current". [`Track`] captures exactly that pair of
//! operations so the protocol engines can run against real hardware, a
//! recording mock, or a simulated decoder.

/// One track output accepting serialized packet payloads.
///
/// Implementations append the XOR checksum and preamble themselves (via the
/// packet serializer); callers hand over the raw payload bytes only.
pub trait Track {
    /// Error type for the send path.
    type Error;

    /// Queues `payload` for transmission, repeated `repeats` additional
    /// times after the first pass. Blocks briefly when the packet pool is
    /// momentarily exhausted.
    fn send(&mut self, payload: &[u8], repeats: u8) -> Result<(), Self::Error>;

    /// Returns once every queued packet has begun transmission, so that a
    /// following ACK sampling window lines up with the decoder's response.
    fn flush(&mut self);
}
