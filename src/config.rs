//! Track configuration and pool sizing.
//!
//! # Example
//!
//! ```rust
//! use rs_dcc::config::{StationConfig, TrackConfig};
//!
//! // Use defaults
//! let config = StationConfig::default();
//! assert_eq!(config.ops.max_milliamps, 5000);
//!
//! // Or customize
//! let config = StationConfig::default()
//!     .with_prog(TrackConfig::default().with_direction_pin(22).with_max_milliamps(300));
//! assert_eq!(config.prog.direction_pin, 22);
//! ```

/// Packet pool size for the operations (main line) track.
pub const OPS_POOL_SIZE: usize = 512;

/// Packet pool size for the programming track.
pub const PROG_POOL_SIZE: usize = 64;

/// Queue storage depth backing the operations pool (heapless queues store
/// one element fewer than their const capacity).
pub const OPS_QUEUE_DEPTH: usize = OPS_POOL_SIZE + 1;

/// Queue storage depth backing the programming pool.
pub const PROG_QUEUE_DEPTH: usize = PROG_POOL_SIZE + 1;

/// Identifies one of the two track outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TrackId {
    /// Main line: large packet pool, locomotives running.
    Ops,
    /// Isolated programming track: small pool, ACK current sensing.
    Prog,
}

impl TrackId {
    /// Motor board name for this track, as used in log lines.
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            TrackId::Ops => "OPS",
            TrackId::Prog => "PROG",
        }
    }
}

/// Per-track hardware configuration.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackConfig {
    /// GPIO number feeding the H-bridge direction input.
    pub direction_pin: i32,
    /// Motor board peak output current, used to derive the ACK threshold.
    pub max_milliamps: u16,
}

impl TrackConfig {
    /// Set the direction pin.
    pub fn with_direction_pin(mut self, pin: i32) -> Self {
        self.direction_pin = pin;
        self
    }

    /// Set the motor board current rating.
    pub fn with_max_milliamps(mut self, max_milliamps: u16) -> Self {
        self.max_milliamps = max_milliamps;
        self
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            direction_pin: 25,
            max_milliamps: 5000,
        }
    }
}

/// Complete base station configuration.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StationConfig {
    /// Operations track configuration.
    pub ops: TrackConfig,
    /// Programming track configuration.
    pub prog: TrackConfig,
}

impl StationConfig {
    /// Set the operations track configuration.
    pub fn with_ops(mut self, ops: TrackConfig) -> Self {
        self.ops = ops;
        self
    }

    /// Set the programming track configuration.
    pub fn with_prog(mut self, prog: TrackConfig) -> Self {
        self.prog = prog;
        self
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            ops: TrackConfig::default(),
            prog: TrackConfig {
                direction_pin: 23,
                max_milliamps: 250,
            },
        }
    }
}
