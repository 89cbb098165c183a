//! Error types for cubemesh-topology.

use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised while building side tables or decoding paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A side table needs at least one side.
    #[error("side table must contain at least one side")]
    EmptySideTable,

    /// Direction codes are two bits wide.
    #[error("side table has {count} sides, at most {max} are addressable")]
    TooManySides { count: usize, max: usize },

    /// The path length is carried in a single byte on the wire.
    #[error("path of {len} steps exceeds the maximum of {max}")]
    PathTooLong { len: usize, max: usize },

    /// The asserted step count needs more packed bytes than were supplied.
    #[error("path asserts {asserted} steps but only {capacity} fit in the packed bytes")]
    PathOverflow { asserted: usize, capacity: usize },
}
