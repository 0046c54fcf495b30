//! Error types for beamtrace

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceError {
    #[error("ray direction must be a non-zero, finite vector")]
    InvalidDirection,

    #[error("surface normal must be a non-zero, finite vector")]
    InvalidNormal,

    #[error("acceptance half-angle must lie strictly between 0 and pi/2")]
    InvalidAcceptanceAngle,

    #[error("the bounce limit must be at least 1")]
    InvalidBounceLimit,

    #[error("the self-intersection guard must be positive and finite")]
    InvalidEpsilon,

    #[error("no reflector at index {0}")]
    UnknownReflector(usize),

    #[error("no beam at index {0}")]
    UnknownBeam(usize),

    #[error("an alignment scan needs at least one step per axis")]
    EmptyScan,
}

pub type Result<T> = std::result::Result<T, TraceError>;
