//! Error types for the simulator's fallible surfaces.
//!
//! Transport failures on the send path are deliberately *not* routed through
//! these types: the sender swallows them, modeling message loss.

use std::fmt;
use std::io;

use crate::config::MemberId;

/// Errors surfaced by roster construction, binding, and framing.
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure (bind, connect, read, write).
    Io(io::Error),
    /// A frame arrived that does not decode into a known message.
    Codec(serde_json::Error),
    /// A member id was requested that the roster does not contain.
    UnknownPeer(MemberId),
    /// A member id without the required numeric suffix.
    InvalidMemberId(String),
    /// A roster that cannot support an election: empty, or id numbers that
    /// are not unique single digits.
    InvalidRoster(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Codec(e) => write!(f, "message decode failed: {e}"),
            Error::UnknownPeer(id) => write!(f, "unknown peer: {id}"),
            Error::InvalidMemberId(id) => write!(f, "invalid member id: {id}"),
            Error::InvalidRoster(reason) => write!(f, "invalid roster: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e)
    }
}
