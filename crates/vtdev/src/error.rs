//! The device error type.

use std::fmt;
use std::io;

/// Errors surfaced by terminal devices and the layers above them.
#[derive(Debug)]
pub enum TermError {
    /// Read or write failure on the underlying byte stream.
    Io(io::Error),
    /// An operation was issued in a state that cannot accept it, such
    /// as entering the alternate screen twice.
    InvalidState(&'static str),
    /// A malformed argument, such as a position outside every buffer.
    InvalidArgument(&'static str),
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "terminal I/O error: {err}"),
            Self::InvalidState(what) => write!(f, "invalid state: {what}"),
            Self::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
        }
    }
}

impl std::error::Error for TermError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidState(_) | Self::InvalidArgument(_) => None,
        }
    }
}

impl From<io::Error> for TermError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
