//! Definition of errors.

use std::error::Error;
use std::fmt;
use std::io;

/// A specialized Result type for this crate.
pub type Result<T, E = AcdatError> = std::result::Result<T, E>;

/// Errors in acdat.
#[derive(Debug)]
pub enum AcdatError {
    /// Contains [`PatternScaleError`].
    PatternScale(PatternScaleError),
    /// Contains [`AutomatonScaleError`].
    AutomatonScale(AutomatonScaleError),
    /// Contains [`UnsupportedValueTypeError`].
    UnsupportedValueType(UnsupportedValueTypeError),
    /// Contains [`CorruptStreamError`].
    CorruptStream(CorruptStreamError),
}

impl fmt::Display for AcdatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PatternScale(e) => e.fmt(f),
            Self::AutomatonScale(e) => e.fmt(f),
            Self::UnsupportedValueType(e) => e.fmt(f),
            Self::CorruptStream(e) => e.fmt(f),
        }
    }
}

impl Error for AcdatError {}

impl From<io::Error> for AcdatError {
    fn from(e: io::Error) -> Self {
        Self::CorruptStream(CorruptStreamError {
            msg: e.to_string(),
        })
    }
}

impl AcdatError {
    pub(crate) fn pattern_scale<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::PatternScale(PatternScaleError { msg: msg.into() })
    }

    pub(crate) fn automaton_scale<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::AutomatonScale(AutomatonScaleError { msg: msg.into() })
    }

    pub(crate) const fn unsupported_value_type(expected: u8, actual: u8) -> Self {
        Self::UnsupportedValueType(UnsupportedValueTypeError { expected, actual })
    }

    pub(crate) fn corrupt_stream<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::CorruptStream(CorruptStreamError { msg: msg.into() })
    }
}

/// Error used when the scale of input keywords exceeds the representable one.
#[derive(Debug)]
pub struct PatternScaleError {
    pub(crate) msg: String,
}

impl fmt::Display for PatternScaleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PatternScaleError: {}", self.msg)
    }
}

impl Error for PatternScaleError {}

/// Error used when the scale of the automaton exceeds the expected one.
#[derive(Debug)]
pub struct AutomatonScaleError {
    pub(crate) msg: String,
}

impl fmt::Display for AutomatonScaleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AutomatonScaleError: {}", self.msg)
    }
}

impl Error for AutomatonScaleError {}

/// Error used when a stream carries values of a type other than the requested one.
#[derive(Debug)]
pub struct UnsupportedValueTypeError {
    /// Type code of the requested value type.
    pub(crate) expected: u8,
    /// Type code found in the stream.
    pub(crate) actual: u8,
}

impl fmt::Display for UnsupportedValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "UnsupportedValueTypeError: expected type code {}, found {}",
            self.expected, self.actual
        )
    }
}

impl Error for UnsupportedValueTypeError {}

/// Error used when a serialized automaton is malformed.
#[derive(Debug)]
pub struct CorruptStreamError {
    pub(crate) msg: String,
}

impl fmt::Display for CorruptStreamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CorruptStreamError: {}", self.msg)
    }
}

impl Error for CorruptStreamError {}
