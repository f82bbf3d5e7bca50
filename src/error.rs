//! Error types for encoding and decoding.
use std::fmt;

/// A valuepack encode [`Result`](std::result::Result), normally returning an [`EncodeError`].
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// A valuepack decode [`Result`](std::result::Result), normally returning a [`DecodeError`].
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur while encoding a [`Value`](crate::value::Value) tree to bytes.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodeError {
    /// A `Float` value was NaN or infinite. MessagePack floats must be finite.
    NonFiniteFloat,
    /// A `Str`, `Bin`, or `Ext` payload was longer than `u32::MAX` bytes and has no
    /// representable length prefix.
    LengthTooLong {
        /// The payload length that could not be encoded.
        actual: usize,
    },
    /// `Array`/`Map`/`Ext` nesting in the input value tree exceeded the maximum
    /// supported depth.
    DepthLimitExceeded,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EncodeError::NonFiniteFloat => {
                write!(f, "cannot encode a non-finite float (NaN or infinite)")
            }
            EncodeError::LengthTooLong { actual } => write!(
                f,
                "payload length {} exceeds the maximum encodable length ({})",
                actual,
                u32::MAX
            ),
            EncodeError::DepthLimitExceeded => {
                write!(f, "value tree nesting exceeded the maximum depth")
            }
        }
    }
}

impl std::error::Error for EncodeError {}

/// Errors that can occur while decoding bytes into a [`Value`](crate::value::Value) tree.
///
/// Every variant carries the byte offset in the input at which the problem was
/// detected, so callers can point a user at the exact location of malformed input.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeError {
    /// The byte at `position` is not a recognized MessagePack format marker.
    InvalidTypeMarker {
        /// Offset of the offending marker byte.
        position: usize,
        /// The offending byte.
        byte: u8,
    },
    /// The input ended before a declared length/payload could be fully read.
    UnexpectedEnd {
        /// Offset at which the read was attempted.
        position: usize,
        /// Number of bytes the read needed.
        needed: usize,
        /// Number of bytes actually available from `position`.
        available: usize,
    },
    /// A string's declared byte range is not valid UTF-8.
    InvalidUtf8 {
        /// Offset of the first invalid byte.
        position: usize,
    },
    /// A decoded map key was not a string.
    MapKeyNotString {
        /// Offset at which the non-string key began.
        position: usize,
    },
    /// Container nesting exceeded the maximum supported depth.
    DepthLimitExceeded {
        /// Offset at which the limit was hit.
        position: usize,
    },
}

impl DecodeError {
    /// The byte offset in the input at which this error was detected.
    pub fn position(&self) -> usize {
        match *self {
            DecodeError::InvalidTypeMarker { position, .. } => position,
            DecodeError::UnexpectedEnd { position, .. } => position,
            DecodeError::InvalidUtf8 { position } => position,
            DecodeError::MapKeyNotString { position } => position,
            DecodeError::DepthLimitExceeded { position } => position,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DecodeError::InvalidTypeMarker { position, byte } => write!(
                f,
                "invalid type marker 0x{:02x} at position {}",
                byte, position
            ),
            DecodeError::UnexpectedEnd {
                position,
                needed,
                available,
            } => write!(
                f,
                "unexpected end of input at position {}: needed {} bytes, {} available",
                position, needed, available
            ),
            DecodeError::InvalidUtf8 { position } => {
                write!(f, "invalid UTF-8 in string starting at position {}", position)
            }
            DecodeError::MapKeyNotString { position } => {
                write!(f, "map key at position {} is not a string", position)
            }
            DecodeError::DepthLimitExceeded { position } => write!(
                f,
                "container nesting exceeded the maximum depth at position {}",
                position
            ),
        }
    }
}

impl std::error::Error for DecodeError {}
