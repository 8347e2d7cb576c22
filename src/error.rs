/*!
 Errors that can happen while decoding `typedstream` data.
*/

use std::{
    array::TryFromSliceError,
    fmt::{Display, Formatter, Result},
    str::Utf8Error,
};

/// Errors that can happen while decoding `typedstream` data
#[derive(Debug)]
pub enum TypedStreamError {
    /// The cursor tried to read past the end of the buffer: `(requested_index, buffer_length)`
    OutOfBounds(usize, usize),
    /// The leading version / signature / system-version triple did not match the supported header
    InvalidHeader,
    /// A lower-level slice conversion failed while assembling a fixed-width integer or float
    SliceError(TryFromSliceError),
    /// A length-prefixed string was not valid UTF-8
    StringParseError(Utf8Error),
    /// An `[N]` array type encoding had no digits, or `N` was not positive
    InvalidArray,
    /// A back-reference pointer byte could not be resolved to a table index
    InvalidPointer(u8),
}

impl Display for TypedStreamError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            TypedStreamError::OutOfBounds(idx, len) => {
                write!(fmt, "Index {idx:x} is outside of range {len:x}!")
            }
            TypedStreamError::InvalidHeader => write!(fmt, "Invalid typedstream header!"),
            TypedStreamError::SliceError(why) => {
                write!(fmt, "Unable to slice source stream: {why}")
            }
            TypedStreamError::StringParseError(why) => {
                write!(fmt, "Failed to parse string: {why}")
            }
            TypedStreamError::InvalidArray => write!(fmt, "Failed to parse array data"),
            TypedStreamError::InvalidPointer(why) => {
                write!(fmt, "Failed to resolve back-reference pointer: {why:#x}")
            }
        }
    }
}
