/*!
 A decoder for Apple's `typedstream` binary archive format (NeXTSTEP's
 `NSArchiver`/`NSUnarchiver` wire format), as found in SQLite blob columns such as
 `message.attributedBody` in the macOS/iOS Messages database.

 This crate reads a `typedstream` byte buffer in a single pass and produces a flat, ordered
 sequence of [`Archivable`] records — objects, free-standing data, interned classes, and
 embedded type lists — without attempting to reconstruct the original Objective-C object
 graph. Callers that need a particular shape out of that sequence (an attributed string's
 plain text, an `NSNumber`'s integer) use the accessor methods on [`Archivable`].

 Only version 4 streams bearing the `streamtyped` signature and system version 1000 are
 understood; anything else is rejected up front by [`decode`]. Re-encoding is not supported.

 ```
 use typedstream::decode;

 let mut bytes = vec![0x04, 0x0B];
 bytes.extend_from_slice(b"streamtyped");
 bytes.extend_from_slice(&[0x81, 0xE8, 0x03]);
 assert_eq!(decode(&bytes).unwrap(), vec![]);
 ```
*/
#![forbid(unsafe_code)]

mod decoder;
pub mod error;
pub mod models;

pub use decoder::decode;
pub use error::TypedStreamError;
pub use models::{Archivable, Class, Type, Value};
