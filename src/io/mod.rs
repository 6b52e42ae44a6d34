//! Table I/O.
//!
//! Only delimited text is supported; transport encodings of the input (base64 and the
//! like) are the caller's concern.

pub mod csv;

pub use self::csv::{decode, encode, DecodeOptions, TableDecoder, TableEncoder};
