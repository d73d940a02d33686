//! Byte-level codecs shared by every other module: varints, the two
//! Bitcoin hash functions, and base58check.
//!
//! Nothing in this module is BSV-specific; it is the same wire plumbing
//! any Bitcoin-derived chain uses.

mod base58;
mod hash;
mod varint;

pub use base58::{base58check_decode, base58check_encode};
pub use hash::{hash160, hash256, sha256};
pub use varint::{read_varint, varint_len, write_varint};

use thiserror::Error;

/// Errors raised by the byte codecs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The input string contained a character outside the base58 alphabet.
    #[error("invalid base58 string")]
    InvalidBase58,
    /// The base58check payload's trailing 4 bytes did not match
    /// `hash256(payload)[0..4]`.
    #[error("base58check checksum mismatch")]
    InvalidChecksum,
    /// The input string contained non-hexadecimal characters or had odd
    /// length.
    #[error("invalid hex string")]
    InvalidHex,
    /// A varint or pushdata length claimed more bytes than remained in
    /// the buffer.
    #[error("truncated input: expected {expected} more byte(s), found {found}")]
    Truncated {
        /// Bytes the decoder needed to continue.
        expected: usize,
        /// Bytes actually remaining.
        found: usize,
    },
}
