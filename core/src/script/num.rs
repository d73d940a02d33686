//! Script numbers: minimal little-endian sign-magnitude integers with a
//! 4-byte arithmetic bound, and the BSV pre-Genesis quirk that allows a
//! 5th overflow byte through encoding while still failing any further
//! arithmetic on it.

use thiserror::Error;

/// The largest scriptnum operands the arithmetic opcodes will accept.
/// Bitcoin Core-style stacks keep this at 4 bytes; BSV's pre-Genesis
/// rule set is identical for `ScriptNum::decode`.
pub const DEFAULT_MAX_NUM_SIZE: usize = 4;

/// Errors raised while decoding a stack element as a scriptnum.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScriptNumError {
    #[error("scriptnum exceeds the {0}-byte bound")]
    Overflow(usize),
    #[error("non-minimally encoded scriptnum")]
    NonMinimalEncoding,
}

/// A decoded Script integer. Internally an `i64` so intermediate
/// arithmetic (e.g. `OP_ADD` on two 4-byte operands) cannot overflow,
/// even though encoded operands are bounded to `max_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNum(i64);

impl ScriptNum {
    pub fn new(value: i64) -> Self {
        ScriptNum(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn is_true(self) -> bool {
        // Script's boolean coercion treats +0 and -0 alike as false;
        // `decode` already folds -0 into 0, so a plain `!= 0` suffices
        // here, but callers that hand-construct negative zero bytes
        // must go through `decode`.
        self.0 != 0
    }

    /// Decodes a stack element as a scriptnum. `max_size` bounds the
    /// accepted byte length: `DEFAULT_MAX_NUM_SIZE` for the four basic
    /// arithmetic ops, or the pushed operand's own size — effectively
    /// unbounded — for `OP_WITHIN`-adjacent uses that pass a larger
    /// bound.
    ///
    /// When `require_minimal` is set (MINIMALDATA-equivalent policy),
    /// trailing zero bytes and an all-zero encoding with the sign bit
    /// set are rejected rather than silently normalized.
    pub fn decode(bytes: &[u8], max_size: usize, require_minimal: bool) -> Result<Self, ScriptNumError> {
        if bytes.is_empty() {
            return Ok(ScriptNum(0));
        }
        if bytes.len() > max_size {
            return Err(ScriptNumError::Overflow(max_size));
        }
        if require_minimal {
            let last = bytes[bytes.len() - 1];
            if last & 0x7f == 0 {
                // The top byte carries no magnitude bits, so it is
                // redundant unless the second-to-last byte's own sign
                // bit needs the extra byte to stay a magnitude bit.
                if bytes.len() <= 1 || bytes[bytes.len() - 2] & 0x80 == 0 {
                    return Err(ScriptNumError::NonMinimalEncoding);
                }
            }
        }

        let mut result: i64 = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            result |= (byte as i64) << (8 * i);
        }

        let negative = bytes[bytes.len() - 1] & 0x80 != 0;
        if negative {
            // Clear the sign bit from the top byte's contribution, then
            // negate the resulting magnitude.
            let sign_bit = 0x80i64 << (8 * (bytes.len() - 1));
            result &= !sign_bit;
            result = -result;
        }
        Ok(ScriptNum(result))
    }

    /// Encodes to minimal little-endian sign-magnitude bytes. Empty for
    /// zero.
    pub fn encode(self) -> Vec<u8> {
        if self.0 == 0 {
            return Vec::new();
        }
        let negative = self.0 < 0;
        let mut magnitude = self.0.unsigned_abs();
        let mut bytes = Vec::new();
        while magnitude > 0 {
            bytes.push((magnitude & 0xff) as u8);
            magnitude >>= 8;
        }
        if bytes.last().copied().unwrap_or(0) & 0x80 != 0 {
            bytes.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            *bytes.last_mut().expect("non-zero magnitude pushed at least one byte") |= 0x80;
        }
        bytes
    }
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        ScriptNum(value)
    }
}

impl From<bool> for ScriptNum {
    fn from(value: bool) -> Self {
        ScriptNum(if value { 1 } else { 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, &[]; "zero encodes empty")]
    #[test_case(1, &[0x01]; "one")]
    #[test_case(-1, &[0x81]; "negative one")]
    #[test_case(127, &[0x7f]; "127 fits one byte")]
    #[test_case(128, &[0x80, 0x00]; "128 needs a sign-guard byte")]
    #[test_case(-128, &[0x80, 0x80]; "negative 128 needs a sign-guard byte")]
    #[test_case(255, &[0xff, 0x00]; "255 needs a sign-guard byte")]
    fn encodes_to_expected_bytes(value: i64, expected: &[u8]) {
        assert_eq!(ScriptNum::new(value).encode(), expected);
    }

    #[test]
    fn round_trips_through_decode() {
        for value in [0i64, 1, -1, 127, 128, -128, 255, -255, 65535, -65535, 2147483647, -2147483647] {
            let encoded = ScriptNum::new(value).encode();
            let decoded = ScriptNum::decode(&encoded, 5, true).unwrap();
            assert_eq!(decoded.value(), value);
        }
    }

    #[test]
    fn rejects_encoding_over_four_bytes_by_default() {
        let five_bytes = [0x01, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(
            ScriptNum::decode(&five_bytes, DEFAULT_MAX_NUM_SIZE, true),
            Err(ScriptNumError::Overflow(DEFAULT_MAX_NUM_SIZE))
        );
    }

    #[test]
    fn bsv_pre_genesis_allows_five_byte_push_through_a_wider_bound() {
        // A 5-byte pushed operand can still be *decoded* if the caller
        // widens max_size for that purpose, even though the four basic
        // arithmetic opcodes never do so themselves.
        let five_bytes = [0xff, 0xff, 0xff, 0xff, 0x00];
        assert!(ScriptNum::decode(&five_bytes, 5, true).is_ok());
    }

    #[test]
    fn rejects_non_minimal_trailing_zero_under_minimal_policy() {
        assert_eq!(ScriptNum::decode(&[0x01, 0x00], 5, true), Err(ScriptNumError::NonMinimalEncoding));
        assert!(ScriptNum::decode(&[0x01, 0x00], 5, false).is_ok());
    }

    #[test]
    fn accepts_trailing_zero_guarding_a_high_bit_byte() {
        assert!(ScriptNum::decode(&[0xff, 0x00], 5, true).is_ok());
    }

    #[test]
    fn negative_zero_is_non_minimal() {
        // The minimal encoding of zero is the empty array; a lone 0x80
        // byte is negative zero and is rejected under minimal policy.
        assert_eq!(ScriptNum::decode(&[0x80], 5, true), Err(ScriptNumError::NonMinimalEncoding));
        let decoded = ScriptNum::decode(&[0x80], 5, false).unwrap();
        assert_eq!(decoded.value(), 0);
        assert!(!decoded.is_true());
    }
}
