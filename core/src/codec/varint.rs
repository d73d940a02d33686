//! CompactSize ("varint") encoding used throughout the transaction wire
//! format for script lengths and input/output counts.

use super::CodecError;

/// Number of bytes `write_varint` would emit for `n`.
pub fn varint_len(n: u64) -> usize {
    match n {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

/// Appends the canonical CompactSize encoding of `n` to `out`.
///
/// The encoder always picks the shortest form: values under `0xFD` encode
/// as a single byte, larger values use the `0xFD`/`0xFE`/`0xFF` prefix
/// forms. There is no non-canonical encoder — only the decoder tolerates
/// non-canonical input.
pub fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xFC => out.push(n as u8),
        0xFD..=0xFFFF => {
            out.push(0xFD);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            out.push(0xFE);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xFF);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Reads a CompactSize integer from the front of `data`.
///
/// The decoder is deliberately lenient about canonicity (a `0xFD` prefix
/// followed by a value that would fit in one byte is accepted) — only the
/// encoder is required to be canonical. Returns the decoded value and the
/// number of bytes consumed.
pub fn read_varint(data: &[u8]) -> Result<(u64, usize), CodecError> {
    let prefix = *data.first().ok_or(CodecError::Truncated { expected: 1, found: 0 })?;
    match prefix {
        0..=0xFC => Ok((prefix as u64, 1)),
        0xFD => {
            let bytes = data.get(1..3).ok_or(CodecError::Truncated {
                expected: 3,
                found: data.len(),
            })?;
            let v = u16::from_le_bytes([bytes[0], bytes[1]]);
            Ok((v as u64, 3))
        }
        0xFE => {
            let bytes = data.get(1..5).ok_or(CodecError::Truncated {
                expected: 5,
                found: data.len(),
            })?;
            let v = u32::from_le_bytes(bytes.try_into().unwrap());
            Ok((v as u64, 5))
        }
        0xFF => {
            let bytes = data.get(1..9).ok_or(CodecError::Truncated {
                expected: 9,
                found: data.len(),
            })?;
            let v = u64::from_le_bytes(bytes.try_into().unwrap());
            Ok((v, 9))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, &[0x00])]
    #[test_case(0xFC, &[0xFC])]
    #[test_case(0xFD, &[0xFD, 0xFD, 0x00])]
    #[test_case(0xFFFF, &[0xFD, 0xFF, 0xFF])]
    #[test_case(0x1_0000, &[0xFE, 0x00, 0x00, 0x01, 0x00])]
    #[test_case(0xFFFF_FFFF, &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF])]
    #[test_case(0x1_0000_0000, &[0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00])]
    fn encodes_canonical_form(n: u64, expected: &[u8]) {
        let mut out = Vec::new();
        write_varint(&mut out, n);
        assert_eq!(out, expected);
        assert_eq!(varint_len(n), expected.len());
    }

    #[test_case(0, &[0x00])]
    #[test_case(0xFD, &[0xFD, 0xFD, 0x00])]
    #[test_case(0x1_0000, &[0xFE, 0x00, 0x00, 0x01, 0x00])]
    #[test_case(0x1_0000_0000, &[0xFF, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00])]
    fn round_trips(n: u64, bytes: &[u8]) {
        let (decoded, consumed) = read_varint(bytes).unwrap();
        assert_eq!(decoded, n);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn decoder_tolerates_non_minimal_encoding() {
        // 0xFD followed by a value that would fit in one byte: the spec
        // only requires the encoder to be canonical.
        let (decoded, consumed) = read_varint(&[0xFD, 0x05, 0x00]).unwrap();
        assert_eq!(decoded, 5);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert_eq!(
            read_varint(&[0xFE, 0x01, 0x02]),
            Err(CodecError::Truncated { expected: 5, found: 3 })
        );
        assert_eq!(
            read_varint(&[]),
            Err(CodecError::Truncated { expected: 1, found: 0 })
        );
    }

    proptest::proptest! {
        #[test]
        fn round_trip_prop(n: u64) {
            let mut out = Vec::new();
            write_varint(&mut out, n);
            let (decoded, consumed) = read_varint(&out).unwrap();
            proptest::prop_assert_eq!(decoded, n);
            proptest::prop_assert_eq!(consumed, out.len());
        }
    }
}
