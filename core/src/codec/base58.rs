//! base58check: the `base58(payload ∥ hash256(payload)[0..4])` envelope
//! used for addresses and extended keys.

use super::{hash256, CodecError};

/// `base58(payload ∥ hash256(payload)[0..4])`.
pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = hash256(payload);
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum[0..4]);
    bs58::encode(buf).into_string()
}

/// Decodes a base58check string and verifies its checksum, returning the
/// payload (without the trailing 4-byte checksum).
pub fn base58check_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    let data = bs58::decode(s)
        .into_vec()
        .map_err(|_| CodecError::InvalidBase58)?;
    if data.len() < 4 {
        return Err(CodecError::InvalidBase58);
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    let expected = hash256(payload);
    if checksum != &expected[0..4] {
        return Err(CodecError::InvalidChecksum);
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_payload() {
        let payload = [0x00u8; 21];
        let encoded = base58check_encode(&payload);
        let decoded = base58check_decode(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn rejects_tampered_checksum() {
        let payload = [0x05u8; 21];
        let mut encoded = base58check_encode(&payload);
        encoded.push('1');
        assert_eq!(base58check_decode(&encoded), Err(CodecError::InvalidChecksum));
    }

    #[test]
    fn rejects_non_base58_characters() {
        // '0', 'O', 'I', 'l' are excluded from the base58 alphabet.
        assert_eq!(base58check_decode("0OIl"), Err(CodecError::InvalidBase58));
    }
}
