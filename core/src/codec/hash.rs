//! The two Bitcoin hash functions: `hash160` for pubkey/script hashes,
//! `hash256` for transaction/block identifiers and checksums.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Single SHA256 pass.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// `RIPEMD160(SHA256(x))`, as used for pubkey hashes and P2SH script
/// hashes.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let first = Sha256::digest(data);
    Ripemd160::digest(first).into()
}

/// `SHA256(SHA256(x))`, as used for txids and base58check checksums.
pub fn hash256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash256_of_empty_matches_known_vector() {
        // SHA256(SHA256("")) — a standard fixture used across the ecosystem
        // to sanity-check double-SHA256 implementations.
        let digest = hash256(b"");
        assert_eq!(
            hex::encode(digest),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn hash160_matches_known_vector() {
        // hash160("") = RIPEMD160(SHA256("")).
        let digest = hash160(b"");
        assert_eq!(hex::encode(digest), "b472a266d0bd89c13706a4132ccfb16f7c3b9fcb");
    }
}
