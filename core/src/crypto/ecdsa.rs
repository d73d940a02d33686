//! Deterministic ECDSA signing/verification, DER framing, and the
//! trailing sighash byte that every script signature carries.

use secp256k1::ecdsa::Signature as Secp256k1Signature;
use secp256k1::{Message, Secp256k1};

use super::keys::{PrivateKey, PublicKey};
use super::CryptoError;

/// A DER-encoded ECDSA signature, normalized to low-S.
///
/// Every signature this library produces satisfies `s <= n/2`.
/// `secp256k1`'s signer already normalizes; this wrapper calls
/// `normalize_s()` explicitly anyway so that guarantee does not depend on
/// library-internal behavior we don't control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerSignature(Vec<u8>);

impl DerSignature {
    /// Parses a DER-encoded signature, rejecting malformed DER.
    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        let sig = Secp256k1Signature::from_der(bytes).map_err(|_| CryptoError::InvalidDerSignature)?;
        Ok(Self(sig.serialize_der().to_vec()))
    }

    /// The raw DER bytes (without a trailing sighash byte).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this signature's `s` component is already `<= n/2`. Used
    /// by the interpreter's `LOW_S` flag to reject non-normalized
    /// signatures on verification rather than just on signing.
    pub fn is_low_s(&self) -> bool {
        let Ok(sig) = Secp256k1Signature::from_der(&self.0) else {
            return false;
        };
        let mut normalized = sig;
        let was_high = normalized.normalize_s();
        !was_high
    }

    fn secp_signature(&self) -> Result<Secp256k1Signature, CryptoError> {
        Secp256k1Signature::from_der(&self.0).map_err(|_| CryptoError::InvalidDerSignature)
    }
}

/// Signs a 32-byte digest (a SIGHASH preimage hash), producing a
/// low-S-normalized, RFC 6979-deterministic signature.
pub fn sign_hash(key: &PrivateKey, digest: &[u8; 32]) -> DerSignature {
    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let mut sig = secp.sign_ecdsa(&message, key.secp_key());
    sig.normalize_s();
    DerSignature(sig.serialize_der().to_vec())
}

/// Verifies a signature over a 32-byte digest.
pub fn verify_signature(pubkey: &PublicKey, digest: &[u8; 32], sig: &DerSignature) -> bool {
    let secp = Secp256k1::new();
    let message = Message::from_digest(*digest);
    let Ok(secp_sig) = sig.secp_signature() else {
        return false;
    };
    secp.verify_ecdsa(&message, &secp_sig, pubkey.secp_key()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PublicKeyEncoding;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let digest = crate::codec::hash256(b"hello, world");
        let sig = sign_hash(&key, &digest);
        assert!(verify_signature(&pubkey, &digest, &sig));
        assert!(sig.is_low_s());
    }

    #[test]
    fn verification_fails_on_wrong_key() {
        let key = PrivateKey::generate();
        let other = PrivateKey::generate();
        let digest = crate::codec::hash256(b"hello, world");
        let sig = sign_hash(&key, &digest);
        let wrong_pubkey = other.public_key(PublicKeyEncoding::Compressed);
        assert!(!verify_signature(&wrong_pubkey, &digest, &sig));
    }

    #[test]
    fn verification_fails_on_tampered_digest() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let digest = crate::codec::hash256(b"hello, world");
        let sig = sign_hash(&key, &digest);
        let other_digest = crate::codec::hash256(b"goodbye, world");
        assert!(!verify_signature(&pubkey, &other_digest, &sig));
    }

    #[test]
    fn malformed_der_is_rejected() {
        assert_eq!(DerSignature::from_der(&[0x30, 0xFF]).err(), Some(CryptoError::InvalidDerSignature));
    }
}
