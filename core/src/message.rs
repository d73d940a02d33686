//! Signed message framing: the "Bitcoin Signed Message" convention of
//! hashing a magic-prefixed message and signing it with a *recoverable*
//! ECDSA signature, so a verifier can recover the signing public key
//! from the signature and message alone rather than needing it supplied
//! separately.
//!
//! This is the same framing wallets have used since the original
//! `signmessage`/`verifymessage` RPCs: the header byte of the 65-byte
//! signature encodes both the recovery id and whether the signer's
//! public key should be treated as compressed or uncompressed, and the
//! packed bytes are base64-encoded for transport.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};

use crate::address::Address;
use crate::codec::{hash256, write_varint};
use crate::crypto::{PrivateKey, PublicKey, PublicKeyEncoding};

const MAGIC: &[u8] = b"Bitcoin Signed Message:\n";

/// `hash256(varint(len(magic)) || magic || varint(len(message)) || message)`.
fn message_digest(message: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(MAGIC.len() + message.len() + 10);
    write_varint(&mut buf, MAGIC.len() as u64);
    buf.extend_from_slice(MAGIC);
    write_varint(&mut buf, message.len() as u64);
    buf.extend_from_slice(message);
    hash256(&buf)
}

/// Signs `message` with `key`, returning the base64-encoded
/// `header || r || s` form `verify_message` recovers a public key from.
/// `encoding` selects whether the header marks the signer's key as
/// compressed or uncompressed — callers must pass the same encoding
/// they intend to derive their address from.
pub fn sign_message(key: &PrivateKey, message: &[u8], encoding: PublicKeyEncoding) -> String {
    let secp = Secp256k1::new();
    let digest = message_digest(message);
    let msg = Message::from_digest(digest);
    let recoverable = secp.sign_ecdsa_recoverable(&msg, key.secp_key());
    let (recovery_id, sig_bytes) = recoverable.serialize_compact();

    let base: u8 = match encoding {
        PublicKeyEncoding::Compressed => 27 + 4,
        PublicKeyEncoding::Uncompressed => 27,
    };
    let mut packed = Vec::with_capacity(65);
    packed.push(base + recovery_id.to_i32() as u8);
    packed.extend_from_slice(&sig_bytes);
    BASE64.encode(packed)
}

/// Recovers the public key committed to by `signature` over `message`
/// and checks that its hash160 (under the encoding the signature's
/// header byte claims) matches `address`. A malformed signature is a
/// verification failure, not an error — mirroring how a malformed
/// script signature fails `OP_CHECKSIG` rather than crashing the
/// interpreter.
pub fn verify_message(address: &Address, message: &[u8], signature: &str) -> bool {
    let Some(recovered) = recover_public_key(message, signature) else {
        return false;
    };
    let candidate = Address::from_public_key(&recovered, address.network());
    candidate.hash160() == address.hash160() && candidate.address_type() == address.address_type()
}

fn recover_public_key(message: &[u8], signature: &str) -> Option<PublicKey> {
    let packed = BASE64.decode(signature).ok()?;
    if packed.len() != 65 {
        return None;
    }
    let header = packed[0];
    if !(27..=42).contains(&header) {
        return None;
    }
    let (encoding, recovery_offset) = if header >= 31 {
        (PublicKeyEncoding::Compressed, header - 31)
    } else {
        (PublicKeyEncoding::Uncompressed, header - 27)
    };

    let recovery_id = RecoveryId::from_i32(recovery_offset as i32).ok()?;
    let recoverable = RecoverableSignature::from_compact(&packed[1..], recovery_id).ok()?;

    let digest = message_digest(message);
    let msg = Message::from_digest(digest);
    let secp = Secp256k1::new();
    let pubkey = secp.recover_ecdsa(&msg, &recoverable).ok()?;
    Some(PublicKey::from_secp(pubkey, encoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NetworkType;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let address = Address::from_public_key(&pubkey, NetworkType::Main);

        let signature = sign_message(&key, b"hello, bsv", PublicKeyEncoding::Compressed);
        assert!(verify_message(&address, b"hello, bsv", &signature));
    }

    #[test]
    fn verification_fails_against_wrong_address() {
        let key = PrivateKey::generate();
        let other = PrivateKey::generate();
        let other_pubkey = other.public_key(PublicKeyEncoding::Compressed);
        let wrong_address = Address::from_public_key(&other_pubkey, NetworkType::Main);

        let signature = sign_message(&key, b"hello, bsv", PublicKeyEncoding::Compressed);
        assert!(!verify_message(&wrong_address, b"hello, bsv", &signature));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let address = Address::from_public_key(&pubkey, NetworkType::Main);

        let signature = sign_message(&key, b"hello, bsv", PublicKeyEncoding::Compressed);
        assert!(!verify_message(&address, b"goodbye, bsv", &signature));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let address = Address::from_public_key(&pubkey, NetworkType::Main);
        assert!(!verify_message(&address, b"hello", "not-base64!!"));
    }
}
