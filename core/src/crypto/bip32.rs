//! BIP32 hierarchical deterministic key derivation.
//!
//! The wire layout is
//! `version(4) ∥ depth(1) ∥ parentFP(4) ∥ childIndex(4) ∥ chainCode(32) ∥ key(33)`,
//! base58check-encoded. Derivation itself is the standard BIP32
//! "I = HMAC-SHA512(chain_code, data)" construction; see inline
//! references to the relevant BIP32 section for each step.

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey as Secp256k1PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use thiserror::Error;

use super::keys::{PrivateKey, PublicKey, PublicKeyEncoding};
use crate::codec::{base58check_decode, base58check_encode, hash160};

type HmacSha512 = Hmac<Sha512>;

/// The index at and above which a child index requests hardened
/// derivation (BIP32 "Extended keys" — hardened child key derivation).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const EXTENDED_KEY_PAYLOAD_LEN: usize = 78;

/// Errors raised while deriving or parsing extended keys.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DerivationError {
    /// Hardened derivation was requested from a public-only parent.
    #[error("hardened derivation requires the parent private key")]
    HardenedFromPublicKey,
    /// The derived `I_L` value, when added to the parent key, produced an
    /// invalid scalar — astronomically unlikely but covered by BIP32.
    #[error("derived key material was invalid; caller should retry with index + 1")]
    InvalidDerivedKey,
    /// A derivation path segment was not a plain or apostrophe-suffixed
    /// decimal integer.
    #[error("invalid derivation path segment: {0}")]
    InvalidPathSegment(String),
    /// The base58check payload was not exactly 78 bytes.
    #[error("extended key payload must be {EXTENDED_KEY_PAYLOAD_LEN} bytes, found {0}")]
    InvalidPayloadLength(usize),
    /// base58check decoding failed.
    #[error("invalid extended key encoding: {0}")]
    Encoding(#[from] crate::codec::CodecError),
    /// The embedded key bytes did not parse.
    #[error("invalid key material in extended key")]
    InvalidKey,
}

/// An extended private key: `{depth, parent_fingerprint, child_number,
/// chain_code, key}` plus the network version bytes it should serialize
/// under.
#[derive(Clone)]
pub struct ExtendedPrivateKey {
    version: [u8; 4],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    key: PrivateKey,
}

/// An extended public key, derived from an `ExtendedPrivateKey` or parsed
/// directly from its base58check string.
#[derive(Clone)]
pub struct ExtendedPublicKey {
    version: [u8; 4],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: u32,
    chain_code: [u8; 32],
    key: PublicKey,
}

fn fingerprint(pubkey: &PublicKey) -> [u8; 4] {
    let mut fp = [0u8; 4];
    fp.copy_from_slice(&pubkey.hash160()[0..4]);
    fp
}

impl ExtendedPrivateKey {
    /// BIP32 "Master key generation": `I = HMAC-SHA512("Bitcoin seed",
    /// seed)`, `I_L` is the master secret key, `I_R` is the master chain
    /// code.
    pub fn from_seed(seed: &[u8], version: [u8; 4]) -> Result<Self, DerivationError> {
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed").expect("HMAC accepts any key length");
        mac.update(seed);
        let i = mac.finalize().into_bytes();
        let (il, ir) = i.split_at(32);

        let key = PrivateKey::from_bytes(il.try_into().unwrap())
            .map_err(|_| DerivationError::InvalidDerivedKey)?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(Self {
            version,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: 0,
            chain_code,
            key,
        })
    }

    /// The wrapped private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.key
    }

    /// The corresponding extended public key (same depth/fingerprint/
    /// chain code, public point instead of scalar).
    pub fn to_public(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            version: self.version,
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
            chain_code: self.chain_code,
            key: self.key.public_key(PublicKeyEncoding::Compressed),
        }
    }

    /// Derives child `index` (BIP32 "Private parent key -> private child
    /// key"). `index >= HARDENED_OFFSET` requests hardened derivation.
    pub fn derive_child(&self, index: u32) -> Result<Self, DerivationError> {
        let hardened = index >= HARDENED_OFFSET;
        let parent_pubkey = self.key.public_key(PublicKeyEncoding::Compressed);

        let mut mac = HmacSha512::new_from_slice(&self.chain_code).expect("HMAC accepts any key length");
        if hardened {
            mac.update(&[0u8]);
            mac.update(self.key.to_bytes().as_slice());
        } else {
            mac.update(&parent_pubkey.to_bytes());
        }
        mac.update(&index.to_be_bytes());
        let i = mac.finalize().into_bytes();
        let (il, ir) = i.split_at(32);

        let tweak = Scalar::from_be_bytes(il.try_into().unwrap()).map_err(|_| DerivationError::InvalidDerivedKey)?;
        let parent_scalar = SecretKey::from_slice(&*self.key.to_bytes()).map_err(|_| DerivationError::InvalidDerivedKey)?;
        let child_scalar = parent_scalar
            .add_tweak(&tweak)
            .map_err(|_| DerivationError::InvalidDerivedKey)?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(Self {
            version: self.version,
            depth: self.depth.wrapping_add(1),
            parent_fingerprint: fingerprint(&parent_pubkey),
            child_number: index,
            chain_code,
            key: PrivateKey::from_bytes(&child_scalar.secret_bytes()).map_err(|_| DerivationError::InvalidDerivedKey)?,
        })
    }

    /// Derives a full path such as `m/0'/1/2'/2/1000000000`. The leading
    /// `m`/`M` is optional.
    pub fn derive_path(&self, path: &str) -> Result<Self, DerivationError> {
        let mut key = self.clone();
        for segment in parse_path(path)? {
            key = key.derive_child(segment)?;
        }
        Ok(key)
    }

    /// The base58check-encoded extended key string.
    pub fn to_base58(&self) -> String {
        let payload = self.payload();
        base58check_encode(&payload)
    }

    fn payload(&self) -> [u8; EXTENDED_KEY_PAYLOAD_LEN] {
        let mut payload = [0u8; EXTENDED_KEY_PAYLOAD_LEN];
        payload[0..4].copy_from_slice(&self.version);
        payload[4] = self.depth;
        payload[5..9].copy_from_slice(&self.parent_fingerprint);
        payload[9..13].copy_from_slice(&self.child_number.to_be_bytes());
        payload[13..45].copy_from_slice(&self.chain_code);
        payload[45] = 0x00;
        payload[46..78].copy_from_slice(self.key.to_bytes().as_slice());
        payload
    }

    /// Parses a base58check-encoded extended private key string.
    pub fn from_base58(s: &str) -> Result<Self, DerivationError> {
        let payload = base58check_decode(s)?;
        if payload.len() != EXTENDED_KEY_PAYLOAD_LEN {
            return Err(DerivationError::InvalidPayloadLength(payload.len()));
        }
        if payload[45] != 0x00 {
            return Err(DerivationError::InvalidKey);
        }
        let key = PrivateKey::from_bytes(payload[46..78].try_into().unwrap()).map_err(|_| DerivationError::InvalidKey)?;
        Ok(Self {
            version: payload[0..4].try_into().unwrap(),
            depth: payload[4],
            parent_fingerprint: payload[5..9].try_into().unwrap(),
            child_number: u32::from_be_bytes(payload[9..13].try_into().unwrap()),
            chain_code: payload[13..45].try_into().unwrap(),
            key,
        })
    }
}

impl ExtendedPublicKey {
    /// Derives a normal (non-hardened) child public key directly, without
    /// access to the private key (BIP32 "Public parent key -> public
    /// child key"). Hardened indices are rejected.
    pub fn derive_child(&self, index: u32) -> Result<Self, DerivationError> {
        if index >= HARDENED_OFFSET {
            return Err(DerivationError::HardenedFromPublicKey);
        }

        let mut mac = HmacSha512::new_from_slice(&self.chain_code).expect("HMAC accepts any key length");
        mac.update(&self.key.to_bytes());
        mac.update(&index.to_be_bytes());
        let i = mac.finalize().into_bytes();
        let (il, ir) = i.split_at(32);

        let secp = Secp256k1::new();
        let tweak = Scalar::from_be_bytes(il.try_into().unwrap()).map_err(|_| DerivationError::InvalidDerivedKey)?;
        let parent_point = self.key.secp_key();
        let child_point = parent_point
            .add_exp_tweak(&secp, &tweak)
            .map_err(|_| DerivationError::InvalidDerivedKey)?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(Self {
            version: self.version,
            depth: self.depth.wrapping_add(1),
            parent_fingerprint: fingerprint(&self.key),
            child_number: index,
            chain_code,
            key: PublicKey::from_secp(child_point, PublicKeyEncoding::Compressed),
        })
    }

    /// The wrapped public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.key
    }

    /// The base58check-encoded extended key string.
    pub fn to_base58(&self) -> String {
        let mut payload = [0u8; EXTENDED_KEY_PAYLOAD_LEN];
        payload[0..4].copy_from_slice(&self.version);
        payload[4] = self.depth;
        payload[5..9].copy_from_slice(&self.parent_fingerprint);
        payload[9..13].copy_from_slice(&self.child_number.to_be_bytes());
        payload[13..45].copy_from_slice(&self.chain_code);
        payload[45..78].copy_from_slice(&self.key.to_bytes());
        base58check_encode(&payload)
    }
}

fn parse_path(path: &str) -> Result<Vec<u32>, DerivationError> {
    let mut segments = path.split('/').peekable();
    if matches!(segments.peek(), Some(&"m") | Some(&"M")) {
        segments.next();
    }
    segments
        .filter(|s| !s.is_empty())
        .map(|segment| {
            let (digits, hardened) = match segment.strip_suffix('\'').or_else(|| segment.strip_suffix('h')) {
                Some(digits) => (digits, true),
                None => (segment, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| DerivationError::InvalidPathSegment(segment.to_string()))?;
            if hardened {
                index.checked_add(HARDENED_OFFSET).ok_or_else(|| DerivationError::InvalidPathSegment(segment.to_string()))
            } else {
                Ok(index)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET_XPRV: [u8; 4] = [0x04, 0x88, 0xAD, 0xE4];
    const MAINNET_XPUB: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

    #[test]
    fn bip32_test_vector_1_chain() {
        // BIP32 "Test vector 1", seed 000102030405060708090a0b0c0d0e0f,
        // chain m/0'/1/2'/2/1000000000.
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let master = ExtendedPrivateKey::from_seed(&seed, MAINNET_XPRV).unwrap();
        let derived = master.derive_path("m/0'/1/2'/2/1000000000").unwrap();

        assert_eq!(
            derived.to_base58(),
            "xprvA41z7zogVVwxVSgdKUHDy1SKmdb533PjDz7J6N6mV6uS3ze1ai8FHa8kmHScGpWmj4WggLyQjgPie1rFSruoUihUZREPSL39UNdE3BBDu76"
        );

        let public = derived.to_public();
        assert_eq!(
            public.to_base58(),
            "xpub6H1LXWLaKsWFhvm6RVpEL9P4KgAivdnTfMWxTPDsnFu9C6CmLgqs4NU3sPZHaBBCYYeiXMJYRkC3uK95yJnXkMJ9wCYwbYYaZd3yvJjfVNW"
        );
        let _ = MAINNET_XPUB;
    }

    #[test]
    fn hardened_derivation_requires_private_parent() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let master = ExtendedPrivateKey::from_seed(&seed, MAINNET_XPRV).unwrap();
        let public = master.to_public();
        assert_eq!(public.derive_child(HARDENED_OFFSET).err(), Some(DerivationError::HardenedFromPublicKey));
    }

    #[test]
    fn private_and_public_derivation_agree() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let master = ExtendedPrivateKey::from_seed(&seed, MAINNET_XPRV).unwrap();
        let child_priv = master.derive_child(0).unwrap();
        let child_pub_via_priv = child_priv.to_public();
        let child_pub_direct = master.to_public().derive_child(0).unwrap();
        assert_eq!(child_pub_via_priv.to_base58(), child_pub_direct.to_base58());
    }

    #[test]
    fn extended_key_round_trips_through_base58() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let master = ExtendedPrivateKey::from_seed(&seed, MAINNET_XPRV).unwrap();
        let encoded = master.to_base58();
        let decoded = ExtendedPrivateKey::from_base58(&encoded).unwrap();
        assert_eq!(decoded.to_base58(), encoded);
    }
}
