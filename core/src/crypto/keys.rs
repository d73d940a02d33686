//! Private and public key wrappers over `secp256k1`.

use secp256k1::{PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use super::CryptoError;
use crate::codec::{base58check_decode, base58check_encode, hash160};

/// WIF version bytes: mainnet vs. testnet, mirroring `address::NetworkType`
/// without introducing a dependency on the address module (WIF and address
/// encoding are independent base58check payloads over the same hash/key
/// material).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WifNetwork {
    Main,
    Test,
}

impl WifNetwork {
    fn version_byte(self) -> u8 {
        match self {
            WifNetwork::Main => 0x80,
            WifNetwork::Test => 0xEF,
        }
    }

    fn from_version_byte(byte: u8) -> Option<Self> {
        match byte {
            0x80 => Some(WifNetwork::Main),
            0xEF => Some(WifNetwork::Test),
            _ => None,
        }
    }
}

/// Whether a public key serializes to its 33-byte compressed form or its
/// 65-byte uncompressed form.
///
/// This is a deliberate, observable property: the same scalar produces
/// two different addresses depending on which form was used to derive
/// the hash160.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKeyEncoding {
    /// 33 bytes: `0x02`/`0x03` prefix followed by the x-coordinate.
    Compressed,
    /// 65 bytes: `0x04` prefix followed by the x- and y-coordinates.
    Uncompressed,
}

/// A 32-byte secp256k1 scalar, `1 <= k < n`.
///
/// Wrapped in `Zeroizing` so the scalar bytes are wiped from memory when
/// the key is dropped, the way long-lived secret material should be
/// handled.
#[derive(Clone)]
pub struct PrivateKey {
    inner: SecretKey,
}

impl PrivateKey {
    /// Constructs a private key from a 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let inner = SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { inner })
    }

    /// Generates a new private key from the system CSPRNG.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self { inner: SecretKey::new(&mut rng) }
    }

    /// The raw 32-byte scalar. Callers should drop this promptly; prefer
    /// keeping the key wrapped in `PrivateKey` for as long as possible.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.inner.secret_bytes())
    }

    /// Derives the public key, in the requested serialization form.
    pub fn public_key(&self, encoding: PublicKeyEncoding) -> PublicKey {
        let secp = Secp256k1::new();
        let pubkey = Secp256k1PublicKey::from_secret_key(&secp, &self.inner);
        PublicKey { inner: pubkey, encoding }
    }

    pub(crate) fn secp_key(&self) -> &SecretKey {
        &self.inner
    }

    /// Wallet Import Format: `base58check(version ∥ scalar[32] ∥ [0x01
    /// if compressed])`. The trailing `0x01` byte is the sole signal that
    /// the public key this WIF is meant to be paired with should be
    /// serialized compressed; the scalar itself carries no such flag.
    pub fn to_wif(&self, network: WifNetwork, compressed: bool) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(network.version_byte());
        payload.extend_from_slice(&self.inner.secret_bytes());
        if compressed {
            payload.push(0x01);
        }
        base58check_encode(&payload)
    }

    /// Parses a WIF string, returning the key and whether it was flagged
    /// for compressed public-key serialization.
    pub fn from_wif(s: &str) -> Result<(Self, WifNetwork, bool), CryptoError> {
        let payload = base58check_decode(s)?;
        let (version, rest) = payload.split_first().ok_or(CryptoError::InvalidPrivateKey)?;
        let network = WifNetwork::from_version_byte(*version).ok_or(CryptoError::InvalidPrivateKey)?;
        let (scalar, compressed) = match rest.len() {
            33 if rest[32] == 0x01 => (&rest[..32], true),
            32 => (rest, false),
            _ => return Err(CryptoError::InvalidPrivateKey),
        };
        let key = Self::from_bytes(scalar.try_into().expect("checked to be 32 bytes above"))?;
        Ok((key, network, compressed))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").field("inner", &"<redacted>").finish()
    }
}

/// A secp256k1 public key plus the serialization form it should round
/// -trip through.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    inner: Secp256k1PublicKey,
    encoding: PublicKeyEncoding,
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicKey").field("hex", &hex::encode(self.to_bytes())).finish()
    }
}

impl PublicKey {
    /// Parses a compressed (33-byte) or uncompressed (65-byte) point
    /// encoding, preserving which form was supplied.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let inner = Secp256k1PublicKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        let encoding = match bytes.len() {
            33 => PublicKeyEncoding::Compressed,
            65 => PublicKeyEncoding::Uncompressed,
            _ => return Err(CryptoError::InvalidPublicKey),
        };
        Ok(Self { inner, encoding })
    }

    /// Serializes using this key's recorded encoding (compressed or
    /// uncompressed) — the exact bytes that `hash160` for an address
    /// construction must be computed over.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.encoding {
            PublicKeyEncoding::Compressed => self.inner.serialize().to_vec(),
            PublicKeyEncoding::Uncompressed => self.inner.serialize_uncompressed().to_vec(),
        }
    }

    /// The encoding form this key will serialize to.
    pub fn encoding(&self) -> PublicKeyEncoding {
        self.encoding
    }

    /// `hash160` of this key's exact encoded form.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    pub(crate) fn secp_key(&self) -> &Secp256k1PublicKey {
        &self.inner
    }

    pub(crate) fn from_secp(inner: Secp256k1PublicKey, encoding: PublicKeyEncoding) -> Self {
        Self { inner, encoding }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_and_uncompressed_hash_to_different_addresses() {
        let key = PrivateKey::from_bytes(&[0x01; 32]).unwrap();
        let compressed = key.public_key(PublicKeyEncoding::Compressed);
        let uncompressed = key.public_key(PublicKeyEncoding::Uncompressed);
        assert_ne!(compressed.hash160(), uncompressed.hash160());
    }

    #[test]
    fn zero_scalar_is_rejected() {
        assert_eq!(PrivateKey::from_bytes(&[0x00; 32]).err(), Some(CryptoError::InvalidPrivateKey));
    }

    #[test]
    fn public_key_round_trips_through_bytes() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let bytes = pubkey.to_bytes();
        let parsed = PublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, pubkey);
    }

    #[test]
    fn wif_round_trips_with_compression_flag() {
        let key = PrivateKey::from_bytes(&[0x07; 32]).unwrap();
        for compressed in [true, false] {
            for network in [WifNetwork::Main, WifNetwork::Test] {
                let wif = key.to_wif(network, compressed);
                let (parsed, parsed_network, parsed_compressed) = PrivateKey::from_wif(&wif).unwrap();
                assert_eq!(*parsed.to_bytes(), *key.to_bytes());
                assert_eq!(parsed_network, network);
                assert_eq!(parsed_compressed, compressed);
            }
        }
    }

    #[test]
    fn known_wif_vector_decodes_to_expected_scalar() {
        // Bitcoin wiki "Wallet import format" worked example: an
        // uncompressed mainnet WIF for a known secret exponent.
        let (key, network, compressed) =
            PrivateKey::from_wif("5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ").unwrap();
        assert_eq!(network, WifNetwork::Main);
        assert!(!compressed);
        assert_eq!(
            hex::encode(*key.to_bytes()),
            "0c28fca386c7a227600b2fe50b7cae11ec86d3bf1fbe471be89827e19d72aa1d"
        );
    }

    #[test]
    fn unknown_wif_version_byte_is_rejected() {
        let mut payload = vec![0x99u8];
        payload.extend_from_slice(&[0x01; 32]);
        let encoded = base58check_encode(&payload);
        assert_eq!(PrivateKey::from_wif(&encoded).err(), Some(CryptoError::InvalidPrivateKey));
    }
}
