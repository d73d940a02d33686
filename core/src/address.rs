//! Address codec: version byte + hash160 + base58check checksum, in
//! either direction.

use thiserror::Error;

use crate::codec::{base58check_decode, base58check_encode, hash160, CodecError};
use crate::crypto::PublicKey;

/// Which Bitcoin-derived network an address's version byte selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetworkType {
    Main,
    Test,
}

/// The standard-template family a locking script's hash identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressType {
    P2pkh,
    P2sh,
}

/// Errors raised while encoding or decoding addresses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The base58check-decoded payload was not exactly 25 bytes
    /// (1 version + 20 hash + 4 checksum, checksum already stripped by
    /// the base58check layer leaves 21).
    #[error("address payload must decode to 21 bytes (1 version + 20 hash), found {0}")]
    InvalidAddressLength(usize),
    /// The version byte did not match any entry in the version table.
    #[error("unrecognized address version byte: {0:#04x}")]
    UnknownVersionByte(u8),
    /// base58check decoding failed.
    #[error("invalid address encoding: {0}")]
    Encoding(#[from] CodecError),
}

/// A decoded address: a version byte plus the 20-byte hash it commits to.
///
/// `addressType` is a pure function of `version` via the version table;
/// there is no way to construct an `Address` whose `addressType`
/// disagrees with its `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    version: u8,
    hash160: [u8; 20],
}

fn version_table(version: u8) -> Option<(NetworkType, AddressType)> {
    match version {
        0x00 => Some((NetworkType::Main, AddressType::P2pkh)),
        0x05 => Some((NetworkType::Main, AddressType::P2sh)),
        0x6F => Some((NetworkType::Test, AddressType::P2pkh)),
        0xC4 => Some((NetworkType::Test, AddressType::P2sh)),
        _ => None,
    }
}

fn version_byte(network: NetworkType, address_type: AddressType) -> u8 {
    match (network, address_type) {
        (NetworkType::Main, AddressType::P2pkh) => 0x00,
        (NetworkType::Main, AddressType::P2sh) => 0x05,
        (NetworkType::Test, AddressType::P2pkh) => 0x6F,
        (NetworkType::Test, AddressType::P2sh) => 0xC4,
    }
}

impl Address {
    /// Constructs a P2PKH address from a public key, hashing its *exact*
    /// supplied encoding (compressed vs. uncompressed yields different
    /// addresses — this is deliberate, not an oversight).
    pub fn from_public_key(pubkey: &PublicKey, network: NetworkType) -> Self {
        Self {
            version: version_byte(network, AddressType::P2pkh),
            hash160: pubkey.hash160(),
        }
    }

    /// Constructs a P2SH address from a redeem script's raw bytes.
    pub fn from_script(script_bytes: &[u8], network: NetworkType) -> Self {
        Self {
            version: version_byte(network, AddressType::P2sh),
            hash160: hash160(script_bytes),
        }
    }

    /// Constructs an address directly from a known version byte and
    /// hash160, validating the version byte against the table.
    pub fn from_parts(version: u8, hash160: [u8; 20]) -> Result<Self, AddressError> {
        version_table(version).ok_or(AddressError::UnknownVersionByte(version))?;
        Ok(Self { version, hash160 })
    }

    /// The 20-byte hash this address commits to.
    pub fn hash160(&self) -> [u8; 20] {
        self.hash160
    }

    /// The raw version byte.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The network this address's version byte selects.
    pub fn network(&self) -> NetworkType {
        version_table(self.version).expect("version validated at construction").0
    }

    /// The address-type family (P2PKH/P2SH) this address's version byte
    /// selects — a pure function of `version`.
    pub fn address_type(&self) -> AddressType {
        version_table(self.version).expect("version validated at construction").1
    }

    /// `base58check(version ∥ hash160)`.
    pub fn to_string_repr(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version);
        payload.extend_from_slice(&self.hash160);
        base58check_encode(&payload)
    }

    /// Parses a base58check address string. Rejects any payload whose
    /// decoded length (post-checksum-strip) is not exactly 21 bytes, and
    /// any version byte outside the recognized table.
    pub fn from_str_repr(s: &str) -> Result<Self, AddressError> {
        let payload = base58check_decode(s)?;
        if payload.len() != 21 {
            return Err(AddressError::InvalidAddressLength(payload.len()));
        }
        let version = payload[0];
        version_table(version).ok_or(AddressError::UnknownVersionByte(version))?;
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(&payload[1..21]);
        Ok(Self { version, hash160 })
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_repr())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_repr(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{PrivateKey, PublicKeyEncoding};

    #[test]
    fn round_trips_through_string() {
        let key = PrivateKey::generate();
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let addr = Address::from_public_key(&pubkey, NetworkType::Main);
        let s = addr.to_string_repr();
        let parsed: Address = s.parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn known_vector_uncompressed_key_to_address() {
        // Textbook vector (Bitcoin wiki "Technical background of version 1
        // Bitcoin addresses"): private scalar
        // 18E14A7B6A307F426A94F8114701E7C8E774E7F9A47E2C2035DB29A206321725
        // produces the uncompressed public key below, hash160
        // 010966776006953d5567439e5e39f86a0d273bee, and mainnet P2PKH
        // address 16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM. This vector predates
        // compressed-key WIFs, hence the uncompressed encoding here.
        let scalar: [u8; 32] = hex::decode("18E14A7B6A307F426A94F8114701E7C8E774E7F9A47E2C2035DB29A206321725")
            .unwrap()
            .try_into()
            .unwrap();
        let key = PrivateKey::from_bytes(&scalar).unwrap();
        let pubkey = key.public_key(PublicKeyEncoding::Uncompressed);
        assert_eq!(
            hex::encode(pubkey.to_bytes()),
            "0450863ad64a87ae8a2fe83c1af1a8403cb53f53e486d8511dad8a04887e5b23522cd470243453a299fa9e77237716103abc11a1df38855ed6f2ee187e9c582ba6"
        );
        let addr = Address::from_public_key(&pubkey, NetworkType::Main);
        assert_eq!(hex::encode(addr.hash160()), "010966776006953d5567439e5e39f86a0d273bee");
        assert_eq!(addr.to_string_repr(), "16UwLL9Risc3QfPqBUvKofHmBQ7wMtjvM");
    }

    #[test]
    fn rejects_unknown_version_byte() {
        let mut payload = vec![0x01u8];
        payload.extend_from_slice(&[0u8; 20]);
        let encoded = base58check_encode(&payload);
        assert_eq!(Address::from_str_repr(&encoded), Err(AddressError::UnknownVersionByte(0x01)));
    }

    #[test]
    fn rejects_wrong_length_payload() {
        let payload = vec![0x00u8; 10];
        let encoded = base58check_encode(&payload);
        assert_eq!(Address::from_str_repr(&encoded), Err(AddressError::InvalidAddressLength(10)));
    }
}
