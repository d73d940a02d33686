//! EC primitives: secp256k1 keypairs, deterministic ECDSA signing, DER
//! (en/de)coding, and the BIP32/BIP39 key-derivation primitives the
//! library's addresses and wallets are built from.
//!
//! Signature arithmetic itself is not reimplemented here — it is
//! delegated to the `secp256k1` crate, which already gives RFC 6979
//! determinism and low-S normalization. This module is the glue: key
//! types, DER framing, sighash-byte handling, and HD derivation.

mod bip32;
mod bip39;
mod ecdsa;
mod keys;

pub use bip32::{DerivationError, ExtendedPrivateKey, ExtendedPublicKey};
pub use bip39::{Mnemonic, MnemonicError, WordCount};
pub use ecdsa::{sign_hash, verify_signature, DerSignature};
pub use keys::{PrivateKey, PublicKey, PublicKeyEncoding, WifNetwork};

use thiserror::Error;

/// Key and signature errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// A 32-byte scalar was zero or not less than the curve order `n`.
    #[error("private key scalar is out of range")]
    InvalidPrivateKey,
    /// A point encoding did not decode to a valid secp256k1 curve point.
    #[error("invalid public key encoding")]
    InvalidPublicKey,
    /// A signature did not parse as valid DER, or parsed but round-tripped
    /// to different bytes (non-canonical DER).
    #[error("invalid DER-encoded signature")]
    InvalidDerSignature,
    /// A signature's `s` value exceeded `n/2` while `LOW_S` was required.
    #[error("signature is not low-S")]
    NonLowS,
    /// The trailing sighash byte was not one of the recognized
    /// `SIGHASH_*` combinations.
    #[error("invalid sighash type byte: {0:#04x}")]
    InvalidSighashType(u8),
    /// A WIF string failed to base58check-decode, or decoded to a payload
    /// of the wrong length for a private-key scalar.
    #[error("invalid WIF-encoded private key: {0}")]
    InvalidWif(#[from] crate::codec::CodecError),
}
