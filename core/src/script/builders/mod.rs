//! Script builders: typed constructors and parsers for the standard
//! locking/unlocking script templates.
//!
//! Lock/unlock polymorphism is modeled as a capability abstraction
//! rather than a class hierarchy: a builder is anything that can
//! produce an unlocking script given a signing context, and report the
//! worst-case size of what it will produce (needed by the fee
//! fixed-point loop in `crate::transaction::builder` before any
//! signature exists to measure).

mod data;
mod p2ms;
mod p2pk;
mod p2pkh;
mod p2sh;

pub use data::DataLockBuilder;
pub use p2ms::{P2msLockBuilder, P2msUnlockBuilder};
pub use p2pk::{P2pkLockBuilder, P2pkUnlockBuilder};
pub use p2pkh::{P2pkhLockBuilder, P2pkhUnlockBuilder};
pub use p2sh::{P2shLockBuilder, P2shUnlockBuilder};

use thiserror::Error;

use crate::crypto::DerSignature;
use crate::script::chunk::Script;

/// A script failed to match the template its parser expects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("script does not match the {0} template")]
pub struct NotAStandardTemplate(pub &'static str);

/// The materials an `UnlockBuilder` has available once a signature has
/// been produced for its input: the signature plus sighash byte already
/// appended, and (for multi-signature templates) any other signatures
/// collected so far for the same input.
#[derive(Debug, Clone)]
pub struct UnlockContext {
    pub signatures: Vec<Vec<u8>>,
}

impl UnlockContext {
    /// Convenience constructor for single-signature templates (P2PKH,
    /// P2PK): appends the sighash byte and wraps it as the sole entry.
    pub fn single(signature: &DerSignature, sighash_byte: u8) -> Self {
        let mut bytes = signature.as_bytes().to_vec();
        bytes.push(sighash_byte);
        UnlockContext { signatures: vec![bytes] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_appends_sighash_byte_after_der_bytes() {
        let der = DerSignature::from_der(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).unwrap();
        let context = UnlockContext::single(&der, 0x41);
        assert_eq!(context.signatures.len(), 1);
        assert_eq!(context.signatures[0].last(), Some(&0x41));
        assert_eq!(&context.signatures[0][..context.signatures[0].len() - 1], der.as_bytes());
    }
}

/// Produces a locking script, and recovers its parameters from one that
/// matches.
pub trait LockBuilder {
    /// Builds the locking script this template describes.
    fn build_lock(&self) -> Script;
}

/// Produces an unlocking script given a signing context, and reports the
/// worst-case serialized size of what it will produce — used by the fee
/// fixed-point loop before any real signature exists.
pub trait UnlockBuilder {
    fn build_unlock(&self, context: &UnlockContext) -> Script;
    fn estimate_size(&self) -> usize;
}
