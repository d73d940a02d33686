//! The crate-level error, aggregating each subsystem's typed error via
//! `#[from]` so callers who don't care which layer failed can propagate
//! a single `bsv_core::Error` with `?`.

use thiserror::Error;

use crate::address::AddressError;
use crate::codec::CodecError;
use crate::crypto::{CryptoError, DerivationError, MnemonicError};
use crate::script::builders::NotAStandardTemplate;
use crate::script::chunk::ScriptParseError;
use crate::script::interpreter::ScriptError;
use crate::script::num::ScriptNumError;
use crate::transaction::builder::BuilderError;
use crate::transaction::model::TransactionParseError;

/// The union of every error this crate's public API can return.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    #[error(transparent)]
    Mnemonic(#[from] MnemonicError),
    #[error(transparent)]
    ScriptParse(#[from] ScriptParseError),
    #[error(transparent)]
    ScriptNum(#[from] ScriptNumError),
    #[error(transparent)]
    ScriptEval(#[from] ScriptError),
    #[error(transparent)]
    NotAStandardTemplate(#[from] NotAStandardTemplate),
    #[error(transparent)]
    TransactionParse(#[from] TransactionParseError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
}
