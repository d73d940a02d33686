//! The transaction model and the builder/signer that assembles,
//! fee-balances, and signs a spend.

pub mod builder;
pub mod model;

pub use builder::{
    BuilderError, SignedTransaction, TransactionBuilder, TransactionSignatureChecker, UnsignedTransaction,
    DEFAULT_DUST_THRESHOLD, DEFAULT_FEE_PER_KB, MAX_MONEY, NLOCKTIME_MAX_VALUE,
};
pub use model::{Transaction, TransactionParseError, TxInput, TxOutput, Utxo};
