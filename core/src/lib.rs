//! BSV-flavored (pre-Genesis) transaction construction, scripting, and
//! key management primitives.
//!
//! The crate is organized the way the specification it implements is:
//! byte-level codecs (`codec`), EC primitives and HD/mnemonic key
//! derivation (`crypto`), the address codec (`address`), the Script
//! value model/opcode table/builders/interpreter (`script`), the
//! transaction model and fee-balancing builder/signer
//! (`transaction`), and signed message framing (`message`).
//!
//! Configuration loading (a TOML file plus environment overrides) is a
//! `bsv-cli` concern, not this crate's — this library takes plain
//! values (a fee rate, a `ScriptFlags` set, ...) and never reads files
//! itself. The `serde` feature only derives `Serialize`/`Deserialize`
//! on a handful of plain data types (`NetworkType`, `AddressType`) so a
//! caller's own config struct can embed them directly.
//!
//! Nothing in this crate performs network I/O or persists state — a
//! caller supplies UTXOs and broadcasts the resulting wire bytes itself.

pub mod address;
pub mod codec;
pub mod crypto;
pub mod message;
pub mod script;
pub mod transaction;

mod error;

pub use error::Error;

pub use address::{Address, AddressError, AddressType, NetworkType};
pub use message::{sign_message, verify_message};
pub use transaction::{
    BuilderError, SignedTransaction, Transaction, TransactionBuilder, TransactionSignatureChecker,
    TransactionParseError, TxInput, TxOutput, UnsignedTransaction, Utxo,
};
