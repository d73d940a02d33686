//! The Script subsystem: the chunk/opcode value model, the typed
//! builders for the standard templates, the SIGHASH preimage
//! constructors, and the interpreter that evaluates an unlocking/locking
//! script pair.

pub mod builders;
pub mod chunk;
pub mod interpreter;
pub mod num;
pub mod opcode;
pub mod sighash;

pub use chunk::{Chunk, PushEncoding, Script, ScriptParseError};
pub use num::{ScriptNum, ScriptNumError, DEFAULT_MAX_NUM_SIZE};
pub use opcode::{OpClass, Opcode};
pub use sighash::{SighashType, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_FORKID, SIGHASH_NONE, SIGHASH_SINGLE};
