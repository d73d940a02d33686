//! Transaction model: inputs, outputs, wire serialization, and the
//! lazily-cached txid.

use std::cell::Cell;

use crate::codec::{hash256, read_varint, write_varint, CodecError};
use crate::script::chunk::{Script, ScriptParseError};

/// An unspent output this library can spend from: the data a builder
/// needs but does not look up itself, since the core is I/O-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub prev_tx_id: [u8; 32],
    pub prev_out_index: u32,
    pub value: i64,
    pub locking_script: Script,
}

/// One transaction input. `utxo` carries the spent value and prior
/// locking script when known — required to sign, optional to merely
/// serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub prev_tx_id: [u8; 32],
    pub prev_out_index: u32,
    pub unlocking_script: Script,
    pub sequence: u32,
    pub utxo: Option<Utxo>,
}

impl TxInput {
    pub fn new(prev_tx_id: [u8; 32], prev_out_index: u32, sequence: u32) -> Self {
        TxInput {
            prev_tx_id,
            prev_out_index,
            unlocking_script: Script::new(),
            sequence,
            utxo: None,
        }
    }
}

/// One transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: i64,
    pub locking_script: Script,
}

/// Errors raised while parsing a transaction's wire bytes.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransactionParseError {
    #[error("transaction bytes truncated: expected {expected} more byte(s), found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("input/output script failed to parse: {0}")]
    BadScript(#[from] ScriptParseError),
    #[error("malformed varint length prefix")]
    BadVarint(#[from] CodecError),
}

/// A transaction: version, inputs, outputs, and nLockTime.
///
/// The txid is recomputed lazily and cached; any method that mutates
/// the input/output/version/lock-time fields through the provided
/// mutators invalidates the cache, so `txid()` never returns a value
/// stale with respect to the current serialization.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
    cached_txid: Cell<Option<[u8; 32]>>,
}

impl Transaction {
    pub fn new(version: i32, lock_time: u32) -> Self {
        Transaction {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time,
            cached_txid: Cell::new(None),
        }
    }

    /// Appends an input and invalidates the cached txid.
    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
        self.cached_txid.set(None);
    }

    /// Appends an output and invalidates the cached txid.
    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
        self.cached_txid.set(None);
    }

    /// Replaces an input's unlocking script (what signing does) and
    /// invalidates the cached txid.
    pub fn set_unlocking_script(&mut self, index: usize, script: Script) {
        self.inputs[index].unlocking_script = script;
        self.cached_txid.set(None);
    }

    /// Canonical wire serialization: fields in declaration order,
    /// scripts varint-length-prefixed, counts as varints, little-endian
    /// throughout.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.prev_tx_id);
            out.extend_from_slice(&input.prev_out_index.to_le_bytes());
            let script_bytes = input.unlocking_script.to_bytes();
            write_varint(&mut out, script_bytes.len() as u64);
            out.extend_from_slice(&script_bytes);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            let script_bytes = output.locking_script.to_bytes();
            write_varint(&mut out, script_bytes.len() as u64);
            out.extend_from_slice(&script_bytes);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    /// Parses a transaction from its wire bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, TransactionParseError> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let version = i32::from_le_bytes(cursor.take(4)?.try_into().unwrap());
        let input_count = cursor.take_varint()?;
        let mut inputs = Vec::with_capacity(input_count as usize);
        for _ in 0..input_count {
            let prev_tx_id: [u8; 32] = cursor.take(32)?.try_into().unwrap();
            let prev_out_index = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap());
            let script_len = cursor.take_varint()?;
            let script_bytes = cursor.take(script_len as usize)?;
            let unlocking_script = Script::parse(script_bytes)?;
            let sequence = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap());
            inputs.push(TxInput { prev_tx_id, prev_out_index, unlocking_script, sequence, utxo: None });
        }
        let output_count = cursor.take_varint()?;
        let mut outputs = Vec::with_capacity(output_count as usize);
        for _ in 0..output_count {
            let value = i64::from_le_bytes(cursor.take(8)?.try_into().unwrap());
            let script_len = cursor.take_varint()?;
            let script_bytes = cursor.take(script_len as usize)?;
            let locking_script = Script::parse(script_bytes)?;
            outputs.push(TxOutput { value, locking_script });
        }
        let lock_time = u32::from_le_bytes(cursor.take(4)?.try_into().unwrap());
        Ok(Transaction { version, inputs, outputs, lock_time, cached_txid: Cell::new(None) })
    }

    /// `hash256(serialize())`, internal byte order (as it appears in the
    /// wire format, not the conventional display order).
    pub fn txid(&self) -> [u8; 32] {
        if let Some(cached) = self.cached_txid.get() {
            return cached;
        }
        let txid = hash256(&self.serialize());
        self.cached_txid.set(Some(txid));
        txid
    }

    /// The txid rendered in the conventional byte-reversed hex form.
    pub fn txid_hex(&self) -> String {
        let mut reversed = self.txid();
        reversed.reverse();
        hex::encode(reversed)
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TransactionParseError> {
        if self.pos + n > self.bytes.len() {
            return Err(TransactionParseError::Truncated { expected: n, found: self.bytes.len() - self.pos });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_varint(&mut self) -> Result<u64, TransactionParseError> {
        let (value, consumed) = read_varint(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }
}
