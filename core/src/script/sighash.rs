//! SIGHASH preimage construction: legacy transaction-copy-and-mask
//! preimages and the fork-ID/BIP143-style preimage this library
//! defaults to.

use crate::codec::{hash256, write_varint};
use crate::transaction::model::{Transaction, TxInput, TxOutput};

use super::chunk::Script;
use super::opcode::Opcode;

/// `ALL=1`, `NONE=2`, `SINGLE=3`, plus the `ANYONECANPAY` and `FORKID`
/// modifier bits.
pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;
pub const SIGHASH_FORKID: u8 = 0x40;

/// A decomposed SIGHASH type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashType(pub u8);

impl SighashType {
    pub fn new(byte: u8) -> Self {
        SighashType(byte)
    }

    pub fn byte(self) -> u8 {
        self.0
    }

    fn base(self) -> u8 {
        self.0 & 0x1f
    }

    pub fn is_all(self) -> bool {
        self.base() == SIGHASH_ALL
    }

    pub fn is_none(self) -> bool {
        self.base() == SIGHASH_NONE
    }

    pub fn is_single(self) -> bool {
        self.base() == SIGHASH_SINGLE
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & SIGHASH_ANYONECANPAY != 0
    }

    pub fn fork_id(self) -> bool {
        self.0 & SIGHASH_FORKID != 0
    }
}

/// The historical `SIGHASH_SINGLE` bug preimage: when the input being
/// signed has no corresponding output, the preimage is defined to be
/// this fixed 32-byte value rather than any hash of transaction data.
pub const SINGLE_BUG_PREIMAGE: [u8; 32] = {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    bytes
};

/// Strips `OP_CODESEPARATOR` bytes from a subscript. A script with no
/// separators at all passes through unchanged.
fn strip_codeseparators(script: &Script) -> Script {
    let chunks = script
        .chunks()
        .iter()
        .filter(|chunk| !matches!(chunk, super::chunk::Chunk::Op(Opcode::OP_CODESEPARATOR)))
        .cloned()
        .collect();
    Script(chunks)
}

/// Computes the legacy (FORKID-clear) signature hash for input
/// `input_index`.
///
/// `subscript` is the previous output's locking script with
/// `OP_CODESEPARATOR`s already truncated by the caller at the last
/// executed one; this function still strips any that remain, so passing
/// the untruncated locking script is also correct when no separator has
/// executed yet.
pub fn legacy_sighash(tx: &Transaction, input_index: usize, subscript: &Script, sighash_type: SighashType) -> [u8; 32] {
    if sighash_type.is_single() && input_index >= tx.outputs.len() {
        return SINGLE_BUG_PREIMAGE;
    }

    let stripped_subscript = strip_codeseparators(subscript);

    let mut inputs: Vec<TxInput> = tx
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let mut copy = input.clone();
            copy.unlocking_script = if i == input_index { stripped_subscript.clone() } else { Script::new() };
            if i != input_index && (sighash_type.is_none() || sighash_type.is_single()) {
                copy.sequence = 0;
            }
            copy
        })
        .collect();

    if sighash_type.anyone_can_pay() {
        inputs = vec![inputs.remove(input_index)];
    }

    let outputs: Vec<TxOutput> = if sighash_type.is_all() {
        tx.outputs.clone()
    } else if sighash_type.is_none() {
        Vec::new()
    } else {
        // SINGLE: all outputs before `input_index` are blanked to
        // value=-1/empty-script; the index itself is kept verbatim;
        // anything after is dropped entirely.
        tx.outputs[..=input_index]
            .iter()
            .enumerate()
            .map(|(i, output)| {
                if i == input_index {
                    output.clone()
                } else {
                    TxOutput { value: -1, locking_script: Script::new() }
                }
            })
            .collect()
    };

    let mut modified = Transaction::new(tx.version, tx.lock_time);
    for input in inputs {
        modified.add_input(input);
    }
    for output in outputs {
        modified.add_output(output);
    }

    let mut preimage = modified.serialize();
    preimage.extend_from_slice(&(sighash_type.byte() as u32).to_le_bytes());
    hash256(&preimage)
}

fn hash_prevouts(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        buf.extend_from_slice(&input.prev_tx_id);
        buf.extend_from_slice(&input.prev_out_index.to_le_bytes());
    }
    hash256(&buf)
}

fn hash_sequence(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        buf.extend_from_slice(&input.sequence.to_le_bytes());
    }
    hash256(&buf)
}

fn hash_outputs(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::new();
    for output in &tx.outputs {
        buf.extend_from_slice(&output.value.to_le_bytes());
        let script_bytes = output.locking_script.to_bytes();
        write_varint(&mut buf, script_bytes.len() as u64);
        buf.extend_from_slice(&script_bytes);
    }
    hash256(&buf)
}

fn hash_single_output(tx: &Transaction, input_index: usize) -> [u8; 32] {
    let output = &tx.outputs[input_index];
    let mut buf = Vec::new();
    buf.extend_from_slice(&output.value.to_le_bytes());
    let script_bytes = output.locking_script.to_bytes();
    write_varint(&mut buf, script_bytes.len() as u64);
    buf.extend_from_slice(&script_bytes);
    hash256(&buf)
}

/// Computes the fork-ID/BIP143-style signature hash for input
/// `input_index`. This is the preimage form this library signs by
/// default.
pub fn fork_id_sighash(tx: &Transaction, input_index: usize, subscript: &Script, value: i64, sighash_type: SighashType) -> [u8; 32] {
    let stripped_subscript = strip_codeseparators(subscript);
    let input = &tx.inputs[input_index];

    let zero = [0u8; 32];
    let hash_prevouts = if sighash_type.anyone_can_pay() { zero } else { hash_prevouts(tx) };
    let hash_sequence = if sighash_type.anyone_can_pay() || sighash_type.is_none() || sighash_type.is_single() {
        zero
    } else {
        hash_sequence(tx)
    };
    let hash_outputs = if sighash_type.is_single() {
        if input_index < tx.outputs.len() {
            hash_single_output(tx, input_index)
        } else {
            zero
        }
    } else if sighash_type.is_all() {
        hash_outputs(tx)
    } else {
        zero
    };

    let mut preimage = Vec::new();
    preimage.extend_from_slice(&tx.version.to_le_bytes());
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    preimage.extend_from_slice(&input.prev_tx_id);
    preimage.extend_from_slice(&input.prev_out_index.to_le_bytes());
    let script_bytes = stripped_subscript.to_bytes();
    write_varint(&mut preimage, script_bytes.len() as u64);
    preimage.extend_from_slice(&script_bytes);
    preimage.extend_from_slice(&value.to_le_bytes());
    preimage.extend_from_slice(&input.sequence.to_le_bytes());
    preimage.extend_from_slice(&hash_outputs);
    preimage.extend_from_slice(&tx.lock_time.to_le_bytes());
    preimage.extend_from_slice(&(sighash_type.byte() as u32).to_le_bytes());
    hash256(&preimage)
}

/// Dispatches to the legacy or fork-ID preimage based on `sighash_type`'s
/// `FORKID` bit.
pub fn compute_sighash(tx: &Transaction, input_index: usize, subscript: &Script, value: i64, sighash_type: SighashType) -> [u8; 32] {
    if sighash_type.fork_id() {
        fork_id_sighash(tx, input_index, subscript, value, sighash_type)
    } else {
        legacy_sighash(tx, input_index, subscript, sighash_type)
    }
}
