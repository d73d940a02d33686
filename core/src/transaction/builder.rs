//! The transaction builder: incremental assembly of inputs and outputs,
//! the fee-rate fixed-point loop that sizes (or drops) the change
//! output, and per-input signing.
//!
//! The builder returns itself from each step, with signing moved to a
//! terminal, structurally-frozen stage — eliminating the "signature
//! stale after a later structural mutation" hazard at the type level
//! rather than by runtime bookkeeping. `TransactionBuilder` accumulates
//! inputs/outputs and is consumed by `finalize()` into an
//! `UnsignedTransaction`, which exposes no way to add another input or
//! output — only to sign the ones already fixed. `finish()` then
//! consumes that into an immutable `SignedTransaction`.

use thiserror::Error;

use crate::crypto::{sign_hash, verify_signature, DerSignature, PrivateKey, PublicKey};
use crate::script::builders::{LockBuilder, UnlockBuilder, UnlockContext};
use crate::script::chunk::Script;
use crate::script::interpreter::SignatureChecker;
use crate::script::sighash::{compute_sighash, SighashType};

use super::model::{Transaction, TxInput, TxOutput, Utxo};

/// Bitcoin's maximum circulating supply in satoshis, used to bound any
/// single output value.
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// A `sequence` value that enables `nLockTime` while disabling
/// RBF-like re-spending of the input.
pub const NLOCKTIME_MAX_VALUE: u32 = 0xFFFF_FFFE;

/// Default target fee density, satoshis per 1000 serialized bytes.
pub const DEFAULT_FEE_PER_KB: u64 = 1000;

/// Default dust threshold in satoshis: a change output below this value
/// is dropped rather than created.
pub const DEFAULT_DUST_THRESHOLD: u64 = 546;

/// The default SIGHASH mode this library signs with absent an explicit
/// caller choice: `FORKID` is the default mode, but it is only enforced
/// by the interpreter when the caller also sets the `FORKID` evaluation
/// flag.
pub const DEFAULT_SIGHASH_TYPE: SighashType =
    SighashType(crate::script::sighash::SIGHASH_ALL | crate::script::sighash::SIGHASH_FORKID);

/// Errors raised while building, fee-balancing, or signing a transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// Input value minus non-change output value is less than the
    /// required fee at the target rate.
    #[error("insufficient funds: inputs cover outputs plus at most {shortfall} of the required fee")]
    InsufficientFunds { shortfall: i64 },
    /// An output (or the sum of outputs) carried a value outside
    /// `0..=MAX_MONEY`.
    #[error("output value {0} exceeds MAX_MONEY or is negative")]
    ExcessiveValue(i64),
    /// `sendChangeTo` was never called but the fee loop needed a change
    /// output (not itself an error today — callers may legitimately want
    /// no change — kept for API symmetry with the rest of this error
    /// taxonomy).
    #[error("no change output destination was configured")]
    ChangeAddressNotSet,
    /// An input has no associated UTXO value/locking script, so its
    /// contribution to the fee loop or its SIGHASH preimage cannot be
    /// computed.
    #[error("input {0} has no associated UTXO")]
    MissingUtxoValue(usize),
    /// `signInput` was called for an index with no unlock builder on
    /// record.
    #[error("input {0} has no stored unlock builder")]
    MissingUnlockBuilder(usize),
    /// `finish()` was called while one or more inputs still carry an
    /// empty unlocking script.
    #[error("input {0} was never signed")]
    UnsignedInput(usize),
    /// `index` was out of bounds for the transaction's input list.
    #[error("input index {0} out of bounds")]
    InputIndexOutOfBounds(usize),
}

struct PendingInput {
    utxo: Utxo,
    sequence: u32,
    unlock_builder: Box<dyn UnlockBuilder + Send + Sync>,
}

/// Accumulates inputs, outputs, and a change destination, then
/// fee-balances them into a frozen, sign-ready transaction.
///
/// Every method consumes and returns `Self` so callers chain calls in
/// the style `TransactionBuilder::new().spend_from_output(..).spend_to(..)?`.
pub struct TransactionBuilder {
    version: i32,
    lock_time: u32,
    inputs: Vec<PendingInput>,
    outputs: Vec<TxOutput>,
    change_lock_builder: Option<Box<dyn LockBuilder>>,
    fee_per_kb: u64,
    dust_threshold: u64,
    default_sighash: SighashType,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        TransactionBuilder {
            version: 1,
            lock_time: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            change_lock_builder: None,
            fee_per_kb: DEFAULT_FEE_PER_KB,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            default_sighash: DEFAULT_SIGHASH_TYPE,
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    /// Appends an input referencing `utxo`, storing `unlock_builder` for
    /// later signing. `sequence` defaults to `0xFFFFFFFF`; pass
    /// `NLOCKTIME_MAX_VALUE` to enable `lock_time` without leaving the
    /// input re-spendable.
    pub fn spend_from_output(
        mut self,
        utxo: Utxo,
        sequence: u32,
        unlock_builder: Box<dyn UnlockBuilder + Send + Sync>,
    ) -> Self {
        self.inputs.push(PendingInput { utxo, sequence, unlock_builder });
        self
    }

    /// Appends an output paying `value` satoshis to whatever
    /// `lock_builder` produces.
    pub fn spend_to(mut self, lock_builder: &dyn LockBuilder, value: i64) -> Result<Self, BuilderError> {
        if !(0..=MAX_MONEY).contains(&value) {
            return Err(BuilderError::ExcessiveValue(value));
        }
        self.outputs.push(TxOutput { value, locking_script: lock_builder.build_lock() });
        Ok(self)
    }

    /// Designates the change output's destination template; `finalize`
    /// adds, resizes, or omits it to hit the target fee.
    pub fn send_change_to(mut self, lock_builder: Box<dyn LockBuilder>) -> Self {
        self.change_lock_builder = Some(lock_builder);
        self
    }

    /// Sets the target fee density in satoshis per 1000 bytes (default
    /// 1000).
    pub fn with_fee_per_kb(mut self, rate: u64) -> Self {
        self.fee_per_kb = rate;
        self
    }

    /// Overrides the default dust threshold (default 546 satoshis).
    /// Applied flatly regardless of the change script's own template —
    /// callers wanting a template-aware threshold compute it themselves
    /// before calling this.
    pub fn with_dust_threshold(mut self, threshold: u64) -> Self {
        self.dust_threshold = threshold;
        self
    }

    /// Sets the default SIGHASH type `UnsignedTransaction::sign_input_default`
    /// uses when the caller doesn't specify one per input.
    pub fn with_default_sighash(mut self, sighash_type: SighashType) -> Self {
        self.default_sighash = sighash_type;
        self
    }

    /// Runs the fee fixed-point algorithm and freezes the input/output
    /// shape into an `UnsignedTransaction`.
    ///
    /// Because every `TxOutput`'s serialized size is independent of its
    /// `value` field, the loop resolves in at most two fee computations:
    /// one assuming the change output is kept, and — only if that change
    /// would fall under the dust threshold — one with it dropped
    /// entirely.
    pub fn finalize(self) -> Result<UnsignedTransaction, BuilderError> {
        let input_total: i64 = self.inputs.iter().map(|i| i.utxo.value).sum();
        let output_total: i64 = self.outputs.iter().map(|o| o.value).sum();
        let placeholder_sizes: Vec<usize> = self.inputs.iter().map(|i| i.unlock_builder.estimate_size()).collect();

        let final_outputs = match &self.change_lock_builder {
            None => {
                let size = estimate_tx_size(&placeholder_sizes, &self.outputs, None);
                let fee = fee_for_size(size, self.fee_per_kb);
                tracing::debug!(size, fee, "fee loop: no change output configured");
                let shortfall = input_total - output_total - fee;
                if shortfall < 0 {
                    return Err(BuilderError::InsufficientFunds { shortfall: -shortfall });
                }
                self.outputs
            }
            Some(change_builder) => {
                let change_script = change_builder.build_lock();
                let placeholder_change = TxOutput { value: 0, locking_script: change_script.clone() };
                let size_with_change = estimate_tx_size(&placeholder_sizes, &self.outputs, Some(&placeholder_change));
                let fee_with_change = fee_for_size(size_with_change, self.fee_per_kb);
                let change_value = input_total - output_total - fee_with_change;
                tracing::debug!(size_with_change, fee_with_change, change_value, "fee loop: iteration 1 (change kept)");

                if change_value >= 0 && change_value as u64 >= self.dust_threshold {
                    let mut outputs = self.outputs;
                    outputs.push(TxOutput { value: change_value, locking_script: change_script });
                    outputs
                } else {
                    // Change would be negative or sub-dust: drop it and
                    // recompute the fee against the smaller transaction.
                    tracing::warn!(change_value, dust_threshold = self.dust_threshold, "fee loop: dropping sub-dust change output");
                    let size_without_change = estimate_tx_size(&placeholder_sizes, &self.outputs, None);
                    let fee_without_change = fee_for_size(size_without_change, self.fee_per_kb);
                    let shortfall = input_total - output_total - fee_without_change;
                    tracing::debug!(size_without_change, fee_without_change, "fee loop: iteration 2 (change dropped)");
                    if shortfall < 0 {
                        return Err(BuilderError::InsufficientFunds { shortfall: -shortfall });
                    }
                    self.outputs
                }
            }
        };

        let mut tx = Transaction::new(self.version, self.lock_time);
        for pending in &self.inputs {
            let mut input = TxInput::new(pending.utxo.prev_tx_id, pending.utxo.prev_out_index, pending.sequence);
            input.utxo = Some(pending.utxo.clone());
            tx.add_input(input);
        }
        for output in final_outputs {
            tx.add_output(output);
        }

        Ok(UnsignedTransaction {
            tx,
            unlock_builders: self.inputs.into_iter().map(|i| i.unlock_builder).collect(),
            default_sighash: self.default_sighash,
        })
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `ceil(size_bytes * rate / 1000)`.
fn fee_for_size(size_bytes: usize, fee_per_kb: u64) -> i64 {
    let numerator = size_bytes as u64 * fee_per_kb;
    numerator.div_ceil(1000) as i64
}

/// The wire size a transaction with the given placeholder unlocking-script
/// sizes and output set would serialize to — used by the fee loop before
/// any real signature exists to measure.
fn estimate_tx_size(placeholder_unlock_sizes: &[usize], outputs: &[TxOutput], change: Option<&TxOutput>) -> usize {
    let mut size = 4; // version
    size += crate::codec::varint_len(placeholder_unlock_sizes.len() as u64);
    for unlock_size in placeholder_unlock_sizes {
        // prevTxId(32) + prevOutIndex(4) + varint(script len) + script + sequence(4)
        size += 32 + 4 + crate::codec::varint_len(*unlock_size as u64) + unlock_size + 4;
    }
    let output_count = outputs.len() + change.is_some() as usize;
    size += crate::codec::varint_len(output_count as u64);
    for output in outputs.iter().chain(change) {
        let script_bytes = output.locking_script.to_bytes();
        size += 8 + crate::codec::varint_len(script_bytes.len() as u64) + script_bytes.len();
    }
    size += 4; // lockTime
    size
}

/// A transaction whose input/output shape is fixed (the fee loop has
/// already run) but which may still have unsigned inputs. This type
/// exposes no way to add another input or output, so there is no
/// structural mutation left that could invalidate a signature once it's
/// in place — only `sign_input` and `finish` remain.
pub struct UnsignedTransaction {
    tx: Transaction,
    unlock_builders: Vec<Box<dyn UnlockBuilder + Send + Sync>>,
    default_sighash: SighashType,
}

impl UnsignedTransaction {
    /// The transaction as it stands — fully shaped, with unsigned inputs
    /// still holding whatever unlocking script (usually empty) they had
    /// before their last `sign_input` call.
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Signs input `index` with a single key under `sighash_type`,
    /// producing the final unlocking script via that input's stored
    /// unlock builder. Overwrites any unlocking script already installed
    /// on that input — signing is idempotent.
    ///
    /// For templates that need more than one signature (P2MS, P2SH
    /// multisig), use `sign_input_multi`.
    pub fn sign_input(&mut self, index: usize, key: &PrivateKey, sighash_type: SighashType) -> Result<(), BuilderError> {
        self.sign_input_multi(index, &[key], sighash_type)
    }

    /// Signs input `index` with `sighash_type`, using this builder's
    /// configured default SIGHASH type.
    pub fn sign_input_default(&mut self, index: usize, key: &PrivateKey) -> Result<(), BuilderError> {
        self.sign_input(index, key, self.default_sighash)
    }

    /// Signs input `index` with every key in `keys`, in order, producing
    /// one signature per key and handing all of them to the unlock
    /// builder at once. For P2MS/P2SH multisig templates, callers supply
    /// signatures in the same relative order as their corresponding
    /// public keys.
    pub fn sign_input_multi(&mut self, index: usize, keys: &[&PrivateKey], sighash_type: SighashType) -> Result<(), BuilderError> {
        let input = self.tx.inputs.get(index).ok_or(BuilderError::InputIndexOutOfBounds(index))?;
        let utxo = input.utxo.as_ref().ok_or(BuilderError::MissingUtxoValue(index))?;
        let subscript = utxo.locking_script.clone();
        let value = utxo.value;

        let digest = compute_sighash(&self.tx, index, &subscript, value, sighash_type);
        let sighash_byte = sighash_type.byte();

        let mut signatures = Vec::with_capacity(keys.len());
        for key in keys {
            let sig = sign_hash(key, &digest);
            let mut bytes = sig.as_bytes().to_vec();
            bytes.push(sighash_byte);
            signatures.push(bytes);
        }

        let unlock_builder = self.unlock_builders.get(index).ok_or(BuilderError::MissingUnlockBuilder(index))?;
        let script = unlock_builder.build_unlock(&UnlockContext { signatures });
        self.tx.set_unlocking_script(index, script);
        Ok(())
    }

    /// Consumes this into an immutable `SignedTransaction`, failing if
    /// any input still carries an empty unlocking script.
    pub fn finish(self) -> Result<SignedTransaction, BuilderError> {
        for (index, input) in self.tx.inputs.iter().enumerate() {
            if input.unlocking_script.chunks().is_empty() {
                return Err(BuilderError::UnsignedInput(index));
            }
        }
        Ok(SignedTransaction { tx: self.tx })
    }
}

/// A transaction every input of which has been signed. Immutable by
/// construction — there is no method that mutates `tx` once wrapped
/// here.
pub struct SignedTransaction {
    tx: Transaction,
}

impl SignedTransaction {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn into_inner(self) -> Transaction {
        self.tx
    }

    /// A `SignatureChecker` bound to input `index` of this transaction,
    /// for feeding `crate::script::interpreter::verify_script` against
    /// that input's own unlocking/locking script pair. `value` is the
    /// spent UTXO's value, needed for the fork-ID preimage.
    pub fn checker_for(&self, index: usize, value: i64) -> TransactionSignatureChecker<'_> {
        TransactionSignatureChecker { tx: &self.tx, input_index: index, value }
    }
}

/// Verifies `OP_CHECKSIG`/`OP_CHECKMULTISIG` signatures against the
/// actual SIGHASH preimage of a real transaction input, dispatching to
/// the legacy or fork-ID preimage per the signature's own trailing
/// sighash byte. A signature or public key that fails to parse is
/// treated as a script failure (returns `false`), not an interpreter
/// crash, per the `SignatureChecker` contract.
pub struct TransactionSignatureChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    value: i64,
}

impl<'a> TransactionSignatureChecker<'a> {
    pub fn new(tx: &'a Transaction, input_index: usize, value: i64) -> Self {
        TransactionSignatureChecker { tx, input_index, value }
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], subscript: &Script) -> bool {
        let Some((sighash_byte, der)) = sig.split_last() else {
            return false;
        };
        let Ok(der_sig) = DerSignature::from_der(der) else {
            return false;
        };
        let Ok(public_key) = PublicKey::from_bytes(pubkey) else {
            return false;
        };

        let digest = compute_sighash(self.tx, self.input_index, subscript, self.value, SighashType::new(*sighash_byte));
        verify_signature(&public_key, &digest, &der_sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, NetworkType};
    use crate::crypto::PublicKeyEncoding;
    use crate::script::builders::{P2msLockBuilder, P2msUnlockBuilder, P2pkhLockBuilder, P2pkhUnlockBuilder, P2shLockBuilder, P2shUnlockBuilder};
    use crate::script::interpreter::{verify_script, ScriptFlags};

    fn p2pkh_utxo(key: &PrivateKey, value: i64) -> (Utxo, PublicKey) {
        let pubkey = key.public_key(PublicKeyEncoding::Compressed);
        let lock = P2pkhLockBuilder::from_public_key(&pubkey).build_lock();
        (Utxo { prev_tx_id: [0xaa; 32], prev_out_index: 0, value, locking_script: lock }, pubkey)
    }

    #[test]
    fn p2pkh_spend_round_trips_through_the_interpreter() {
        let key_a = PrivateKey::from_bytes(&[0x01; 32]).unwrap();
        let key_b = PrivateKey::from_bytes(&[0x02; 32]).unwrap();
        let (utxo, pubkey_a) = p2pkh_utxo(&key_a, 100_000_000);
        let addr_a = Address::from_public_key(&pubkey_a, NetworkType::Main);
        let pubkey_b = key_b.public_key(PublicKeyEncoding::Compressed);
        let addr_b = Address::from_public_key(&pubkey_b, NetworkType::Main);

        let lock_a = P2pkhLockBuilder::new(addr_a.hash160());
        let lock_b = P2pkhLockBuilder::new(addr_b.hash160());

        let unsigned = TransactionBuilder::new()
            .spend_from_output(utxo, 0xFFFF_FFFF, Box::new(P2pkhUnlockBuilder::new(pubkey_a.to_bytes())))
            .spend_to(&lock_b, 50_000_000)
            .unwrap()
            .send_change_to(Box::new(lock_a))
            .with_fee_per_kb(1000)
            .finalize()
            .unwrap();

        let mut unsigned = unsigned;
        unsigned.sign_input(0, &key_a, DEFAULT_SIGHASH_TYPE).unwrap();
        let signed = unsigned.finish().unwrap();

        let tx = signed.transaction();
        assert_eq!(tx.outputs.len(), 2, "expects a change output alongside the explicit spend");

        let value = tx.inputs[0].utxo.as_ref().unwrap().value;
        let checker = signed.checker_for(0, value);
        let unlocking = tx.inputs[0].unlocking_script.clone();
        let locking = tx.inputs[0].utxo.as_ref().unwrap().locking_script.clone();
        let flags = ScriptFlags::standard();
        assert!(verify_script(&unlocking, &locking, flags, &checker).unwrap());
    }

    #[test]
    fn fee_loop_converges_and_drops_sub_dust_change() {
        let key_a = PrivateKey::from_bytes(&[0x03; 32]).unwrap();
        let (utxo, pubkey_a) = p2pkh_utxo(&key_a, 100_000);
        let addr_a = Address::from_public_key(&pubkey_a, NetworkType::Main);
        let lock_a = P2pkhLockBuilder::new(addr_a.hash160());

        // Spend almost everything so the residual change would land
        // under the default 546-satoshi dust threshold.
        let unsigned = TransactionBuilder::new()
            .spend_from_output(utxo, 0xFFFF_FFFF, Box::new(P2pkhUnlockBuilder::new(pubkey_a.to_bytes())))
            .spend_to(&lock_a, 99_700)
            .unwrap()
            .send_change_to(Box::new(lock_a))
            .finalize()
            .unwrap();

        assert_eq!(unsigned.transaction().outputs.len(), 1, "sub-dust change must be dropped, not retained");
    }

    #[test]
    fn insufficient_funds_is_reported() {
        let key_a = PrivateKey::from_bytes(&[0x04; 32]).unwrap();
        let (utxo, pubkey_a) = p2pkh_utxo(&key_a, 1000);
        let addr_a = Address::from_public_key(&pubkey_a, NetworkType::Main);
        let lock_a = P2pkhLockBuilder::new(addr_a.hash160());

        let result = TransactionBuilder::new()
            .spend_from_output(utxo, 0xFFFF_FFFF, Box::new(P2pkhUnlockBuilder::new(pubkey_a.to_bytes())))
            .spend_to(&lock_a, 1000)
            .unwrap()
            .finalize();

        assert!(matches!(result, Err(BuilderError::InsufficientFunds { .. })));
    }

    #[test]
    fn p2sh_two_of_three_multisig_spend_round_trips_through_the_interpreter() {
        let key_a = PrivateKey::from_bytes(&[0x11; 32]).unwrap();
        let key_b = PrivateKey::from_bytes(&[0x12; 32]).unwrap();
        let key_c = PrivateKey::from_bytes(&[0x13; 32]).unwrap();
        let pubkey_a = key_a.public_key(PublicKeyEncoding::Compressed);
        let pubkey_b = key_b.public_key(PublicKeyEncoding::Compressed);
        let pubkey_c = key_c.public_key(PublicKeyEncoding::Compressed);

        let redeem_script =
            P2msLockBuilder::new(2, vec![pubkey_a.to_bytes(), pubkey_b.to_bytes(), pubkey_c.to_bytes()]).unwrap().build_lock();
        let p2sh_lock = P2shLockBuilder::from_redeem_script(&redeem_script);
        let utxo = Utxo {
            prev_tx_id: [0xbb; 32],
            prev_out_index: 0,
            value: 100_000_000,
            locking_script: p2sh_lock.build_lock(),
        };

        let recipient_key = PrivateKey::from_bytes(&[0x14; 32]).unwrap();
        let recipient_pubkey = recipient_key.public_key(PublicKeyEncoding::Compressed);
        let recipient_addr = Address::from_public_key(&recipient_pubkey, NetworkType::Main);
        let recipient_lock = P2pkhLockBuilder::new(recipient_addr.hash160());

        let inner = std::sync::Arc::new(P2msUnlockBuilder::new(2));
        let unlock_builder = P2shUnlockBuilder::new(redeem_script, inner);

        let unsigned = TransactionBuilder::new()
            .spend_from_output(utxo, 0xFFFF_FFFF, Box::new(unlock_builder))
            .spend_to(&recipient_lock, 50_000_000)
            .unwrap()
            .with_fee_per_kb(1000)
            .finalize()
            .unwrap();

        let mut unsigned = unsigned;
        // Threshold is 2 of 3: sign with keys a and c, skipping b, in the
        // same relative order as their public keys in the redeem script.
        unsigned.sign_input_multi(0, &[&key_a, &key_c], DEFAULT_SIGHASH_TYPE).unwrap();
        let signed = unsigned.finish().unwrap();

        let tx = signed.transaction();
        let value = tx.inputs[0].utxo.as_ref().unwrap().value;
        let checker = signed.checker_for(0, value);
        let unlocking = tx.inputs[0].unlocking_script.clone();
        let locking = tx.inputs[0].utxo.as_ref().unwrap().locking_script.clone();
        let flags = ScriptFlags::standard();
        assert!(verify_script(&unlocking, &locking, flags, &checker).unwrap());
    }

    #[test]
    fn excessive_value_is_rejected() {
        let lock = P2pkhLockBuilder::new([0u8; 20]);
        let result = TransactionBuilder::new().spend_to(&lock, MAX_MONEY + 1);
        assert_eq!(result.err(), Some(BuilderError::ExcessiveValue(MAX_MONEY + 1)));
    }
}
