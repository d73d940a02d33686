//! The script interpreter: a stack VM over main/alt value stacks and a
//! control stack tracking nested `IF/NOTIF/ELSE/ENDIF` execution, plus
//! the two-phase unlock-then-lock evaluation protocol (with the P2SH
//! special case).

pub mod error;
pub mod flags;
mod ops;
pub mod stack;

use crate::script::chunk::{Chunk, PushEncoding, Script};
use crate::script::opcode::Opcode;

pub use error::{ScriptError, ScriptErrorKind};
pub use flags::ScriptFlags;
use stack::{ValueStack, MAX_OP_COUNT, MAX_SCRIPT_ELEMENT_SIZE, MAX_STACK_SIZE};

/// Verifies a candidate `(signature, subscript)` pair against a locking
/// script's commitments. Implemented per-transaction-input by
/// `crate::transaction::builder` and directly by tests that only care
/// about script semantics. A checker that cannot parse `sig`/`pubkey`
/// simply returns `false` rather than erroring — `OP_CHECKSIG` on a
/// malformed signature is a script failure (pushes `false`), not an
/// interpreter crash.
pub trait SignatureChecker {
    fn check_sig(&self, sig: &[u8], pubkey: &[u8], subscript: &Script) -> bool;
}

/// A `SignatureChecker` that always rejects — useful for scripts that
/// are known not to invoke `OP_CHECKSIG`/`OP_CHECKMULTISIG` (e.g. tests
/// of pure stack/arithmetic opcodes).
pub struct NullSignatureChecker;

impl SignatureChecker for NullSignatureChecker {
    fn check_sig(&self, _sig: &[u8], _pubkey: &[u8], _subscript: &Script) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    /// Executing; no enclosing `ELSE` has fired yet.
    Active,
    /// Skipped because the controlling condition was false (or an
    /// enclosing branch is skipped).
    Skipped,
    /// This branch's `ELSE` has already executed; any further `ELSE` at
    /// this depth is an error, but an `ENDIF` is still expected.
    ElseTaken,
}

/// Evaluates `script` against the given main/alt stacks in place,
/// starting with `op_count` already consumed pushes accounted for. The
/// two phases of `verify_script` share one running opcount, bounded at
/// 201 across unlocking + locking.
fn eval_script(
    script: &Script,
    stack: &mut ValueStack,
    alt_stack: &mut ValueStack,
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
    op_count: &mut usize,
) -> Result<(), ScriptError> {
    let mut branches: Vec<Branch> = Vec::new();
    let executing = |branches: &[Branch]| branches.iter().all(|b| *b == Branch::Active);

    for (position, chunk) in script.chunks().iter().enumerate() {
        match chunk {
            Chunk::Push { data, encoding } => {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(ScriptError::new(ScriptErrorKind::PushSize, None, position));
                }
                if !executing(&branches) {
                    continue;
                }
                if flags.has(ScriptFlags::MINIMALDATA) && !is_minimal_push(data, *encoding) {
                    return Err(ScriptError::new(ScriptErrorKind::MinimalData, None, position));
                }
                stack.push(data.clone());
            }
            Chunk::Op(op) => {
                let op = *op;
                match op {
                    Opcode::OP_IF | Opcode::OP_NOTIF => {
                        if executing(&branches) {
                            let cond = stack.pop(position)?;
                            let truthy = is_true_for_if(&cond, flags, position)?;
                            let taken = if op == Opcode::OP_IF { truthy } else { !truthy };
                            branches.push(if taken { Branch::Active } else { Branch::Skipped });
                        } else {
                            branches.push(Branch::Skipped);
                        }
                        continue;
                    }
                    Opcode::OP_ELSE => {
                        let top = branches
                            .last_mut()
                            .ok_or_else(|| ScriptError::new(ScriptErrorKind::UnbalancedConditional, Some(op), position))?;
                        *top = match *top {
                            Branch::Active => Branch::ElseTaken,
                            Branch::Skipped => Branch::Active,
                            Branch::ElseTaken => {
                                return Err(ScriptError::new(ScriptErrorKind::UnbalancedConditional, Some(op), position))
                            }
                        };
                        continue;
                    }
                    Opcode::OP_ENDIF => {
                        if branches.pop().is_none() {
                            return Err(ScriptError::new(ScriptErrorKind::UnbalancedConditional, Some(op), position));
                        }
                        continue;
                    }
                    _ => {}
                }

                if !executing(&branches) {
                    continue;
                }

                // Pushdata opcodes never reach here (handled above as
                // Chunk::Push); everything else counts against opcount
                // except the small-int pushes, which are exempt along
                // with direct pushes.
                if !op.is_push() {
                    *op_count += 1;
                    if *op_count > MAX_OP_COUNT {
                        return Err(ScriptError::new(ScriptErrorKind::OpCount, Some(op), position));
                    }
                }

                if let Some(n) = op.as_small_int() {
                    stack.push(crate::script::num::ScriptNum::new(n).encode());
                    continue;
                }
                if op == Opcode::OP_1NEGATE {
                    stack.push(crate::script::num::ScriptNum::new(-1).encode());
                    continue;
                }

                ops::dispatch(op, stack, alt_stack, flags, checker, script, position)?;

                if stack.len() + alt_stack.len() > MAX_STACK_SIZE {
                    return Err(ScriptError::new(ScriptErrorKind::StackSize, Some(op), position));
                }
            }
        }
    }

    if !branches.is_empty() {
        return Err(ScriptError::new(ScriptErrorKind::UnbalancedConditional, None, script.chunks().len()));
    }
    Ok(())
}

/// Script truthiness: negative zero (`0x80`, or any all-zero string with
/// a `0x80`-flagged last byte) and the empty string both read as false.
/// Used everywhere a stack value is interpreted as a boolean — never a
/// bare `!= []` comparison.
pub(super) fn is_true(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        None => false,
        Some((&last, rest)) => (last & 0x7f != 0) || rest.iter().any(|&b| b != 0),
    }
}

fn is_true_for_if(bytes: &[u8], flags: ScriptFlags, position: usize) -> Result<bool, ScriptError> {
    // MINIMALIF (folded into MINIMALDATA here) requires the IF/NOTIF
    // condition to be exactly `[]` or `[1]`.
    if flags.has(ScriptFlags::MINIMALDATA) && !(bytes.is_empty() || bytes == [1]) {
        return Err(ScriptError::new(ScriptErrorKind::MinimalData, None, position));
    }
    Ok(is_true(bytes))
}

fn is_minimal_push(data: &[u8], encoding: PushEncoding) -> bool {
    match encoding {
        PushEncoding::Zero | PushEncoding::SmallInt => true,
        PushEncoding::Direct => {
            // A single byte in 1..=16 should have used OP_1..OP_16; a
            // single byte of 0x81 should have used OP_1NEGATE. Anything
            // else at or under 75 bytes is correctly a direct push.
            if data.len() == 1 && (data[0] == 0x81 || (1..=16).contains(&data[0])) {
                false
            } else {
                true
            }
        }
        PushEncoding::PushData1 => data.len() > 75,
        PushEncoding::PushData2 => data.len() > 0xff,
        PushEncoding::PushData4 => data.len() > 0xffff,
    }
}

/// Runs the full two-phase evaluation protocol: unlocking script against
/// an empty stack, then locking script against the result, with the
/// P2SH special case when `flags` has `P2SH` set and the locking script
/// matches the P2SH template.
pub fn verify_script(
    unlocking: &Script,
    locking: &Script,
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
) -> Result<bool, ScriptError> {
    if flags.has(ScriptFlags::SIGPUSHONLY) {
        for chunk in unlocking.chunks() {
            if let Chunk::Op(op) = chunk {
                if !op.is_push() {
                    return Err(ScriptError::new(ScriptErrorKind::SigPushOnly, Some(*op), 0));
                }
            }
        }
    }

    let mut op_count = 0usize;
    let mut main_stack = ValueStack::new();
    let mut alt_stack = ValueStack::new();
    eval_script(unlocking, &mut main_stack, &mut alt_stack, flags, checker, &mut op_count)?;

    let stack_after_unlock = main_stack.as_slice().to_vec();

    eval_script(locking, &mut main_stack, &mut alt_stack, flags, checker, &mut op_count)?;

    let top_true = main_stack.as_slice().last().map(|v| is_true(v)).unwrap_or(false);
    if !top_true {
        return Ok(false);
    }
    if flags.has(ScriptFlags::CLEANSTACK) && main_stack.len() != 1 {
        return Err(ScriptError::new(ScriptErrorKind::CleanStack, None, locking.chunks().len()));
    }

    if flags.has(ScriptFlags::P2SH) && is_p2sh_template(locking) {
        let redeem_bytes = stack_after_unlock
            .last()
            .ok_or_else(|| ScriptError::new(ScriptErrorKind::InvalidStackOperation, None, 0))?
            .clone();
        let redeem_script = Script::parse(&redeem_bytes)
            .map_err(|_| ScriptError::new(ScriptErrorKind::BadOpcode, None, 0))?;

        let mut p2sh_stack = ValueStack::new();
        for item in &stack_after_unlock[..stack_after_unlock.len() - 1] {
            p2sh_stack.push(item.clone());
        }
        let mut p2sh_alt = ValueStack::new();
        let mut p2sh_op_count = 0usize;
        eval_script(&redeem_script, &mut p2sh_stack, &mut p2sh_alt, flags, checker, &mut p2sh_op_count)?;

        let top_true = p2sh_stack.as_slice().last().map(|v| is_true(v)).unwrap_or(false);
        if !top_true {
            return Ok(false);
        }
        if flags.has(ScriptFlags::CLEANSTACK) && p2sh_stack.len() != 1 {
            return Err(ScriptError::new(ScriptErrorKind::CleanStack, None, redeem_script.chunks().len()));
        }
    }

    Ok(true)
}

fn is_p2sh_template(script: &Script) -> bool {
    let chunks = script.chunks();
    chunks.len() == 3
        && matches!(chunks[0], Chunk::Op(Opcode::OP_HASH160))
        && matches!(&chunks[1], Chunk::Push { data, .. } if data.len() == 20)
        && matches!(chunks[2], Chunk::Op(Opcode::OP_EQUAL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::hash160;
    use crate::script::opcode::Opcode as Op;

    fn p2pkh_scripts(pubkey: &[u8], sig: &[u8]) -> (Script, Script) {
        let mut unlock = Script::new();
        unlock.push_data(sig.to_vec());
        unlock.push_data(pubkey.to_vec());

        let mut lock = Script::new();
        lock.push_op(Op::OP_DUP);
        lock.push_op(Op::OP_HASH160);
        lock.push_data(hash160(pubkey).to_vec());
        lock.push_op(Op::OP_EQUALVERIFY);
        lock.push_op(Op::OP_CHECKSIG);
        (unlock, lock)
    }

    struct AlwaysTrueChecker;
    impl SignatureChecker for AlwaysTrueChecker {
        fn check_sig(&self, sig: &[u8], _pubkey: &[u8], _subscript: &Script) -> bool {
            !sig.is_empty()
        }
    }

    #[test]
    fn p2pkh_accepts_matching_signature_and_pubkey() {
        let pubkey = vec![0x02; 33];
        let sig = vec![0x30, 0x44, 0x01];
        let (unlock, lock) = p2pkh_scripts(&pubkey, &sig);
        let flags = ScriptFlags::standard().without(ScriptFlags::NULLFAIL);
        let result = verify_script(&unlock, &lock, flags, &AlwaysTrueChecker).unwrap();
        assert!(result);
    }

    #[test]
    fn p2pkh_rejects_wrong_pubkey_hash() {
        let pubkey = vec![0x02; 33];
        let wrong_pubkey = vec![0x03; 33];
        let sig = vec![0x30, 0x44, 0x01];
        let mut unlock = Script::new();
        unlock.push_data(sig);
        unlock.push_data(wrong_pubkey);
        let mut lock = Script::new();
        lock.push_op(Op::OP_DUP);
        lock.push_op(Op::OP_HASH160);
        lock.push_data(hash160(&pubkey).to_vec());
        lock.push_op(Op::OP_EQUALVERIFY);
        lock.push_op(Op::OP_CHECKSIG);

        let flags = ScriptFlags::standard().without(ScriptFlags::NULLFAIL);
        let err = verify_script(&unlock, &lock, flags, &AlwaysTrueChecker).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::EqualVerify);
    }

    #[test]
    fn disabled_opcode_fails_before_consuming_stack() {
        let mut script = Script::new();
        script.push_data(vec![1]);
        script.push_data(vec![2]);
        script.push_op(Op::OP_CAT);
        let flags = ScriptFlags::standard();
        let err = verify_script(&Script::new(), &script, flags, &NullSignatureChecker).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::DisabledOp);
        assert_eq!(err.opcode, Some(Op::OP_CAT));
    }

    #[test]
    fn unbalanced_if_fails_at_end_of_script() {
        let mut script = Script::new();
        script.push_op(Op::OP_1);
        script.push_op(Op::OP_IF);
        script.push_op(Op::OP_1);
        let flags = ScriptFlags::standard();
        let err = verify_script(&Script::new(), &script, flags, &NullSignatureChecker).unwrap_err();
        assert_eq!(err.kind, ScriptErrorKind::UnbalancedConditional);
    }

    #[test]
    fn if_else_endif_selects_branch() {
        let mut script = Script::new();
        script.push_op(Op::OP_0);
        script.push_op(Op::OP_IF);
        script.push_op(Op::OP_RETURN);
        script.push_op(Op::OP_ELSE);
        script.push_op(Op::OP_1);
        script.push_op(Op::OP_ENDIF);
        let flags = ScriptFlags::standard().without(ScriptFlags::CLEANSTACK);
        let result = verify_script(&Script::new(), &script, flags, &NullSignatureChecker).unwrap();
        assert!(result);
    }

    #[test]
    fn p2sh_two_of_three_multisig_accepts_two_signatures() {
        let pk1 = vec![0x02; 33];
        let pk2 = vec![0x03; 33];
        let pk3 = vec![0x04; 33];
        let mut redeem = Script::new();
        redeem.push_op(Op::OP_2);
        redeem.push_data(pk1.clone());
        redeem.push_data(pk2.clone());
        redeem.push_data(pk3.clone());
        redeem.push_op(Op::OP_3);
        redeem.push_op(Op::OP_CHECKMULTISIG);
        let redeem_bytes = redeem.to_bytes();

        let mut lock = Script::new();
        lock.push_op(Op::OP_HASH160);
        lock.push_data(hash160(&redeem_bytes).to_vec());
        lock.push_op(Op::OP_EQUAL);

        let mut unlock = Script::new();
        unlock.push_op(Op::OP_0);
        unlock.push_data(vec![0x30, 0x01]);
        unlock.push_data(vec![0x30, 0x02]);
        unlock.push_data(redeem_bytes);

        let flags = ScriptFlags::standard().without(ScriptFlags::NULLFAIL);
        let result = verify_script(&unlock, &lock, flags, &AlwaysTrueChecker).unwrap();
        assert!(result);
    }

    #[test]
    fn p2sh_single_signature_fails() {
        let pk1 = vec![0x02; 33];
        let pk2 = vec![0x03; 33];
        let pk3 = vec![0x04; 33];
        let mut redeem = Script::new();
        redeem.push_op(Op::OP_2);
        redeem.push_data(pk1);
        redeem.push_data(pk2);
        redeem.push_data(pk3);
        redeem.push_op(Op::OP_3);
        redeem.push_op(Op::OP_CHECKMULTISIG);
        let redeem_bytes = redeem.to_bytes();

        let mut lock = Script::new();
        lock.push_op(Op::OP_HASH160);
        lock.push_data(hash160(&redeem_bytes).to_vec());
        lock.push_op(Op::OP_EQUAL);

        struct OnlyOneSigValid;
        impl SignatureChecker for OnlyOneSigValid {
            fn check_sig(&self, sig: &[u8], _pubkey: &[u8], _subscript: &Script) -> bool {
                sig == [0x30, 0x01]
            }
        }

        // The redeem script declares M=2; supply one signature that
        // validates and one empty (invalid) signature so CHECKMULTISIG
        // sees the two operands it expects but only one passes.
        let mut unlock = Script::new();
        unlock.push_op(Op::OP_0);
        unlock.push_data(Vec::new());
        unlock.push_data(vec![0x30, 0x01]);
        unlock.push_data(redeem_bytes);

        let flags = ScriptFlags::standard().without(ScriptFlags::NULLFAIL);
        let result = verify_script(&unlock, &lock, flags, &OnlyOneSigValid).unwrap();
        assert!(!result);
    }
}
