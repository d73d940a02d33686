//! Per-opcode execution. `dispatch` is a dense table-driven function in
//! place of one large conditional: a `match` on `Opcode`, each arm a
//! small, independently testable step.

use crate::codec::{hash160, hash256, sha256};

use super::super::chunk::Script;
use super::super::num::{ScriptNum, DEFAULT_MAX_NUM_SIZE};
use super::super::opcode::{OpClass, Opcode};
use super::error::{ScriptError, ScriptErrorKind};
use super::flags::ScriptFlags;
use super::stack::{ValueStack, MAX_SCRIPT_ELEMENT_SIZE};
use super::{is_true, SignatureChecker};

fn bool_bytes(value: bool) -> Vec<u8> {
    if value { vec![1] } else { Vec::new() }
}

fn pop_num(stack: &mut ValueStack, flags: ScriptFlags, position: usize) -> Result<ScriptNum, ScriptError> {
    let bytes = stack.pop(position)?;
    ScriptNum::decode(&bytes, DEFAULT_MAX_NUM_SIZE, flags.has(ScriptFlags::MINIMALDATA))
        .map_err(|_| ScriptError::new(ScriptErrorKind::BadNumberEncoding, None, position))
}

/// Executes one non-push opcode against `stack`/`alt_stack`. Push
/// opcodes and control-flow bookkeeping (IF/ELSE/ENDIF skipping) are
/// handled by the caller before `dispatch` is reached, since they
/// interact with the execution-branch stack rather than the value
/// stacks alone.
pub fn dispatch(
    op: Opcode,
    stack: &mut ValueStack,
    alt_stack: &mut ValueStack,
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
    subscript: &Script,
    position: usize,
) -> Result<(), ScriptError> {
    use Opcode::*;

    let err = |kind: ScriptErrorKind| ScriptError::new(kind, Some(op), position);

    match op {
        OP_NOP | OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
            if flags.has(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) && !matches!(op, OP_NOP) {
                return Err(err(ScriptErrorKind::BadOpcode));
            }
            Ok(())
        }
        // Promoted to CLTV/CSV by BIP65/112; this library does not model
        // locktime/sequence consensus (out of scope for a script
        // execution engine), so both behave as transparent NOPs.
        OP_CHECKLOCKTIMEVERIFY | OP_CHECKSEQUENCEVERIFY => Ok(()),

        OP_VERIFY => {
            let top = stack.pop(position)?;
            if is_true(&top) {
                Ok(())
            } else {
                Err(err(ScriptErrorKind::Verify))
            }
        }
        OP_RETURN => Err(err(ScriptErrorKind::OpReturn)),

        OP_TOALTSTACK => {
            let v = stack.pop(position)?;
            alt_stack.push(v);
            Ok(())
        }
        OP_FROMALTSTACK => {
            let v = alt_stack.pop(position)?;
            stack.push(v);
            Ok(())
        }
        OP_2DROP => {
            stack.pop(position)?;
            stack.pop(position)?;
            Ok(())
        }
        OP_2DUP => {
            let a = stack.top(1, position)?.clone();
            let b = stack.top(0, position)?.clone();
            stack.push(a);
            stack.push(b);
            Ok(())
        }
        OP_3DUP => {
            let a = stack.top(2, position)?.clone();
            let b = stack.top(1, position)?.clone();
            let c = stack.top(0, position)?.clone();
            stack.push(a);
            stack.push(b);
            stack.push(c);
            Ok(())
        }
        OP_2OVER => {
            let a = stack.top(3, position)?.clone();
            let b = stack.top(2, position)?.clone();
            stack.push(a);
            stack.push(b);
            Ok(())
        }
        OP_2ROT => {
            let a = stack.remove(5, position)?;
            let b = stack.remove(4, position)?;
            stack.push(a);
            stack.push(b);
            Ok(())
        }
        OP_2SWAP => {
            let a = stack.remove(3, position)?;
            let b = stack.remove(2, position)?;
            stack.push(a);
            stack.push(b);
            Ok(())
        }
        OP_IFDUP => {
            let top = stack.top(0, position)?.clone();
            if is_true(&top) {
                stack.push(top);
            }
            Ok(())
        }
        OP_DEPTH => {
            stack.push(ScriptNum::new(stack.len() as i64).encode());
            Ok(())
        }
        OP_DROP => {
            stack.pop(position)?;
            Ok(())
        }
        OP_DUP => {
            let top = stack.top(0, position)?.clone();
            stack.push(top);
            Ok(())
        }
        OP_NIP => {
            stack.remove(1, position)?;
            Ok(())
        }
        OP_OVER => {
            let v = stack.top(1, position)?.clone();
            stack.push(v);
            Ok(())
        }
        OP_PICK => {
            let n = pop_num(stack, flags, position)?.value();
            if n < 0 {
                return Err(err(ScriptErrorKind::InvalidStackOperation));
            }
            let v = stack.top(n as usize, position)?.clone();
            stack.push(v);
            Ok(())
        }
        OP_ROLL => {
            let n = pop_num(stack, flags, position)?.value();
            if n < 0 {
                return Err(err(ScriptErrorKind::InvalidStackOperation));
            }
            let v = stack.remove(n as usize, position)?;
            stack.push(v);
            Ok(())
        }
        OP_ROT => {
            let v = stack.remove(2, position)?;
            stack.push(v);
            Ok(())
        }
        OP_SWAP => {
            let v = stack.remove(1, position)?;
            stack.push(v);
            Ok(())
        }
        OP_TUCK => {
            let top = stack.top(0, position)?.clone();
            stack.insert(2, top);
            Ok(())
        }

        OP_SIZE => {
            let top = stack.top(0, position)?.clone();
            stack.push(ScriptNum::new(top.len() as i64).encode());
            Ok(())
        }

        OP_EQUAL => {
            let a = stack.pop(position)?;
            let b = stack.pop(position)?;
            stack.push(bool_bytes(a == b));
            Ok(())
        }
        OP_EQUALVERIFY => {
            let a = stack.pop(position)?;
            let b = stack.pop(position)?;
            if a == b {
                Ok(())
            } else {
                Err(err(ScriptErrorKind::EqualVerify))
            }
        }

        OP_1ADD => {
            let n = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(n.value() + 1).encode());
            Ok(())
        }
        OP_1SUB => {
            let n = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(n.value() - 1).encode());
            Ok(())
        }
        OP_NEGATE => {
            let n = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(-n.value()).encode());
            Ok(())
        }
        OP_ABS => {
            let n = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(n.value().abs()).encode());
            Ok(())
        }
        OP_NOT => {
            let n = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(n.value() == 0).encode());
            Ok(())
        }
        OP_0NOTEQUAL => {
            let n = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(n.value() != 0).encode());
            Ok(())
        }
        OP_ADD => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(a.value() + b.value()).encode());
            Ok(())
        }
        OP_SUB => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(a.value() - b.value()).encode());
            Ok(())
        }
        OP_DIV => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            if b.value() == 0 {
                return Err(err(ScriptErrorKind::DivByZero));
            }
            stack.push(ScriptNum::new(a.value() / b.value()).encode());
            Ok(())
        }
        OP_MOD => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            if b.value() == 0 {
                return Err(err(ScriptErrorKind::ModByZero));
            }
            stack.push(ScriptNum::new(a.value() % b.value()).encode());
            Ok(())
        }
        OP_BOOLAND => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() != 0 && b.value() != 0).encode());
            Ok(())
        }
        OP_BOOLOR => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() != 0 || b.value() != 0).encode());
            Ok(())
        }
        OP_NUMEQUAL => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() == b.value()).encode());
            Ok(())
        }
        OP_NUMEQUALVERIFY => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            if a.value() == b.value() {
                Ok(())
            } else {
                Err(err(ScriptErrorKind::Verify))
            }
        }
        OP_NUMNOTEQUAL => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() != b.value()).encode());
            Ok(())
        }
        OP_LESSTHAN => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() < b.value()).encode());
            Ok(())
        }
        OP_GREATERTHAN => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() > b.value()).encode());
            Ok(())
        }
        OP_LESSTHANOREQUAL => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() <= b.value()).encode());
            Ok(())
        }
        OP_GREATERTHANOREQUAL => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(a.value() >= b.value()).encode());
            Ok(())
        }
        OP_MIN => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(a.value().min(b.value())).encode());
            Ok(())
        }
        OP_MAX => {
            let b = pop_num(stack, flags, position)?;
            let a = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::new(a.value().max(b.value())).encode());
            Ok(())
        }
        OP_WITHIN => {
            let max = pop_num(stack, flags, position)?;
            let min = pop_num(stack, flags, position)?;
            let x = pop_num(stack, flags, position)?;
            stack.push(ScriptNum::from(x.value() >= min.value() && x.value() < max.value()).encode());
            Ok(())
        }

        OP_RIPEMD160 => {
            let v = stack.pop(position)?;
            stack.push(ripemd_of(&v));
            Ok(())
        }
        OP_SHA1 => {
            let v = stack.pop(position)?;
            stack.push(sha1_of(&v));
            Ok(())
        }
        OP_SHA256 => {
            let v = stack.pop(position)?;
            stack.push(sha256(&v).to_vec());
            Ok(())
        }
        OP_HASH160 => {
            let v = stack.pop(position)?;
            stack.push(hash160(&v).to_vec());
            Ok(())
        }
        OP_HASH256 => {
            let v = stack.pop(position)?;
            stack.push(hash256(&v).to_vec());
            Ok(())
        }
        OP_CODESEPARATOR => Ok(()),

        OP_CHECKSIG | OP_CHECKSIGVERIFY => {
            let pubkey = stack.pop(position)?;
            let sig = stack.pop(position)?;
            let ok = check_sig(&sig, &pubkey, subscript, flags, checker, position)?;
            if flags.has(ScriptFlags::NULLFAIL) && !ok && !sig.is_empty() {
                return Err(err(ScriptErrorKind::NullFail));
            }
            if op == OP_CHECKSIGVERIFY {
                if ok {
                    Ok(())
                } else {
                    Err(err(ScriptErrorKind::CheckSigVerify))
                }
            } else {
                stack.push(bool_bytes(ok));
                Ok(())
            }
        }

        OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
            let n = pop_num(stack, flags, position)?.value();
            if !(0..=20).contains(&n) {
                return Err(err(ScriptErrorKind::PushSize));
            }
            let mut pubkeys = Vec::with_capacity(n as usize);
            for _ in 0..n {
                pubkeys.push(stack.pop(position)?);
            }
            let m = pop_num(stack, flags, position)?.value();
            if m < 0 || m > n {
                return Err(err(ScriptErrorKind::PushSize));
            }
            let mut sigs = Vec::with_capacity(m as usize);
            for _ in 0..m {
                sigs.push(stack.pop(position)?);
            }
            // Historical off-by-one: one extra item is consumed beyond
            // the M signatures.
            let dummy = stack.pop(position)?;
            if flags.has(ScriptFlags::NULLFAIL) && !dummy.is_empty() {
                return Err(err(ScriptErrorKind::NullDummy));
            }

            // Both `sigs` and `pubkeys` were populated by popping the
            // stack from the top down, so they are already in the same
            // (reversed-from-construction) relative order — matching
            // them in that order directly, without re-reversing either,
            // keeps signature `i` aligned with the pubkey range it was
            // constructed against.
            let mut pubkey_iter = pubkeys.iter();
            let mut matched = 0usize;
            'sig: for sig in sigs.iter() {
                for pk in pubkey_iter.by_ref() {
                    if check_sig(sig, pk, subscript, flags, checker, position)? {
                        matched += 1;
                        continue 'sig;
                    }
                }
                break;
            }
            let ok = matched == sigs.len();

            if flags.has(ScriptFlags::NULLFAIL) && !ok {
                for sig in &sigs {
                    if !sig.is_empty() {
                        return Err(err(ScriptErrorKind::NullFail));
                    }
                }
            }

            if op == OP_CHECKMULTISIGVERIFY {
                if ok {
                    Ok(())
                } else {
                    Err(err(ScriptErrorKind::CheckMultiSigVerify))
                }
            } else {
                stack.push(bool_bytes(ok));
                Ok(())
            }
        }

        _ => {
            match op.class() {
                OpClass::Disabled => Err(err(ScriptErrorKind::DisabledOp)),
                OpClass::Reserved => Err(err(ScriptErrorKind::BadOpcode)),
                _ => Err(err(ScriptErrorKind::BadOpcode)),
            }
        }
    }
}

fn check_sig(
    sig: &[u8],
    pubkey: &[u8],
    subscript: &Script,
    flags: ScriptFlags,
    checker: &dyn SignatureChecker,
    position: usize,
) -> Result<bool, ScriptError> {
    if sig.is_empty() {
        return Ok(false);
    }
    if pubkey.len() > MAX_SCRIPT_ELEMENT_SIZE {
        return Err(ScriptError::new(ScriptErrorKind::PushSize, None, position));
    }
    if flags.has(ScriptFlags::LOW_S) {
        let (_, der) = sig.split_last().unwrap_or((&0, &[]));
        match crate::crypto::DerSignature::from_der(der) {
            Ok(parsed) if parsed.is_low_s() => {}
            _ => return Ok(false),
        }
    }
    let ok = checker.check_sig(sig, pubkey, subscript);
    if flags.has(ScriptFlags::FORKID) {
        let sighash_byte = *sig.last().unwrap_or(&0);
        if ok && sighash_byte & super::super::sighash::SIGHASH_FORKID == 0 {
            return Err(ScriptError::new(ScriptErrorKind::Unknown, None, position));
        }
    }
    Ok(ok)
}

fn ripemd_of(data: &[u8]) -> Vec<u8> {
    use ripemd::{Digest, Ripemd160};
    Ripemd160::digest(data).to_vec()
}

fn sha1_of(data: &[u8]) -> Vec<u8> {
    use sha1::{Digest, Sha1};
    Sha1::digest(data).to_vec()
}
