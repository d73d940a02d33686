//! Bare multisig: `<m> <pk1>..<pkN> <N> CHECKMULTISIG` / `OP_0
//! <sig1>..<sigM>` — the leading `OP_0` compensates for `OP_CHECKMULTISIG`'s
//! historical off-by-one stack consumption.

use thiserror::Error;

use crate::script::chunk::{Chunk, Script};
use crate::script::num::ScriptNum;
use crate::script::opcode::Opcode;

use super::{LockBuilder, NotAStandardTemplate, UnlockBuilder, UnlockContext};

/// Errors raised constructing a multisig template with invalid m-of-n
/// parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum P2msError {
    #[error("m ({m}) must be between 1 and the number of public keys ({n})")]
    InvalidThreshold { m: usize, n: usize },
    #[error("too many public keys ({0}); OP_CHECKMULTISIG supports at most 20")]
    TooManyKeys(usize),
}

fn push_small_number(script: &mut Script, n: i64) {
    if (1..=16).contains(&n) {
        script.push_small_int(n);
    } else {
        script.push_data(ScriptNum::new(n).encode());
    }
}

fn read_small_number(chunk: &Chunk) -> Option<i64> {
    match chunk {
        Chunk::Op(op) => op.as_small_int(),
        Chunk::Push { data, .. } => ScriptNum::decode(data, 4, false).ok().map(|n| n.value()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P2msLockBuilder {
    pub m: usize,
    pub public_keys: Vec<Vec<u8>>,
}

impl P2msLockBuilder {
    pub fn new(m: usize, public_keys: Vec<Vec<u8>>) -> Result<Self, P2msError> {
        if public_keys.len() > 20 {
            return Err(P2msError::TooManyKeys(public_keys.len()));
        }
        if m == 0 || m > public_keys.len() {
            return Err(P2msError::InvalidThreshold { m, n: public_keys.len() });
        }
        Ok(P2msLockBuilder { m, public_keys })
    }

    pub fn parse(script: &Script) -> Result<Self, NotAStandardTemplate> {
        let chunks = script.chunks();
        if chunks.len() < 3 {
            return Err(NotAStandardTemplate("P2MS"));
        }
        let m = read_small_number(&chunks[0]).ok_or(NotAStandardTemplate("P2MS"))?;
        let n = read_small_number(&chunks[chunks.len() - 2]).ok_or(NotAStandardTemplate("P2MS"))?;
        if !matches!(chunks.last(), Some(Chunk::Op(Opcode::OP_CHECKMULTISIG))) {
            return Err(NotAStandardTemplate("P2MS"));
        }
        let key_chunks = &chunks[1..chunks.len() - 2];
        if key_chunks.len() as i64 != n {
            return Err(NotAStandardTemplate("P2MS"));
        }
        let mut public_keys = Vec::with_capacity(key_chunks.len());
        for chunk in key_chunks {
            let Chunk::Push { data, .. } = chunk else {
                return Err(NotAStandardTemplate("P2MS"));
            };
            public_keys.push(data.clone());
        }
        if m < 1 || m > public_keys.len() as i64 {
            return Err(NotAStandardTemplate("P2MS"));
        }
        Ok(P2msLockBuilder { m: m as usize, public_keys })
    }
}

impl LockBuilder for P2msLockBuilder {
    fn build_lock(&self) -> Script {
        let mut script = Script::new();
        push_small_number(&mut script, self.m as i64);
        for pk in &self.public_keys {
            script.push_data(pk.clone());
        }
        push_small_number(&mut script, self.public_keys.len() as i64);
        script.push_op(Opcode::OP_CHECKMULTISIG);
        script
    }
}

/// Collects signatures for an m-of-n spend. `expected_m` is the
/// threshold this template requires; `build_unlock` takes however many
/// signatures `context` supplies (the caller is responsible for
/// producing exactly `expected_m` signatures, in the same relative order
/// as their corresponding public keys, before signing is considered
/// complete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P2msUnlockBuilder {
    pub expected_m: usize,
}

impl P2msUnlockBuilder {
    pub fn new(expected_m: usize) -> Self {
        P2msUnlockBuilder { expected_m }
    }

    pub fn parse(script: &Script) -> Result<Vec<Vec<u8>>, NotAStandardTemplate> {
        let chunks = script.chunks();
        if chunks.is_empty() || !matches!(chunks[0], Chunk::Op(Opcode::OP_0)) {
            return Err(NotAStandardTemplate("P2MS"));
        }
        let mut sigs = Vec::with_capacity(chunks.len() - 1);
        for chunk in &chunks[1..] {
            let Chunk::Push { data, .. } = chunk else {
                return Err(NotAStandardTemplate("P2MS"));
            };
            sigs.push(data.clone());
        }
        Ok(sigs)
    }
}

impl UnlockBuilder for P2msUnlockBuilder {
    fn build_unlock(&self, context: &UnlockContext) -> Script {
        let mut script = Script::new();
        script.push_op(Opcode::OP_0);
        for sig in &context.signatures {
            script.push_data(sig.clone());
        }
        script
    }

    fn estimate_size(&self) -> usize {
        1 + self.expected_m * 74
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_round_trips_through_parse() {
        let builder = P2msLockBuilder::new(2, vec![vec![0x02; 33], vec![0x03; 33], vec![0x04; 33]]).unwrap();
        let script = builder.build_lock();
        assert_eq!(P2msLockBuilder::parse(&script).unwrap(), builder);
    }

    #[test]
    fn rejects_threshold_above_key_count() {
        assert_eq!(
            P2msLockBuilder::new(4, vec![vec![0x02; 33], vec![0x03; 33]]),
            Err(P2msError::InvalidThreshold { m: 4, n: 2 })
        );
    }

    #[test]
    fn unlock_leads_with_op_0_dummy() {
        let builder = P2msUnlockBuilder::new(2);
        let context = UnlockContext { signatures: vec![vec![0x30, 0x01], vec![0x30, 0x02]] };
        let script = builder.build_unlock(&context);
        let sigs = P2msUnlockBuilder::parse(&script).unwrap();
        assert_eq!(sigs, vec![vec![0x30, 0x01], vec![0x30, 0x02]]);
    }
}
