//! Bare pay-to-public-key: `<pubkey> CHECKSIG` / `<sig>`.

use crate::script::chunk::{Chunk, Script};
use crate::script::opcode::Opcode;

use super::{LockBuilder, NotAStandardTemplate, UnlockBuilder, UnlockContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P2pkLockBuilder {
    pub public_key: Vec<u8>,
}

impl P2pkLockBuilder {
    pub fn new(public_key: Vec<u8>) -> Self {
        P2pkLockBuilder { public_key }
    }

    pub fn parse(script: &Script) -> Result<Self, NotAStandardTemplate> {
        let chunks = script.chunks();
        if chunks.len() != 2 {
            return Err(NotAStandardTemplate("P2PK"));
        }
        let (Chunk::Push { data, .. }, Chunk::Op(Opcode::OP_CHECKSIG)) = (&chunks[0], &chunks[1]) else {
            return Err(NotAStandardTemplate("P2PK"));
        };
        Ok(P2pkLockBuilder { public_key: data.clone() })
    }
}

impl LockBuilder for P2pkLockBuilder {
    fn build_lock(&self) -> Script {
        let mut script = Script::new();
        script.push_data(self.public_key.clone());
        script.push_op(Opcode::OP_CHECKSIG);
        script
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct P2pkUnlockBuilder;

impl P2pkUnlockBuilder {
    pub fn new() -> Self {
        P2pkUnlockBuilder
    }

    pub fn parse(script: &Script) -> Result<Vec<u8>, NotAStandardTemplate> {
        let chunks = script.chunks();
        if chunks.len() != 1 {
            return Err(NotAStandardTemplate("P2PK"));
        }
        let Chunk::Push { data, .. } = &chunks[0] else {
            return Err(NotAStandardTemplate("P2PK"));
        };
        Ok(data.clone())
    }
}

impl UnlockBuilder for P2pkUnlockBuilder {
    fn build_unlock(&self, context: &UnlockContext) -> Script {
        let mut script = Script::new();
        script.push_data(context.signatures[0].clone());
        script
    }

    fn estimate_size(&self) -> usize {
        74
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_round_trips_through_parse() {
        let builder = P2pkLockBuilder::new(vec![0x02; 33]);
        let script = builder.build_lock();
        assert_eq!(P2pkLockBuilder::parse(&script).unwrap(), builder);
    }

    #[test]
    fn unlock_builds_bare_signature() {
        let builder = P2pkUnlockBuilder::new();
        let context = UnlockContext { signatures: vec![vec![0x30, 0x01]] };
        let script = builder.build_unlock(&context);
        assert_eq!(P2pkUnlockBuilder::parse(&script).unwrap(), vec![0x30, 0x01]);
    }
}
