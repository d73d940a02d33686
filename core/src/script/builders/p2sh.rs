//! Pay-to-script-hash: `HASH160 <h160> EQUAL` / `<args...> <redeemScript>`.

use crate::codec::hash160;
use crate::script::chunk::{Chunk, Script};
use crate::script::opcode::Opcode;

use super::{LockBuilder, NotAStandardTemplate, UnlockBuilder, UnlockContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P2shLockBuilder {
    pub hash160: [u8; 20],
}

impl P2shLockBuilder {
    pub fn new(hash160: [u8; 20]) -> Self {
        P2shLockBuilder { hash160 }
    }

    pub fn from_redeem_script(redeem_script: &Script) -> Self {
        P2shLockBuilder { hash160: hash160(&redeem_script.to_bytes()) }
    }

    pub fn parse(script: &Script) -> Result<Self, NotAStandardTemplate> {
        let chunks = script.chunks();
        if chunks.len() != 3 {
            return Err(NotAStandardTemplate("P2SH"));
        }
        let (Chunk::Op(Opcode::OP_HASH160), Chunk::Push { data, .. }, Chunk::Op(Opcode::OP_EQUAL)) = (&chunks[0], &chunks[1], &chunks[2]) else {
            return Err(NotAStandardTemplate("P2SH"));
        };
        if data.len() != 20 {
            return Err(NotAStandardTemplate("P2SH"));
        }
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(data);
        Ok(P2shLockBuilder { hash160 })
    }
}

impl LockBuilder for P2shLockBuilder {
    fn build_lock(&self) -> Script {
        let mut script = Script::new();
        script.push_op(Opcode::OP_HASH160);
        script.push_data(self.hash160.to_vec());
        script.push_op(Opcode::OP_EQUAL);
        script
    }
}

/// Wraps an inner unlock builder (typically a `P2msUnlockBuilder`) and
/// appends the serialized redeem script after its output, per the
/// standard `<args...> <redeemScript>` template.
#[derive(Clone)]
pub struct P2shUnlockBuilder {
    pub redeem_script: Script,
    pub inner: std::sync::Arc<dyn UnlockBuilder + Send + Sync>,
}

impl P2shUnlockBuilder {
    pub fn new(redeem_script: Script, inner: std::sync::Arc<dyn UnlockBuilder + Send + Sync>) -> Self {
        P2shUnlockBuilder { redeem_script, inner }
    }

    /// Recovers the pushed arguments and redeem script bytes from an
    /// unlocking script matching `<args...> <redeemScript>`. Does not
    /// itself interpret `args` — the caller parses them against the
    /// recovered redeem script's own template.
    pub fn parse(script: &Script) -> Result<(Vec<Vec<u8>>, Script), NotAStandardTemplate> {
        let chunks = script.chunks();
        if chunks.is_empty() {
            return Err(NotAStandardTemplate("P2SH"));
        }
        let Chunk::Push { data: redeem_bytes, .. } = chunks.last().unwrap() else {
            return Err(NotAStandardTemplate("P2SH"));
        };
        let redeem_script = Script::parse(redeem_bytes).map_err(|_| NotAStandardTemplate("P2SH"))?;
        let mut args = Vec::new();
        for chunk in &chunks[..chunks.len() - 1] {
            match chunk {
                Chunk::Push { data, .. } => args.push(data.clone()),
                Chunk::Op(_) => return Err(NotAStandardTemplate("P2SH")),
            }
        }
        Ok((args, redeem_script))
    }
}

impl UnlockBuilder for P2shUnlockBuilder {
    fn build_unlock(&self, context: &UnlockContext) -> Script {
        let mut script = self.inner.build_unlock(context);
        script.push_data(self.redeem_script.to_bytes());
        script
    }

    fn estimate_size(&self) -> usize {
        self.inner.estimate_size() + 3 + self.redeem_script.to_bytes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::builders::{P2msLockBuilder, P2msUnlockBuilder};

    #[test]
    fn lock_round_trips_through_parse() {
        let builder = P2shLockBuilder::new([0xcc; 20]);
        let script = builder.build_lock();
        assert_eq!(P2shLockBuilder::parse(&script).unwrap(), builder);
    }

    #[test]
    fn from_redeem_script_hashes_the_exact_bytes() {
        let redeem = P2msLockBuilder::new(2, vec![vec![0x02; 33], vec![0x03; 33], vec![0x04; 33]]).unwrap().build_lock();
        let a = P2shLockBuilder::from_redeem_script(&redeem);
        let b = P2shLockBuilder::new(hash160(&redeem.to_bytes()));
        assert_eq!(a, b);
    }

    #[test]
    fn unlock_appends_redeem_script_after_inner_args() {
        let redeem = P2msLockBuilder::new(1, vec![vec![0x02; 33]]).unwrap().build_lock();
        let inner = std::sync::Arc::new(P2msUnlockBuilder::new(1));
        let builder = P2shUnlockBuilder::new(redeem.clone(), inner);
        let context = UnlockContext { signatures: vec![vec![0x30, 0x01]] };
        let script = builder.build_unlock(&context);
        let (args, parsed_redeem) = P2shUnlockBuilder::parse(&script).unwrap();
        assert_eq!(parsed_redeem, redeem);
        // leading OP_0 dummy plus one signature
        assert_eq!(args.len(), 2);
    }
}
