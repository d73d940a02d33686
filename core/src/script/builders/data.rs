//! Unspendable data carrier: `OP_FALSE OP_RETURN <data1> <data2> …`.
//! There is no corresponding `UnlockBuilder` — the template is
//! deliberately unspendable.

use crate::script::chunk::{Chunk, Script};
use crate::script::opcode::Opcode;

use super::{LockBuilder, NotAStandardTemplate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLockBuilder {
    pub items: Vec<Vec<u8>>,
}

impl DataLockBuilder {
    pub fn new(items: Vec<Vec<u8>>) -> Self {
        DataLockBuilder { items }
    }

    pub fn parse(script: &Script) -> Result<Self, NotAStandardTemplate> {
        let chunks = script.chunks();
        let is_op_0 = matches!(&chunks.first(), Some(Chunk::Push { data, .. }) if data.is_empty());
        if chunks.len() < 2 || !is_op_0 || !matches!(chunks[1], Chunk::Op(Opcode::OP_RETURN)) {
            return Err(NotAStandardTemplate("Data"));
        }
        let mut items = Vec::with_capacity(chunks.len() - 2);
        for chunk in &chunks[2..] {
            let Chunk::Push { data, .. } = chunk else {
                return Err(NotAStandardTemplate("Data"));
            };
            items.push(data.clone());
        }
        Ok(DataLockBuilder { items })
    }
}

impl LockBuilder for DataLockBuilder {
    fn build_lock(&self) -> Script {
        let mut script = Script::new();
        script.push_op(Opcode::OP_0);
        script.push_op(Opcode::OP_RETURN);
        for item in &self.items {
            script.push_data(item.clone());
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_parse() {
        let builder = DataLockBuilder::new(vec![b"hello".to_vec(), b"world".to_vec()]);
        let script = builder.build_lock();
        assert_eq!(DataLockBuilder::parse(&script).unwrap(), builder);
    }

    #[test]
    fn rejects_script_without_op_return() {
        let mut script = Script::new();
        script.push_op(Opcode::OP_0);
        script.push_data(b"nope".to_vec());
        assert!(DataLockBuilder::parse(&script).is_err());
    }
}
