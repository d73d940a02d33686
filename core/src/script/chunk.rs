//! Script value model: a `Script` is a sequence of
//! `Chunk`s, each either a bare opcode byte or a pushdata element in
//! whichever of the four push encodings (direct length byte,
//! `OP_PUSHDATA1/2/4`) produced it. Parsing preserves the exact encoded
//! form rather than normalizing pushes, since SIGHASH and `OP_CODESEPARATOR`
//! subscript extraction operate on raw bytes.

use thiserror::Error;

use super::opcode::Opcode;

/// Errors raised while parsing a byte string as a `Script`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptParseError {
    #[error("pushdata length prefix at offset {offset} claims {claimed} bytes but only {available} remain")]
    TruncatedPush { offset: usize, claimed: usize, available: usize },
    #[error("pushdata length prefix itself is truncated at offset {0}")]
    TruncatedLengthPrefix(usize),
}

/// One element of a parsed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A non-push opcode byte.
    Op(Opcode),
    /// Pushed data, together with the push encoding that produced it.
    /// `encoding` lets `Script::to_bytes` reproduce the exact original
    /// byte string rather than a canonically-minimal re-encoding.
    Push { data: Vec<u8>, encoding: PushEncoding },
}

/// Which of the four push forms encoded a `Chunk::Push`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEncoding {
    /// `OP_0`.
    Zero,
    /// A direct length byte in 1..=75, pushing that many following bytes.
    Direct,
    /// `OP_1NEGATE`..`OP_16`, pushing a small integer with no length byte.
    SmallInt,
    /// `OP_PUSHDATA1` (1-byte length), `OP_PUSHDATA2` (2-byte LE length),
    /// or `OP_PUSHDATA4` (4-byte LE length).
    PushData1,
    PushData2,
    PushData4,
}

/// A parsed Bitcoin script: an ordered sequence of chunks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script(pub Vec<Chunk>);

impl Script {
    pub fn new() -> Self {
        Script(Vec::new())
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.0
    }

    /// Appends a non-push opcode. `OP_0` (byte value 0) is itself a push
    /// of the empty string, not a bare opcode — passing it here routes
    /// to the same `Chunk::Push` representation `Script::parse` would
    /// produce for that byte, so a builder-constructed script and one
    /// parsed from the equivalent bytes agree.
    pub fn push_op(&mut self, op: Opcode) {
        if op == Opcode::OP_0 {
            self.0.push(Chunk::Push { data: Vec::new(), encoding: PushEncoding::Zero });
        } else {
            self.0.push(Chunk::Op(op));
        }
    }

    /// Appends pushdata, choosing the shortest encoding that fits (direct
    /// length byte under 76 bytes, else the smallest `OP_PUSHDATA*` form).
    /// Builders that need bit-for-bit control over which encoding is used
    /// construct the `Chunk` directly instead.
    pub fn push_data(&mut self, data: Vec<u8>) {
        let encoding = if data.is_empty() {
            PushEncoding::Zero
        } else if data.len() == 1 && data[0] >= 1 && data[0] <= 16 {
            // Leave single-byte small values alone; callers wanting
            // OP_1..OP_16 canonicalization use push_small_int explicitly.
            PushEncoding::Direct
        } else if data.len() <= 75 {
            PushEncoding::Direct
        } else if data.len() <= 0xff {
            PushEncoding::PushData1
        } else if data.len() <= 0xffff {
            PushEncoding::PushData2
        } else {
            PushEncoding::PushData4
        };
        self.0.push(Chunk::Push { data, encoding });
    }

    /// Appends `OP_0`, `OP_1NEGATE`, or `OP_1`..`OP_16` for the given
    /// small value.
    pub fn push_small_int(&mut self, value: i64) {
        debug_assert!((-1..=16).contains(&value));
        if value == 0 {
            self.push_op(Opcode::OP_0);
            return;
        }
        let op = if value == -1 { Opcode::OP_1NEGATE } else { Opcode::from_u8(Opcode::OP_1.to_u8() + (value - 1) as u8) };
        self.0.push(Chunk::Op(op));
    }

    /// Serializes back to the exact bytes the encoding of each chunk
    /// specifies.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in &self.0 {
            match chunk {
                Chunk::Op(op) => out.push(op.to_u8()),
                Chunk::Push { data, encoding } => match encoding {
                    PushEncoding::Zero => out.push(Opcode::OP_0.to_u8()),
                    PushEncoding::SmallInt => out.push(data[0]),
                    PushEncoding::Direct => {
                        out.push(data.len() as u8);
                        out.extend_from_slice(data);
                    }
                    PushEncoding::PushData1 => {
                        out.push(Opcode::OP_PUSHDATA1.to_u8());
                        out.push(data.len() as u8);
                        out.extend_from_slice(data);
                    }
                    PushEncoding::PushData2 => {
                        out.push(Opcode::OP_PUSHDATA2.to_u8());
                        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
                        out.extend_from_slice(data);
                    }
                    PushEncoding::PushData4 => {
                        out.push(Opcode::OP_PUSHDATA4.to_u8());
                        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                        out.extend_from_slice(data);
                    }
                },
            }
        }
        out
    }

    /// Parses a raw script byte string into chunks. Fails only on
    /// truncated pushdata (a length prefix, or the claimed push bytes,
    /// running past the end of input) — unknown/reserved opcodes parse
    /// fine as bare `Chunk::Op`s, since rejecting those is the
    /// interpreter's job, not the parser's.
    pub fn parse(bytes: &[u8]) -> Result<Self, ScriptParseError> {
        let mut chunks = Vec::new();
        let mut i = 0usize;
        while i < bytes.len() {
            let byte = bytes[i];
            if byte == 0 {
                chunks.push(Chunk::Push { data: Vec::new(), encoding: PushEncoding::Zero });
                i += 1;
            } else if (1..=75).contains(&byte) {
                let len = byte as usize;
                let start = i + 1;
                let end = start.checked_add(len).ok_or(ScriptParseError::TruncatedPush { offset: i, claimed: len, available: bytes.len() - start })?;
                if end > bytes.len() {
                    return Err(ScriptParseError::TruncatedPush { offset: i, claimed: len, available: bytes.len() - start });
                }
                chunks.push(Chunk::Push { data: bytes[start..end].to_vec(), encoding: PushEncoding::Direct });
                i = end;
            } else if byte == Opcode::OP_PUSHDATA1.to_u8() {
                let len_offset = i + 1;
                if len_offset >= bytes.len() {
                    return Err(ScriptParseError::TruncatedLengthPrefix(i));
                }
                let len = bytes[len_offset] as usize;
                let start = len_offset + 1;
                let end = start + len;
                if end > bytes.len() {
                    return Err(ScriptParseError::TruncatedPush { offset: i, claimed: len, available: bytes.len().saturating_sub(start) });
                }
                chunks.push(Chunk::Push { data: bytes[start..end].to_vec(), encoding: PushEncoding::PushData1 });
                i = end;
            } else if byte == Opcode::OP_PUSHDATA2.to_u8() {
                let len_offset = i + 1;
                if len_offset + 2 > bytes.len() {
                    return Err(ScriptParseError::TruncatedLengthPrefix(i));
                }
                let len = u16::from_le_bytes([bytes[len_offset], bytes[len_offset + 1]]) as usize;
                let start = len_offset + 2;
                let end = start + len;
                if end > bytes.len() {
                    return Err(ScriptParseError::TruncatedPush { offset: i, claimed: len, available: bytes.len().saturating_sub(start) });
                }
                chunks.push(Chunk::Push { data: bytes[start..end].to_vec(), encoding: PushEncoding::PushData2 });
                i = end;
            } else if byte == Opcode::OP_PUSHDATA4.to_u8() {
                let len_offset = i + 1;
                if len_offset + 4 > bytes.len() {
                    return Err(ScriptParseError::TruncatedLengthPrefix(i));
                }
                let len = u32::from_le_bytes([bytes[len_offset], bytes[len_offset + 1], bytes[len_offset + 2], bytes[len_offset + 3]]) as usize;
                let start = len_offset + 4;
                let end = start + len;
                if end > bytes.len() {
                    return Err(ScriptParseError::TruncatedPush { offset: i, claimed: len, available: bytes.len().saturating_sub(start) });
                }
                chunks.push(Chunk::Push { data: bytes[start..end].to_vec(), encoding: PushEncoding::PushData4 });
                i = end;
            } else {
                chunks.push(Chunk::Op(Opcode::from_u8(byte)));
                i += 1;
            }
        }
        Ok(Script(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_script_through_bytes() {
        let mut script = Script::new();
        script.push_data(vec![1, 2, 3]);
        script.push_op(Opcode::OP_DUP);
        script.push_op(Opcode::OP_HASH160);
        script.push_data(vec![0xaa; 20]);
        script.push_op(Opcode::OP_EQUALVERIFY);
        script.push_op(Opcode::OP_CHECKSIG);

        let bytes = script.to_bytes();
        let parsed = Script::parse(&bytes).unwrap();
        assert_eq!(parsed, script);
    }

    #[test]
    fn parses_pushdata1_2_4_forms() {
        let data1 = vec![0x11u8; 100];
        let data2 = vec![0x22u8; 70_000 / 1000 * 1000 + 500];
        let mut bytes = Vec::new();
        bytes.push(Opcode::OP_PUSHDATA1.to_u8());
        bytes.push(data1.len() as u8);
        bytes.extend_from_slice(&data1);
        bytes.push(Opcode::OP_PUSHDATA2.to_u8());
        bytes.extend_from_slice(&(data2.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&data2);

        let parsed = Script::parse(&bytes).unwrap();
        assert_eq!(parsed.chunks().len(), 2);
        assert_eq!(parsed.chunks()[0], Chunk::Push { data: data1, encoding: PushEncoding::PushData1 });
        assert_eq!(parsed.chunks()[1], Chunk::Push { data: data2, encoding: PushEncoding::PushData2 });
    }

    #[test]
    fn rejects_truncated_direct_push() {
        let bytes = [0x05u8, 0x01, 0x02];
        assert_eq!(
            Script::parse(&bytes),
            Err(ScriptParseError::TruncatedPush { offset: 0, claimed: 5, available: 2 })
        );
    }

    #[test]
    fn rejects_truncated_pushdata1_length_prefix() {
        let bytes = [Opcode::OP_PUSHDATA1.to_u8()];
        assert_eq!(Script::parse(&bytes), Err(ScriptParseError::TruncatedLengthPrefix(0)));
    }

    #[test]
    fn unknown_opcode_parses_as_bare_op() {
        let bytes = [0xbau8];
        let parsed = Script::parse(&bytes).unwrap();
        assert_eq!(parsed.chunks(), &[Chunk::Op(Opcode::OP_UNKNOWN186)]);
    }
}
