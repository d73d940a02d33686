//! The Script opcode table: a symbolic name ↔ numeric value bijection
//! plus a classification used by the interpreter to decide activation
//! (`DISABLED`) and dispatch.

/// An opcode's behavioral family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpClass {
    Push,
    Control,
    Stack,
    AltStack,
    Splice,
    Bitwise,
    Arithmetic,
    Crypto,
    Reserved,
    Disabled,
}

macro_rules! opcode_table {
    ($($name:ident = $value:expr, $class:ident;)*) => {
        /// A Script opcode byte, named per Bitcoin's historical opcode
        /// mnemonics.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $value,)*
        }

        impl Opcode {
            /// Maps a raw byte to its symbolic opcode. Every byte value
            /// 0..=255 is covered — unassigned ranges map to `OP_UNKNOWN*`
            /// reserved placeholders.
            pub fn from_u8(byte: u8) -> Opcode {
                match byte {
                    $($value => Opcode::$name,)*
                }
            }

            /// The raw opcode byte.
            pub fn to_u8(self) -> u8 {
                self as u8
            }

            /// This opcode's behavioral classification.
            pub fn class(self) -> OpClass {
                match self {
                    $(Opcode::$name => OpClass::$class,)*
                }
            }

            /// Whether this opcode is rejected outright before execution
            /// under the pre-Genesis BSV rule set this library targets.
            pub fn is_disabled(self) -> bool {
                self.class() == OpClass::Disabled
            }
        }
    };
}

opcode_table! {
    OP_0 = 0x00, Push;
    OP_PUSHDATA1 = 0x4c, Push;
    OP_PUSHDATA2 = 0x4d, Push;
    OP_PUSHDATA4 = 0x4e, Push;
    OP_1NEGATE = 0x4f, Push;
    OP_RESERVED = 0x50, Reserved;
    OP_1 = 0x51, Push;
    OP_2 = 0x52, Push;
    OP_3 = 0x53, Push;
    OP_4 = 0x54, Push;
    OP_5 = 0x55, Push;
    OP_6 = 0x56, Push;
    OP_7 = 0x57, Push;
    OP_8 = 0x58, Push;
    OP_9 = 0x59, Push;
    OP_10 = 0x5a, Push;
    OP_11 = 0x5b, Push;
    OP_12 = 0x5c, Push;
    OP_13 = 0x5d, Push;
    OP_14 = 0x5e, Push;
    OP_15 = 0x5f, Push;
    OP_16 = 0x60, Push;

    OP_NOP = 0x61, Control;
    OP_VER = 0x62, Reserved;
    OP_IF = 0x63, Control;
    OP_NOTIF = 0x64, Control;
    OP_VERIF = 0x65, Reserved;
    OP_VERNOTIF = 0x66, Reserved;
    OP_ELSE = 0x67, Control;
    OP_ENDIF = 0x68, Control;
    OP_VERIFY = 0x69, Control;
    OP_RETURN = 0x6a, Control;

    OP_TOALTSTACK = 0x6b, AltStack;
    OP_FROMALTSTACK = 0x6c, AltStack;
    OP_2DROP = 0x6d, Stack;
    OP_2DUP = 0x6e, Stack;
    OP_3DUP = 0x6f, Stack;
    OP_2OVER = 0x70, Stack;
    OP_2ROT = 0x71, Stack;
    OP_2SWAP = 0x72, Stack;
    OP_IFDUP = 0x73, Stack;
    OP_DEPTH = 0x74, Stack;
    OP_DROP = 0x75, Stack;
    OP_DUP = 0x76, Stack;
    OP_NIP = 0x77, Stack;
    OP_OVER = 0x78, Stack;
    OP_PICK = 0x79, Stack;
    OP_ROLL = 0x7a, Stack;
    OP_ROT = 0x7b, Stack;
    OP_SWAP = 0x7c, Stack;
    OP_TUCK = 0x7d, Stack;

    OP_CAT = 0x7e, Disabled;
    OP_SUBSTR = 0x7f, Disabled;
    OP_LEFT = 0x80, Disabled;
    OP_RIGHT = 0x81, Disabled;
    OP_SIZE = 0x82, Splice;
    OP_INVERT = 0x83, Disabled;
    OP_AND = 0x84, Disabled;
    OP_OR = 0x85, Disabled;
    OP_XOR = 0x86, Disabled;
    OP_EQUAL = 0x87, Bitwise;
    OP_EQUALVERIFY = 0x88, Bitwise;
    OP_RESERVED1 = 0x89, Reserved;
    OP_RESERVED2 = 0x8a, Reserved;

    OP_1ADD = 0x8b, Arithmetic;
    OP_1SUB = 0x8c, Arithmetic;
    OP_2MUL = 0x8d, Disabled;
    OP_2DIV = 0x8e, Disabled;
    OP_NEGATE = 0x8f, Arithmetic;
    OP_ABS = 0x90, Arithmetic;
    OP_NOT = 0x91, Arithmetic;
    OP_0NOTEQUAL = 0x92, Arithmetic;
    OP_ADD = 0x93, Arithmetic;
    OP_SUB = 0x94, Arithmetic;
    OP_MUL = 0x95, Disabled;
    OP_DIV = 0x96, Arithmetic;
    OP_MOD = 0x97, Arithmetic;
    OP_LSHIFT = 0x98, Disabled;
    OP_RSHIFT = 0x99, Disabled;

    OP_BOOLAND = 0x9a, Arithmetic;
    OP_BOOLOR = 0x9b, Arithmetic;
    OP_NUMEQUAL = 0x9c, Arithmetic;
    OP_NUMEQUALVERIFY = 0x9d, Arithmetic;
    OP_NUMNOTEQUAL = 0x9e, Arithmetic;
    OP_LESSTHAN = 0x9f, Arithmetic;
    OP_GREATERTHAN = 0xa0, Arithmetic;
    OP_LESSTHANOREQUAL = 0xa1, Arithmetic;
    OP_GREATERTHANOREQUAL = 0xa2, Arithmetic;
    OP_MIN = 0xa3, Arithmetic;
    OP_MAX = 0xa4, Arithmetic;
    OP_WITHIN = 0xa5, Arithmetic;

    OP_RIPEMD160 = 0xa6, Crypto;
    OP_SHA1 = 0xa7, Crypto;
    OP_SHA256 = 0xa8, Crypto;
    OP_HASH160 = 0xa9, Crypto;
    OP_HASH256 = 0xaa, Crypto;
    OP_CODESEPARATOR = 0xab, Control;
    OP_CHECKSIG = 0xac, Crypto;
    OP_CHECKSIGVERIFY = 0xad, Crypto;
    OP_CHECKMULTISIG = 0xae, Crypto;
    OP_CHECKMULTISIGVERIFY = 0xaf, Crypto;

    OP_NOP1 = 0xb0, Control;
    OP_CHECKLOCKTIMEVERIFY = 0xb1, Control;
    OP_CHECKSEQUENCEVERIFY = 0xb2, Control;
    OP_NOP4 = 0xb3, Control;
    OP_NOP5 = 0xb4, Control;
    OP_NOP6 = 0xb5, Control;
    OP_NOP7 = 0xb6, Control;
    OP_NOP8 = 0xb7, Control;
    OP_NOP9 = 0xb8, Control;
    OP_NOP10 = 0xb9, Control;

    OP_UNKNOWN186 = 0xba, Reserved;
    OP_UNKNOWN187 = 0xbb, Reserved;
    OP_UNKNOWN188 = 0xbc, Reserved;
    OP_UNKNOWN189 = 0xbd, Reserved;
    OP_UNKNOWN190 = 0xbe, Reserved;
    OP_UNKNOWN191 = 0xbf, Reserved;
    OP_UNKNOWN192 = 0xc0, Reserved;
    OP_UNKNOWN193 = 0xc1, Reserved;
    OP_UNKNOWN194 = 0xc2, Reserved;
    OP_UNKNOWN195 = 0xc3, Reserved;
    OP_UNKNOWN196 = 0xc4, Reserved;
    OP_UNKNOWN197 = 0xc5, Reserved;
    OP_UNKNOWN198 = 0xc6, Reserved;
    OP_UNKNOWN199 = 0xc7, Reserved;
    OP_UNKNOWN200 = 0xc8, Reserved;
    OP_UNKNOWN201 = 0xc9, Reserved;
    OP_UNKNOWN202 = 0xca, Reserved;
    OP_UNKNOWN203 = 0xcb, Reserved;
    OP_UNKNOWN204 = 0xcc, Reserved;
    OP_UNKNOWN205 = 0xcd, Reserved;
    OP_UNKNOWN206 = 0xce, Reserved;
    OP_UNKNOWN207 = 0xcf, Reserved;
    OP_UNKNOWN208 = 0xd0, Reserved;
    OP_UNKNOWN209 = 0xd1, Reserved;
    OP_UNKNOWN210 = 0xd2, Reserved;
    OP_UNKNOWN211 = 0xd3, Reserved;
    OP_UNKNOWN212 = 0xd4, Reserved;
    OP_UNKNOWN213 = 0xd5, Reserved;
    OP_UNKNOWN214 = 0xd6, Reserved;
    OP_UNKNOWN215 = 0xd7, Reserved;
    OP_UNKNOWN216 = 0xd8, Reserved;
    OP_UNKNOWN217 = 0xd9, Reserved;
    OP_UNKNOWN218 = 0xda, Reserved;
    OP_UNKNOWN219 = 0xdb, Reserved;
    OP_UNKNOWN220 = 0xdc, Reserved;
    OP_UNKNOWN221 = 0xdd, Reserved;
    OP_UNKNOWN222 = 0xde, Reserved;
    OP_UNKNOWN223 = 0xdf, Reserved;
    OP_UNKNOWN224 = 0xe0, Reserved;
    OP_UNKNOWN225 = 0xe1, Reserved;
    OP_UNKNOWN226 = 0xe2, Reserved;
    OP_UNKNOWN227 = 0xe3, Reserved;
    OP_UNKNOWN228 = 0xe4, Reserved;
    OP_UNKNOWN229 = 0xe5, Reserved;
    OP_UNKNOWN230 = 0xe6, Reserved;
    OP_UNKNOWN231 = 0xe7, Reserved;
    OP_UNKNOWN232 = 0xe8, Reserved;
    OP_UNKNOWN233 = 0xe9, Reserved;
    OP_UNKNOWN234 = 0xea, Reserved;
    OP_UNKNOWN235 = 0xeb, Reserved;
    OP_UNKNOWN236 = 0xec, Reserved;
    OP_UNKNOWN237 = 0xed, Reserved;
    OP_UNKNOWN238 = 0xee, Reserved;
    OP_UNKNOWN239 = 0xef, Reserved;
    OP_UNKNOWN240 = 0xf0, Reserved;
    OP_UNKNOWN241 = 0xf1, Reserved;
    OP_UNKNOWN242 = 0xf2, Reserved;
    OP_UNKNOWN243 = 0xf3, Reserved;
    OP_UNKNOWN244 = 0xf4, Reserved;
    OP_UNKNOWN245 = 0xf5, Reserved;
    OP_UNKNOWN246 = 0xf6, Reserved;
    OP_UNKNOWN247 = 0xf7, Reserved;
    OP_UNKNOWN248 = 0xf8, Reserved;
    OP_UNKNOWN249 = 0xf9, Reserved;
    OP_SMALLDATA = 0xfa, Reserved;
    OP_SMALLINTEGER = 0xfb, Reserved;
    OP_PUBKEYS = 0xfc, Reserved;
    OP_UNKNOWN253 = 0xfd, Reserved;
    OP_PUBKEYHASH = 0xfe, Reserved;
    OP_PUBKEY = 0xff, Reserved;
}

impl Opcode {
    /// `true` for the 1..75 direct-push range, `OP_0`, and the three
    /// `OP_PUSHDATA*` forms — anything that pushes data rather than
    /// executing an operation.
    pub fn is_push(self) -> bool {
        let byte = self.to_u8();
        byte == 0 || (1..=75).contains(&byte) || matches!(self, Opcode::OP_PUSHDATA1 | Opcode::OP_PUSHDATA2 | Opcode::OP_PUSHDATA4)
    }

    /// `OP_1`..`OP_16`, decoded to the small integer it pushes.
    pub fn as_small_int(self) -> Option<i64> {
        let byte = self.to_u8();
        if (Opcode::OP_1.to_u8()..=Opcode::OP_16.to_u8()).contains(&byte) {
            Some((byte - Opcode::OP_1.to_u8() + 1) as i64)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trips_through_symbolic_name() {
        for byte in 0u16..256 {
            let op = Opcode::from_u8(byte as u8);
            assert_eq!(op.to_u8(), byte as u8);
        }
    }

    #[test]
    fn classic_disabled_opcodes_are_flagged() {
        for op in [Opcode::OP_CAT, Opcode::OP_MUL, Opcode::OP_INVERT, Opcode::OP_LSHIFT] {
            assert!(op.is_disabled());
        }
        assert!(!Opcode::OP_ADD.is_disabled());
    }

    #[test]
    fn small_int_decoding() {
        assert_eq!(Opcode::OP_1.as_small_int(), Some(1));
        assert_eq!(Opcode::OP_16.as_small_int(), Some(16));
        assert_eq!(Opcode::OP_DUP.as_small_int(), None);
    }
}
