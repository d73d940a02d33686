//! Interpreter execution flags.

/// A bitset of interpreter policy flags, settable per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptFlags(u32);

impl ScriptFlags {
    pub const MINIMALDATA: u32 = 1 << 0;
    pub const LOW_S: u32 = 1 << 1;
    pub const NULLFAIL: u32 = 1 << 2;
    pub const CLEANSTACK: u32 = 1 << 3;
    pub const SIGPUSHONLY: u32 = 1 << 4;
    pub const DISCOURAGE_UPGRADABLE_NOPS: u32 = 1 << 5;
    pub const FORKID: u32 = 1 << 6;
    pub const P2SH: u32 = 1 << 7;

    pub fn empty() -> Self {
        ScriptFlags(0)
    }

    /// The flag set this library verifies P2PKH/P2SH spends under by
    /// default: BIP16 (P2SH) active, minimal encodings enforced,
    /// low-S and NULLFAIL required, FORKID required on signatures.
    pub fn standard() -> Self {
        ScriptFlags(
            Self::MINIMALDATA | Self::LOW_S | Self::NULLFAIL | Self::CLEANSTACK | Self::P2SH | Self::FORKID,
        )
    }

    pub fn with(mut self, flag: u32) -> Self {
        self.0 |= flag;
        self
    }

    pub fn without(mut self, flag: u32) -> Self {
        self.0 &= !flag;
        self
    }

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// The raw bitset, for embedding in a serializable config type.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Reconstructs a flag set from raw bits (e.g. loaded from config).
    pub fn from_bits(bits: u32) -> Self {
        ScriptFlags(bits)
    }
}

impl Default for ScriptFlags {
    fn default() -> Self {
        ScriptFlags::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_and_without_toggle_bits() {
        let flags = ScriptFlags::empty().with(ScriptFlags::LOW_S);
        assert!(flags.has(ScriptFlags::LOW_S));
        assert!(!flags.has(ScriptFlags::NULLFAIL));
        let cleared = flags.without(ScriptFlags::LOW_S);
        assert!(!cleared.has(ScriptFlags::LOW_S));
    }

    #[test]
    fn standard_includes_forkid_and_p2sh() {
        let flags = ScriptFlags::standard();
        assert!(flags.has(ScriptFlags::FORKID));
        assert!(flags.has(ScriptFlags::P2SH));
    }
}
