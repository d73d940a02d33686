//! `bsv-cli`'s configuration: a TOML file plus `BSV_`-prefixed
//! environment variables layered over sensible built-in defaults.
//!
//! `bsv-core` itself never reads a file; this struct is the CLI's own
//! concern, holding the handful of settings a builder/interpreter call
//! needs pinned once per invocation rather than repeated on every flag.

use bsv_core::script::interpreter::ScriptFlags;
use bsv_core::script::sighash::SighashType;
use bsv_core::transaction::builder::{DEFAULT_DUST_THRESHOLD, DEFAULT_FEE_PER_KB, DEFAULT_SIGHASH_TYPE};
use bsv_core::NetworkType;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// `network`, `feePerKb`, `dustThreshold`, `scriptFlags`, `sighashType`.
/// `script_flags`/`sighash_type` are stored as their raw `u32`/`u8` forms
/// so this struct can derive `serde` without requiring `ScriptFlags`
/// or `SighashType` themselves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicConfig {
    pub network: NetworkType,
    pub fee_per_kb: u64,
    pub dust_threshold: u64,
    pub script_flags: u32,
    pub sighash_type: u8,
}

impl Default for PublicConfig {
    fn default() -> Self {
        PublicConfig {
            network: NetworkType::Main,
            fee_per_kb: DEFAULT_FEE_PER_KB,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            script_flags: ScriptFlags::standard().bits(),
            sighash_type: DEFAULT_SIGHASH_TYPE.byte(),
        }
    }
}

impl PublicConfig {
    pub fn script_flags(&self) -> ScriptFlags {
        ScriptFlags::from_bits(self.script_flags)
    }

    pub fn sighash_type(&self) -> SighashType {
        SighashType::new(self.sighash_type)
    }

    /// Layers `path` (a TOML file, missing is not an error) and
    /// environment variables (e.g. `BSV_FEE_PER_KB=2000`) over the
    /// built-in defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&PublicConfig::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("BSV").separator("__"));
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_its_flag_accessors() {
        let config = PublicConfig::default();
        assert!(config.script_flags().has(ScriptFlags::FORKID));
        assert!(config.sighash_type().fork_id());
    }

    #[test]
    fn load_with_no_file_falls_back_to_defaults() {
        let config = PublicConfig::load(None).unwrap();
        assert_eq!(config, PublicConfig::default());
    }
}
