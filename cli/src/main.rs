//! Command-line front end for `bsv-core`: key generation, address
//! derivation, mnemonic handling, script disassembly, and a minimal
//! single-input transaction builder, with `clap` argument parsing,
//! `config`-layered settings, and a `tracing_subscriber` `fmt` layer
//! driven by `RUST_LOG`.

mod config;

use std::process::ExitCode;

use bsv_core::address::{Address, NetworkType};
use bsv_core::crypto::{Mnemonic, PrivateKey, PublicKey, PublicKeyEncoding, WifNetwork, WordCount};
use bsv_core::script::builders::{LockBuilder, P2pkhLockBuilder, P2pkhUnlockBuilder};
use bsv_core::script::chunk::{Chunk, Script};
use bsv_core::transaction::builder::TransactionBuilder;
use bsv_core::transaction::model::Utxo;
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::PublicConfig;

#[derive(Parser)]
#[command(name = "bsv-cli", version, about = "BSV wallet and transaction-construction toolkit")]
struct Cli {
    /// Path to a TOML config file (missing is not an error; defaults apply).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generates a fresh private key and its derived address.
    Keygen {
        #[arg(long, value_enum, default_value_t = NetworkArg::Main)]
        network: NetworkArg,
        /// Derive the address from the uncompressed public key encoding.
        #[arg(long)]
        uncompressed: bool,
    },
    /// Derives a P2PKH address from a hex-encoded public key.
    Address {
        pubkey_hex: String,
        #[arg(long, value_enum, default_value_t = NetworkArg::Main)]
        network: NetworkArg,
    },
    /// Generates a new mnemonic, or validates one and prints its seed.
    Mnemonic {
        #[arg(long, value_enum, default_value_t = WordCountArg::Twelve)]
        words: WordCountArg,
        #[arg(long, default_value = "")]
        passphrase: String,
        /// An existing phrase to validate instead of generating one.
        phrase: Option<String>,
    },
    /// Disassembles a hex-encoded script into its opcodes and pushes.
    DecodeScript { script_hex: String },
    /// Builds and signs a transaction spending one P2PKH UTXO to one
    /// P2PKH recipient, sending any change back to the spending key.
    BuildTx {
        #[arg(long)]
        prev_tx_id: String,
        #[arg(long)]
        prev_out_index: u32,
        #[arg(long)]
        value: i64,
        /// The spending key, as a 32-byte hex scalar.
        #[arg(long)]
        key_hex: String,
        /// Recipient address.
        #[arg(long)]
        to: String,
        /// Amount to send, in satoshis.
        #[arg(long)]
        send: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum NetworkArg {
    Main,
    Test,
}

impl From<NetworkArg> for NetworkType {
    fn from(value: NetworkArg) -> Self {
        match value {
            NetworkArg::Main => NetworkType::Main,
            NetworkArg::Test => NetworkType::Test,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum WordCountArg {
    Twelve,
    Fifteen,
    Eighteen,
    TwentyOne,
    TwentyFour,
}

impl From<WordCountArg> for WordCount {
    fn from(value: WordCountArg) -> Self {
        match value {
            WordCountArg::Twelve => WordCount::Twelve,
            WordCountArg::Fifteen => WordCount::Fifteen,
            WordCountArg::Eighteen => WordCount::Eighteen,
            WordCountArg::TwentyOne => WordCount::TwentyOne,
            WordCountArg::TwentyFour => WordCount::TwentyFour,
        }
    }
}

/// Errors this binary can report at the top level. Subsystem errors
/// are wrapped via `#[from]` so `main` can render any of them the same
/// way.
#[derive(Debug, Error)]
enum CliError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error(transparent)]
    Core(#[from] bsv_core::Error),
    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
    #[error("{0} must be exactly 32 bytes, found {1}")]
    WrongKeyLength(&'static str, usize),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = PublicConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Keygen { network, uncompressed } => keygen(network.into(), uncompressed),
        Command::Address { pubkey_hex, network } => address(&pubkey_hex, network.into()),
        Command::Mnemonic { words, passphrase, phrase } => mnemonic(words.into(), &passphrase, phrase.as_deref()),
        Command::DecodeScript { script_hex } => decode_script(&script_hex),
        Command::BuildTx { prev_tx_id, prev_out_index, value, key_hex, to, send } => {
            build_tx(&prev_tx_id, prev_out_index, value, &key_hex, &to, send, &config)
        }
    }
}

fn keygen(network: NetworkType, uncompressed: bool) -> Result<(), CliError> {
    let key = PrivateKey::generate();
    let encoding = if uncompressed { PublicKeyEncoding::Uncompressed } else { PublicKeyEncoding::Compressed };
    let pubkey = key.public_key(encoding);
    let address = Address::from_public_key(&pubkey, network);
    let wif_network = match network {
        NetworkType::Main => WifNetwork::Main,
        NetworkType::Test => WifNetwork::Test,
    };

    println!("private_key: {}", hex::encode(*key.to_bytes()));
    println!("wif:         {}", key.to_wif(wif_network, !uncompressed));
    println!("public_key:  {}", hex::encode(pubkey.to_bytes()));
    println!("address:     {address}");
    Ok(())
}

fn address(pubkey_hex: &str, network: NetworkType) -> Result<(), CliError> {
    let bytes = hex::decode(pubkey_hex)?;
    let pubkey = PublicKey::from_bytes(&bytes).map_err(bsv_core::Error::from)?;
    let address = Address::from_public_key(&pubkey, network);
    println!("{address}");
    Ok(())
}

fn mnemonic(words: WordCount, passphrase: &str, phrase: Option<&str>) -> Result<(), CliError> {
    let mnemonic = match phrase {
        Some(phrase) => Mnemonic::from_phrase(phrase).map_err(bsv_core::Error::from)?,
        None => Mnemonic::generate(words),
    };
    println!("phrase: {}", mnemonic.phrase());
    println!("seed:   {}", hex::encode(mnemonic.to_seed(passphrase)));
    Ok(())
}

fn decode_script(script_hex: &str) -> Result<(), CliError> {
    let bytes = hex::decode(script_hex)?;
    let script = Script::parse(&bytes).map_err(bsv_core::Error::from)?;
    for chunk in script.chunks() {
        match chunk {
            Chunk::Op(op) => println!("{op:?}"),
            Chunk::Push { data, .. } => println!("PUSH {} <{}>", data.len(), hex::encode(data)),
        }
    }
    Ok(())
}

fn build_tx(
    prev_tx_id_hex: &str,
    prev_out_index: u32,
    value: i64,
    key_hex: &str,
    to: &str,
    send: i64,
    config: &PublicConfig,
) -> Result<(), CliError> {
    let prev_tx_id: [u8; 32] = hex::decode(prev_tx_id_hex)?
        .try_into()
        .map_err(|bytes: Vec<u8>| CliError::WrongKeyLength("prev_tx_id", bytes.len()))?;
    let key_bytes: [u8; 32] =
        hex::decode(key_hex)?.try_into().map_err(|bytes: Vec<u8>| CliError::WrongKeyLength("key_hex", bytes.len()))?;
    let key = PrivateKey::from_bytes(&key_bytes).map_err(bsv_core::Error::from)?;
    let pubkey = key.public_key(PublicKeyEncoding::Compressed);

    let change_address = Address::from_public_key(&pubkey, config.network);
    let change_lock = P2pkhLockBuilder::new(change_address.hash160());

    let recipient = to.parse::<Address>().map_err(bsv_core::Error::from)?;
    let recipient_lock = P2pkhLockBuilder::new(recipient.hash160());

    let utxo_lock = P2pkhLockBuilder::from_public_key(&pubkey);
    let utxo = Utxo { prev_tx_id, prev_out_index, value, locking_script: utxo_lock.build_lock() };

    let mut unsigned = TransactionBuilder::new()
        .spend_from_output(utxo, 0xFFFF_FFFF, Box::new(P2pkhUnlockBuilder::new(pubkey.to_bytes())))
        .spend_to(&recipient_lock, send)
        .map_err(bsv_core::Error::from)?
        .send_change_to(Box::new(change_lock))
        .with_fee_per_kb(config.fee_per_kb)
        .with_dust_threshold(config.dust_threshold)
        .finalize()
        .map_err(bsv_core::Error::from)?;

    unsigned.sign_input(0, &key, config.sighash_type()).map_err(bsv_core::Error::from)?;
    let signed = unsigned.finish().map_err(bsv_core::Error::from)?;

    println!("txid: {}", signed.transaction().txid_hex());
    println!("raw:  {}", hex::encode(signed.transaction().serialize()));
    Ok(())
}
