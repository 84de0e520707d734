use std::path::PathBuf;
use std::time::Duration;

use bridge_card::{AppKeyId, BridgeConfig, ExtractMode};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "bridge",
    version,
    about = "Drive an emulated bridge card through its register protocol"
)]
pub struct Args {
    /// Slot the card is installed in (0-7).
    ///
    /// Environment variable: `BRIDGE_SLOT`.
    #[arg(long, env = "BRIDGE_SLOT", default_value_t = 4, value_parser = clap::value_parser!(u8).range(0..8))]
    slot: u8,

    /// Directory holding AppKey blobs (`ak_XXXXXXXX.txt`).
    ///
    /// Environment variable: `BRIDGE_APPKEY_DIR`.
    #[arg(long, env = "BRIDGE_APPKEY_DIR", default_value = ".")]
    appkey_dir: PathBuf,

    /// Maximum number of bytes pulled from a remote resource.
    ///
    /// Environment variable: `BRIDGE_FETCH_LIMIT`.
    #[arg(long, env = "BRIDGE_FETCH_LIMIT")]
    fetch_limit: Option<usize>,

    /// Give up on a remote fetch after this many milliseconds. Unset blocks indefinitely.
    ///
    /// Environment variable: `BRIDGE_FETCH_TIMEOUT_MS`.
    #[arg(long, env = "BRIDGE_FETCH_TIMEOUT_MS")]
    fetch_timeout_ms: Option<u64>,

    /// Keep object keys when extracting remote values.
    ///
    /// Environment variable: `BRIDGE_EXTRACT_KEYS`.
    #[arg(long, env = "BRIDGE_EXTRACT_KEYS")]
    keys: bool,

    /// Byte returned by reads with no backing data.
    ///
    /// Environment variable: `BRIDGE_FLOATING_BUS`.
    #[arg(long, env = "BRIDGE_FLOATING_BUS", default_value_t = 0xFF)]
    floating_bus: u8,

    /// Restore the slot table from this snapshot before running the command.
    #[arg(long)]
    snapshot_load: Option<PathBuf>,

    /// Save the slot table to this snapshot after running the command.
    #[arg(long)]
    snapshot_save: Option<PathBuf>,

    /// Log filter (tracing-subscriber EnvFilter syntax).
    ///
    /// Environment variable: `BRIDGE_LOG_LEVEL`.
    #[arg(long, env = "BRIDGE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the AppKey stored under ID (8 hex digits).
    AppkeyRead {
        #[arg(value_parser = parse_app_key_id)]
        id: AppKeyId,
    },
    /// Store VALUE under ID (8 hex digits).
    AppkeyWrite {
        #[arg(value_parser = parse_app_key_id)]
        id: AppKeyId,
        value: String,
    },
    /// Fetch URL and print the extracted values, one per line.
    Fetch { url: String },
    /// Print the response bytes not yet streamed out (useful after `--snapshot-load`).
    Receive,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub slot: u8,
    pub appkey_dir: PathBuf,
    pub card: BridgeConfig,
    pub fetch_timeout: Option<Duration>,
    pub floating_bus: u8,
    pub snapshot_load: Option<PathBuf>,
    pub snapshot_save: Option<PathBuf>,
    pub log_level: String,
    pub command: Command,
}

impl Config {
    pub fn load() -> Self {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Self {
        let mut card = BridgeConfig::default();
        if let Some(limit) = args.fetch_limit {
            card.fetch_limit = limit;
        }
        card.extract_mode = if args.keys {
            ExtractMode::KeysAndValues
        } else {
            ExtractMode::ValuesOnly
        };

        let log_level = args
            .log_level
            .or_else(|| std::env::var("RUST_LOG").ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Self {
            slot: args.slot,
            appkey_dir: args.appkey_dir,
            card,
            fetch_timeout: args.fetch_timeout_ms.map(Duration::from_millis),
            floating_bus: args.floating_bus,
            snapshot_load: args.snapshot_load,
            snapshot_save: args.snapshot_save,
            log_level,
            command: args.command,
        }
    }
}

fn parse_app_key_id(s: &str) -> Result<AppKeyId, String> {
    let bytes = hex::decode(s.trim()).map_err(|err| format!("invalid hex id: {err}"))?;
    let id: [u8; 4] = bytes
        .try_into()
        .map_err(|_| "id must be exactly 8 hex digits".to_string())?;
    Ok(AppKeyId(id))
}
