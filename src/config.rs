use crate::{
    advisory::{
        DEFAULT_MODEL,
        DEFAULT_ORACLE_URL,
    },
    game::{
        GameSettings,
        STARTING_PURSE,
    },
    ledger::Coins,
};
use clap::Parser;
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_STAKE: u64 = 5;
pub const DEFAULT_ROLL_DELAY_MS: u64 = 2500;
pub const DEFAULT_COIN_DELAY_MS: u64 = 800;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Color Game Royale: bet on colors, drain the Umbra", long_about = None)]
pub struct Args {
    /// Seed the dice for a reproducible session
    #[arg(long)]
    pub seed: Option<u64>,

    /// Coins in the purse at the start of the session
    #[arg(long, default_value_t = STARTING_PURSE.get())]
    pub purse: u64,

    /// Coins placed per bet key press
    #[arg(long, default_value_t = DEFAULT_STAKE, value_parser = clap::value_parser!(u64).range(1..))]
    pub stake: u64,

    /// Base URL of the oracle's generateContent API
    #[arg(long = "oracle-url", default_value = DEFAULT_ORACLE_URL)]
    pub oracle_url: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long = "api-key", env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Never call the oracle; always show the fallback prophecy
    #[arg(long)]
    pub offline: bool,

    #[arg(long = "log-dir", default_value = "logs")]
    pub log_dir: PathBuf,

    #[arg(long = "roll-delay-ms", default_value_t = DEFAULT_ROLL_DELAY_MS)]
    pub roll_delay_ms: u64,

    #[arg(long = "coin-delay-ms", default_value_t = DEFAULT_COIN_DELAY_MS)]
    pub coin_delay_ms: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OracleMode {
    Offline,
    Remote {
        base_url: String,
        model: String,
        api_key: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppConfig {
    pub seed: Option<u64>,
    pub game: GameSettings,
    pub stake: Coins,
    pub oracle: OracleMode,
    pub log_dir: PathBuf,
    pub roll_delay: Duration,
    pub coin_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed: None,
            game: GameSettings::default(),
            stake: Coins::new(DEFAULT_STAKE),
            oracle: OracleMode::Offline,
            log_dir: PathBuf::from("logs"),
            roll_delay: Duration::from_millis(DEFAULT_ROLL_DELAY_MS),
            coin_delay: Duration::from_millis(DEFAULT_COIN_DELAY_MS),
        }
    }
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        let api_key = args.api_key.filter(|key| !key.trim().is_empty());
        let oracle = match (args.offline, api_key) {
            (false, Some(api_key)) => OracleMode::Remote {
                base_url: args.oracle_url,
                model: args.model,
                api_key,
            },
            _ => OracleMode::Offline,
        };
        Self {
            seed: args.seed,
            game: GameSettings {
                starting_purse: Coins::new(args.purse),
                ..GameSettings::default()
            },
            stake: Coins::new(args.stake),
            oracle,
            log_dir: args.log_dir,
            roll_delay: Duration::from_millis(args.roll_delay_ms),
            coin_delay: Duration::from_millis(args.coin_delay_ms),
        }
    }
}
