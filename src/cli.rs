//! Command-line interface parsing for Stockwatch
//!
//! This module defines the commands and flags using clap and validates the
//! free-form arguments (ticker symbols) that clap cannot check on its own.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::drivers::DEFAULT_SEASON;
use crate::data::Currency;
use crate::user::Theme;

/// Longest ticker symbol accepted on the command line
const MAX_SYMBOL_LEN: usize = 12;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The symbol is empty, too long, or contains characters tickers never use
    #[error("Invalid symbol: '{0}'. Symbols use letters, digits, '.' and '-'")]
    InvalidSymbol(String),

    /// `settings set` was given nothing to change
    #[error("Nothing to update: pass --name, --theme or --currency")]
    NothingToUpdate,
}

/// Stockwatch - Stock quotes with an offline cache
#[derive(Parser, Debug)]
#[command(name = "stockwatch")]
#[command(about = "Stock quotes, price history and currency conversion with an offline cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding the cache and user data (defaults to the platform cache dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Market-data API access key
    #[arg(long, global = true, env = "MARKETSTACK_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Keep everything in memory for this run only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the latest quote for one or more symbols
    Quote {
        #[arg(required = true, value_name = "SYMBOL")]
        symbols: Vec<String>,

        /// Bypass fresh cache entries
        #[arg(long)]
        refresh: bool,
    },

    /// Show quotes for the popular symbols
    Popular,

    /// Search tickers by symbol or company name
    Search {
        query: String,

        #[arg(long)]
        refresh: bool,
    },

    /// Show end-of-day price history
    History {
        symbol: String,

        /// Number of days to look back
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=365))]
        days: u32,

        #[arg(long)]
        refresh: bool,
    },

    /// List stock exchanges
    Exchanges {
        #[arg(long)]
        refresh: bool,
    },

    /// List the F1 drivers of a season
    Drivers {
        #[arg(long, default_value_t = DEFAULT_SEASON, value_parser = clap::value_parser!(u16).range(1950..=2100))]
        season: u16,

        #[arg(long)]
        refresh: bool,
    },

    /// Show USD exchange rates
    Rates {
        #[arg(long)]
        refresh: bool,
    },

    /// Convert a USD amount into another currency
    Convert {
        amount: f64,

        /// Target currency: USD, EUR or RON
        #[arg(long)]
        to: Currency,
    },

    /// Inspect or clear the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage bookmarked symbols and drivers
    Bookmarks {
        #[arg(long, value_name = "UID")]
        user: String,

        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// Show or change user preferences
    Settings {
        #[arg(long, value_name = "UID")]
        user: String,

        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Entry count, expired entries and total size
    Stats,
    /// Remove every cache entry (user data is kept)
    Clear,
    /// Remove a single cache entry
    Remove { key: String },
}

#[derive(Subcommand, Debug)]
pub enum BookmarkAction {
    List,
    Add { symbol: String },
    Remove { symbol: String },
    /// Bookmark an F1 driver by id, e.g. max_verstappen
    AddDriver { driver_id: String },
    RemoveDriver { driver_id: String },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    Set(SettingsUpdate),
}

/// Preferences to change; omitted flags keep their stored value
#[derive(Args, Debug, Default)]
pub struct SettingsUpdate {
    #[arg(long)]
    pub name: Option<String>,

    /// light or dark
    #[arg(long)]
    pub theme: Option<Theme>,

    /// USD, EUR or RON
    #[arg(long)]
    pub currency: Option<Currency>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.theme.is_none() && self.currency.is_none()
    }
}

/// Validates and upper-cases a ticker symbol
///
/// # Returns
/// * `Ok(String)` with the normalized symbol
/// * `Err(CliError::InvalidSymbol)` if the symbol cannot be a ticker
pub fn parse_symbol_arg(s: &str) -> Result<String, CliError> {
    let symbol = s.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if valid {
        Ok(symbol)
    } else {
        Err(CliError::InvalidSymbol(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbol_arg_normalizes() {
        assert_eq!(parse_symbol_arg("aapl").unwrap(), "AAPL");
        assert_eq!(parse_symbol_arg(" brk.b ").unwrap(), "BRK.B");
        assert_eq!(parse_symbol_arg("RDS-A").unwrap(), "RDS-A");
    }

    #[test]
    fn test_parse_symbol_arg_invalid() {
        for bad in ["", "   ", "AA PL", "AAPL;", "ABCDEFGHIJKLM"] {
            let err = parse_symbol_arg(bad).unwrap_err();
            assert!(err.to_string().contains("Invalid symbol"));
        }
    }

    #[test]
    fn test_cli_parse_quote() {
        let cli = Cli::parse_from(["stockwatch", "quote", "AAPL", "msft", "--refresh"]);
        match cli.command {
            Commands::Quote { symbols, refresh } => {
                assert_eq!(symbols, vec!["AAPL", "msft"]);
                assert!(refresh);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_history_defaults_to_seven_days() {
        let cli = Cli::parse_from(["stockwatch", "history", "AAPL"]);
        match cli.command {
            Commands::History { days, refresh, .. } => {
                assert_eq!(days, 7);
                assert!(!refresh);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_history_rejects_out_of_range_days() {
        assert!(Cli::try_parse_from(["stockwatch", "history", "AAPL", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["stockwatch", "history", "AAPL", "--days", "366"]).is_err());
    }

    #[test]
    fn test_cli_convert_parses_currency() {
        let cli = Cli::parse_from(["stockwatch", "convert", "150", "--to", "eur"]);
        match cli.command {
            Commands::Convert { amount, to } => {
                assert_eq!(amount, 150.0);
                assert_eq!(to, Currency::Eur);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["stockwatch", "convert", "1", "--to", "GBP"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["stockwatch", "cache", "stats", "--data-dir", "/tmp/sw", "--ephemeral"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/sw")));
        assert!(cli.ephemeral);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Stats
            }
        ));
    }

    #[test]
    fn test_cli_settings_set() {
        let cli = Cli::parse_from([
            "stockwatch", "settings", "--user", "user123", "set", "--theme", "dark",
        ]);
        match cli.command {
            Commands::Settings {
                user,
                action: SettingsAction::Set(update),
            } => {
                assert_eq!(user, "user123");
                assert_eq!(update.theme, Some(Theme::Dark));
                assert!(update.name.is_none());
                assert!(!update.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_drivers_season() {
        let cli = Cli::parse_from(["stockwatch", "drivers"]);
        assert!(matches!(cli.command, Commands::Drivers { season: 2025, refresh: false }));

        let cli = Cli::parse_from(["stockwatch", "drivers", "--season", "2024", "--refresh"]);
        assert!(matches!(cli.command, Commands::Drivers { season: 2024, refresh: true }));

        assert!(Cli::try_parse_from(["stockwatch", "drivers", "--season", "1900"]).is_err());
    }

    #[test]
    fn test_cli_bookmark_driver() {
        let cli = Cli::parse_from(["stockwatch", "bookmarks", "--user", "u1", "add-driver", "norris"]);
        match cli.command {
            Commands::Bookmarks {
                action: BookmarkAction::AddDriver { driver_id },
                ..
            } => assert_eq!(driver_id, "norris"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_settings_update_default_is_empty() {
        assert!(SettingsUpdate::default().is_empty());
    }
}
