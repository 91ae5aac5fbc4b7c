//! Stockwatch - Stock quotes with an offline cache
//!
//! Command-line front end over the market-data and exchange-rate clients.
//! Responses are cached on disk, outbound calls are paced, and cached data is
//! served when the APIs cannot be reached.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use stockwatch::cache::CacheStore;
use stockwatch::cli::{
    parse_symbol_arg, BookmarkAction, CacheAction, Cli, CliError, Commands, SettingsAction,
    SettingsUpdate,
};
use stockwatch::config::Config;
use stockwatch::data::currency::format_percentage_change;
use stockwatch::data::market::MarketClient;
use stockwatch::data::{CurrencyClient, DataAccess, DriverClient, ReqwestFetcher, Stock};
use stockwatch::logging;
use stockwatch::rate_limit::RateLimiter;
use stockwatch::storage::{FileStore, KvStore, MemoryStore};
use stockwatch::user::{Bookmarks, UserSettings};

/// Long-lived services built once per run
struct Services {
    cache: CacheStore,
    market: MarketClient,
    currency: CurrencyClient,
    drivers: DriverClient,
    bookmarks: Bookmarks,
    settings: UserSettings,
}

impl Services {
    async fn build(cli: &Cli, config: Config) -> Result<Self, Box<dyn Error>> {
        let store = open_store(cli);

        let cache = CacheStore::new(store.clone(), config.cache.clone());
        cache.initialize().await;

        let limiter = Arc::new(RateLimiter::new(config.min_request_interval));
        let fetcher = Arc::new(ReqwestFetcher::new(config.request_timeout)?);
        let access = DataAccess::new(cache.clone(), limiter, fetcher);

        Ok(Self {
            market: MarketClient::new(access.clone(), config.market),
            currency: CurrencyClient::new(access.clone(), config.rates_url),
            drivers: DriverClient::new(access, config.drivers_url),
            bookmarks: Bookmarks::new(store.clone()),
            settings: UserSettings::new(store),
            cache,
        })
    }
}

/// Picks the durable store: `--ephemeral`, `--data-dir`, or the platform cache dir
fn open_store(cli: &Cli) -> Arc<dyn KvStore> {
    if cli.ephemeral {
        return Arc::new(MemoryStore::new());
    }
    if let Some(dir) = &cli.data_dir {
        return Arc::new(FileStore::with_dir(dir.clone()));
    }
    match FileStore::new() {
        Some(store) => Arc::new(store),
        None => {
            warn!("No cache directory available, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

fn print_quote(stock: &Stock) {
    let change = stock.daily_change();
    println!(
        "{:<8} {:>10.2} {:>+9.2} {:>9}  {}",
        stock.symbol,
        stock.close,
        change.change,
        format_percentage_change(change.change_percent),
        stock.date
    );
}

async fn run_quote(services: &Services, symbols: &[String], refresh: bool) -> Result<(), Box<dyn Error>> {
    let symbols = symbols
        .iter()
        .map(|s| parse_symbol_arg(s))
        .collect::<Result<Vec<_>, CliError>>()?;

    if symbols.len() == 1 || refresh {
        for symbol in &symbols {
            match services.market.get_stock_price(symbol, refresh).await {
                Ok(stock) => print_quote(&stock),
                Err(e) => eprintln!("{}: {}", symbol, e),
            }
        }
        return Ok(());
    }

    let stocks = services.market.get_multiple_stocks(&symbols).await;
    for stock in &stocks {
        print_quote(stock);
    }
    for symbol in symbols.iter().filter(|s| !stocks.iter().any(|st| &st.symbol == *s)) {
        eprintln!("{}: no data available", symbol);
    }
    Ok(())
}

async fn run_settings(
    services: &Services,
    user: &str,
    action: SettingsAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        SettingsAction::Show => {
            let settings = services.settings.load(user).await;
            println!("name:     {}", settings.display_name);
            println!("theme:    {}", settings.theme);
            println!("currency: {}", settings.currency);
        }
        SettingsAction::Set(update) => {
            if update.is_empty() {
                return Err(CliError::NothingToUpdate.into());
            }
            let current = services.settings.load(user).await;
            let SettingsUpdate {
                name,
                theme,
                currency,
            } = update;
            services
                .settings
                .save_user_settings(
                    user,
                    name.as_deref().unwrap_or(&current.display_name),
                    theme.unwrap_or(current.theme),
                    currency,
                )
                .await?;
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = Config::from_env()?;
    if let Some(key) = &cli.access_key {
        config.market.access_key = key.clone();
    }
    let services = Services::build(&cli, config).await?;

    match cli.command {
        Commands::Quote { symbols, refresh } => run_quote(&services, &symbols, refresh).await?,
        Commands::Popular => {
            for stock in services.market.get_popular_stocks().await {
                print_quote(&stock);
            }
        }
        Commands::Search { query, refresh } => {
            for ticker in services.market.search_stocks(&query, refresh).await? {
                let exchange = ticker
                    .stock_exchange
                    .as_ref()
                    .map(|e| e.acronym.as_str())
                    .unwrap_or("");
                println!("{:<8} {:<8} {}", ticker.symbol, exchange, ticker.name);
            }
        }
        Commands::History {
            symbol,
            days,
            refresh,
        } => {
            let symbol = parse_symbol_arg(&symbol)?;
            for day in services.market.get_historical_data(&symbol, days, refresh).await? {
                println!(
                    "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>14.0}",
                    day.date.get(..10).unwrap_or(&day.date),
                    day.open,
                    day.high,
                    day.low,
                    day.close,
                    day.volume
                );
            }
        }
        Commands::Exchanges { refresh } => {
            for exchange in services.market.get_exchanges(refresh).await? {
                println!("{:<8} {:<6} {}", exchange.mic, exchange.country_code, exchange.name);
            }
        }
        Commands::Drivers { season, refresh } => {
            for driver in services.drivers.get_drivers(season, refresh).await? {
                println!(
                    "{:<4} {:<4} {:<24} {:<12} {}",
                    driver.code.as_deref().unwrap_or("-"),
                    driver.permanent_number.as_deref().unwrap_or("-"),
                    driver.full_name(),
                    driver.nationality,
                    driver.driver_id
                );
            }
        }
        Commands::Rates { refresh } => {
            let mut rates: Vec<_> = services.currency.get_exchange_rates(refresh).await.into_iter().collect();
            rates.sort_by(|a, b| a.0.cmp(&b.0));
            for (code, rate) in rates {
                println!("{:<4} {:>12.4}", code, rate);
            }
        }
        Commands::Convert { amount, to } => {
            println!("{}", services.currency.format_price(amount, to).await);
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                let stats = services.cache.stats().await;
                println!("entries: {}", stats.total_items);
                println!("expired: {}", stats.expired_items);
                println!("size:    {} bytes", stats.total_size_bytes);
                println!(
                    "retired: {} ({} bytes)",
                    stats.retired_items, stats.retired_size_bytes
                );
                let expiration = services.cache.config().expiration;
                println!("ttl:     {}h", expiration.as_secs() / 3600);
            }
            CacheAction::Clear => services.cache.clear_all().await,
            CacheAction::Remove { key } => services.cache.clear(&key).await,
        },
        Commands::Bookmarks { user, action } => match action {
            BookmarkAction::List => {
                for symbol in services.bookmarks.stock_symbols(&user).await {
                    println!("{}", symbol);
                }
                for driver_id in services.bookmarks.driver_ids(&user).await {
                    println!("driver:{}", driver_id);
                }
            }
            BookmarkAction::Add { symbol } => {
                let symbol = parse_symbol_arg(&symbol)?;
                services.bookmarks.add_stock(&user, &symbol).await?;
            }
            BookmarkAction::Remove { symbol } => {
                let symbol = parse_symbol_arg(&symbol)?;
                services.bookmarks.remove_stock(&user, &symbol).await?;
            }
            BookmarkAction::AddDriver { driver_id } => {
                services.bookmarks.add_driver(&user, &driver_id).await?;
            }
            BookmarkAction::RemoveDriver { driver_id } => {
                services.bookmarks.remove_driver(&user, &driver_id).await?;
            }
        },
        Commands::Settings { user, action } => run_settings(&services, &user, action).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
