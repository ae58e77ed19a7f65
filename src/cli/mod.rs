use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::{self, JsonFileSource};
use crate::config::{AppConfig, ConfigLoader, ConfigPaths, CONFIG_ENV, DATA_ENV};
use crate::recent::{JsonFileStore, RecencyCache, RecencyHandle};

pub mod commands;

use self::commands::{DecodeArgs, RecentArgs, SearchArgs};

#[derive(Parser, Debug)]
#[command(
    name = "carbs-calc",
    version,
    about = "Inspect calculator links, search the food catalog and manage recent items"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over CARBS_CALC_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over CARBS_CALC_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a calculator link and print its totals
    Decode(DecodeArgs),
    /// Suggest catalog items for search keywords
    Search(SearchArgs),
    /// Inspect or update the recent items ranking
    Recent(RecentArgs),
}

/// What every command works against: configuration, catalog and the recency
/// cache, all loaded once per invocation.
pub struct CliContext {
    pub config: Arc<AppConfig>,
    pub paths: ConfigPaths,
    pub catalog: Arc<catalog::Catalog>,
    pub recent: RecencyHandle,
}

impl CliContext {
    pub fn load(config: AppConfig, paths: ConfigPaths) -> Self {
        let catalog_path = config.catalog.path_or(&paths).to_path_buf();
        let pending = catalog::spawn_fetch(Arc::new(JsonFileSource::new(catalog_path)));
        let catalog = pending.wait().unwrap_or_default();
        let recent = RecencyCache::handle(
            Arc::new(JsonFileStore::new(paths.store_dir.clone())),
            config.recent.clone(),
        );
        Self {
            config: Arc::new(config),
            paths,
            catalog: Arc::new(catalog),
            recent,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let loader = ConfigLoader::discover()?;
    let paths = loader.paths().clone();
    let config = loader.load_or_init()?;
    let ctx = CliContext::load(config, paths);

    match cli.command {
        Commands::Decode(args) => commands::decode_link(&ctx, args),
        Commands::Search(args) => commands::search_items(&ctx, args),
        Commands::Recent(args) => commands::handle_recent_command(&ctx, args),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
