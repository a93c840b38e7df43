use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use property_locator::location::providers::{DEFAULT_USER_AGENT, NOMINATIM_URL, PHOTON_URL};
use property_locator::{LocatorConfig, LocatorService, PropertyCatalog};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::PathBuf;
use std::time::Duration;

/// Property Locator — find hotel properties near a (possibly misspelled) place.
///
/// Examples:
///   locator serve --port 8000
///   locator find nioda
///   locator find "new delhi" --radius-km 25
///   locator --catalog ./catalog.json find jaipur
#[derive(Parser)]
#[command(name = "locator", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "LOCATOR_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, short = 'p', env = "LOCATOR_PORT", default_value_t = 8000)]
        port: u16,

        /// Identify clients by the first X-Forwarded-For hop instead of the
        /// peer address. Only enable behind a proxy that sets the header.
        #[arg(long, env = "LOCATOR_TRUST_FORWARDED_FOR")]
        trust_forwarded_for: bool,
    },
    /// Resolve one query and print the JSON response.
    Find {
        /// Place name to search around.
        query: String,
    },
}

#[derive(Args)]
struct Settings {
    /// Catalog JSON file. Defaults to the built-in dataset.
    #[arg(long, global = true, env = "LOCATOR_CATALOG")]
    catalog: Option<PathBuf>,

    /// Search radius in kilometres.
    #[arg(long, global = true, env = "LOCATOR_RADIUS_KM", default_value_t = 50.0)]
    radius_km: f64,

    /// Minimum similarity (0.0-1.0) for a catalog place name to be accepted.
    #[arg(long, global = true, env = "LOCATOR_SIMILARITY_THRESHOLD", default_value_t = 0.8)]
    similarity_threshold: f64,

    /// Overall time allowed for geocoding one query, in milliseconds.
    #[arg(long, global = true, env = "LOCATOR_GEOCODE_BUDGET_MS", default_value_t = 1500)]
    geocode_budget_ms: u64,

    /// Minimum spacing between outbound geocoding calls, in milliseconds.
    #[arg(long, global = true, env = "LOCATOR_MIN_INTERVAL_MS", default_value_t = 1000)]
    min_interval_ms: u64,

    /// Geocoding attempts per query (transient failures only).
    #[arg(long, global = true, env = "LOCATOR_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Requests allowed per client per window.
    #[arg(long, global = true, env = "LOCATOR_RATE_LIMIT", default_value_t = 10)]
    rate_limit: usize,

    /// Rate-limit window, in seconds.
    #[arg(long, global = true, env = "LOCATOR_RATE_WINDOW_SECS", default_value_t = 60)]
    rate_window_secs: u64,

    /// User-Agent sent to the geocoding and suggestion services.
    #[arg(long, global = true, env = "LOCATOR_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    #[arg(long, global = true, env = "LOCATOR_GEOCODE_URL", default_value = NOMINATIM_URL)]
    geocode_url: String,

    #[arg(long, global = true, env = "LOCATOR_SUGGEST_URL", default_value = PHOTON_URL)]
    suggest_url: String,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, global = true, env = "LOCATOR_LOG_LEVEL", default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("Unknown log level '{}'. Use error, warn, info, debug or trace.", s))
}

impl Settings {
    fn locator_config(&self) -> anyhow::Result<LocatorConfig> {
        anyhow::ensure!(self.radius_km > 0.0, "--radius-km must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.similarity_threshold),
            "--similarity-threshold must be between 0 and 1"
        );
        anyhow::ensure!(self.rate_limit > 0, "--rate-limit must be at least 1");

        let mut config = LocatorConfig {
            radius_km: self.radius_km,
            user_agent: self.user_agent.clone(),
            geocode_url: self.geocode_url.clone(),
            suggest_url: self.suggest_url.clone(),
            ..LocatorConfig::default()
        };
        config.corrector.similarity_threshold = self.similarity_threshold;
        config.geocoder.budget = Duration::from_millis(self.geocode_budget_ms);
        config.geocoder.min_interval = Duration::from_millis(self.min_interval_ms);
        config.geocoder.max_attempts = self.max_attempts;
        config.rate_limit.max_requests = self.rate_limit;
        config.rate_limit.window = Duration::from_secs(self.rate_window_secs);
        Ok(config)
    }

    fn catalog(&self) -> anyhow::Result<PropertyCatalog> {
        match &self.catalog {
            Some(path) => PropertyCatalog::load(path)
                .with_context(|| format!("loading catalog {}", path.display())),
            None => Ok(PropertyCatalog::builtin()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = ConfigBuilder::new().set_target_level(LevelFilter::Error).build();
    TermLogger::init(cli.settings.log_level, log_config, TerminalMode::Stderr, ColorChoice::Auto)
        .context("initializing logger")?;

    let config = cli.settings.locator_config()?;
    let catalog = cli.settings.catalog()?;
    log::info!("catalog: {} properties", catalog.len());

    let locator = LocatorService::new(catalog, config);

    match cli.command {
        Command::Serve {
            host,
            port,
            trust_forwarded_for,
        } => {
            property_locator::server::start(&host, port, locator, trust_forwarded_for)
                .await
                .with_context(|| format!("serving on {}:{}", host, port))?;
        }
        Command::Find { query } => {
            let payload = tokio::task::spawn_blocking(move || locator.find_properties(&query)).await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}
