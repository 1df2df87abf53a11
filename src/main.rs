use clap::Parser;
use engager::bot::{Bot, BotSettings, RetryPolicy};
use engager::config::Config;
use engager::error::{BotError, ErrorRecovery};
use engager::platform::HttpPlatformClient;
use engager::source::HashtagSource;
use engager::storage::SqliteStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "engager")]
#[command(about = "Follows, likes and comments on accounts found through hashtags")]
#[command(version)]
struct Cli {
    /// Path to configuration file (can also be set via ENGAGER_CONFIG env var)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable verbose logging (equivalent to --log-level debug)
    #[arg(short, long)]
    verbose: bool,

    /// Seed for the random decisions, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    /// Get config path from CLI arg or ENGAGER_CONFIG environment variable
    fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var("ENGAGER_CONFIG").ok().map(PathBuf::from))
    }
}

fn init_logging(config: &Config, cli: &Cli) -> Result<(), BotError> {
    let configured = config.logging().level;
    let log_level = if cli.verbose {
        "debug"
    } else if let Some(ref level) = cli.log_level {
        level.as_str()
    } else {
        configured.as_deref().unwrap_or("info")
    };

    let _level = match log_level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => {
            return Err(BotError::InvalidData(format!(
                "Invalid log level: {log_level}. Valid levels are: error, warn, info, debug, trace"
            )));
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| BotError::InvalidData(format!("Failed to create log filter: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .init();

    debug!("Logging initialized with level: {}", log_level);
    Ok(())
}

/// Log an error at the level its kind deserves; pass it on if the process should exit
fn handle_error(error: BotError) -> Result<(), BotError> {
    match &error {
        BotError::Config(_) => {
            error!("Configuration error: {}", error);
            error!("Please check your configuration file and environment variables");
        }
        BotError::RetriesExhausted { .. } => {
            error!("{}", error);
            info!("The platform kept rejecting requests, try again later");
        }
        BotError::Platform(_) => error!("Platform error: {}", error),
        BotError::Storage(_) => error!("Storage error: {}", error),
        BotError::Cancelled => warn!("Bot run cancelled by shutdown signal"),
        _ => {
            error!("Application error: {}", error);
            debug!("Error details: {:?}", error);
        }
    }

    if ErrorRecovery::should_shutdown(&error) {
        return Err(error);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BotError> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().init();
            return handle_error(BotError::Config(e));
        }
    };

    if let Err(e) = init_logging(&config, &cli) {
        eprintln!("Failed to initialize logging: {e}");
        return Err(e);
    }

    info!("Starting engager v{}", env!("CARGO_PKG_VERSION"));
    info!("Platform: {}", config.platform.base_url);
    info!(
        "Actions: likes={} comments={} follows={}",
        config.bot.likes_enabled, config.bot.comments_enabled, config.bot.following_enabled
    );

    match run_application(config, cli.seed).await {
        Ok(()) => {
            info!("Application shutdown complete");
            Ok(())
        }
        Err(e) => handle_error(e),
    }
}

async fn run_application(config: Config, seed: Option<u64>) -> Result<(), BotError> {
    let database_path = config
        .storage()
        .database_path
        .unwrap_or_else(|| "engager.db".to_string());
    debug!("Opening database at {}", database_path);
    let store = SqliteStore::open(&database_path)?;

    let client = HttpPlatformClient::new(&config.platform)?;
    let source = HashtagSource::from_config(&config.bot);

    let rng = match seed.or(config.bot.seed) {
        Some(seed) => {
            info!("Using fixed random seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    let mut bot = Bot::new(
        client,
        source,
        store,
        BotSettings::from(&config.bot),
        rng,
    )
    .with_retry_policy(RetryPolicy::from(&config.retry()))
    .with_cancellation(token);

    let outcome = bot.run().await;
    if let Some(stats) = bot.last_run_statistics() {
        info!("Run summary: {} ({} actions)", stats, stats.total_actions());
    }
    outcome
}

/// Resolve once SIGTERM or SIGINT arrives
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Failed to register signal handlers: {}", e);
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["engager"]);
        assert!(cli.config.is_none());
        assert!(cli.log_level.is_none());
        assert!(!cli.verbose);
        assert!(cli.seed.is_none());

        let cli = Cli::parse_from(["engager", "--config", "/path/to/config.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));

        let cli = Cli::parse_from(["engager", "--log-level", "debug"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));

        let cli = Cli::parse_from(["engager", "--verbose", "--seed", "42"]);
        assert!(cli.verbose);
        assert_eq!(cli.seed, Some(42));
    }

    #[test]
    fn test_engager_config_env_var() {
        std::env::set_var("ENGAGER_CONFIG", "/env/path/to/config.toml");

        let cli = Cli::parse_from(["engager"]);
        assert_eq!(
            cli.config_path(),
            Some(PathBuf::from("/env/path/to/config.toml"))
        );

        // CLI arg wins over the environment
        let cli = Cli::parse_from(["engager", "--config", "/cli/path/to/config.toml"]);
        assert_eq!(
            cli.config_path(),
            Some(PathBuf::from("/cli/path/to/config.toml"))
        );

        std::env::remove_var("ENGAGER_CONFIG");

        let cli = Cli::parse_from(["engager"]);
        assert_eq!(cli.config_path(), None);
    }

    #[test]
    fn test_cancellation_is_not_fatal() {
        assert!(handle_error(BotError::Cancelled).is_ok());
        assert!(handle_error(BotError::RetriesExhausted { attempts: 16 }).is_err());
    }
}
