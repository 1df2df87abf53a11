use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_MAX_FAILS: u32 = 15;
pub const DEFAULT_BACKOFF_SECS: u64 = 240;
pub const DEFAULT_MAX_TRANSPORT_RETRIES: u32 = 15;
pub const DEFAULT_TAG_MEDIA_LIMIT: usize = 20;

const CONFIG_FILE_NAME: &str = "engager.toml";

fn default_hashtags() -> Vec<String> {
    [
        "follow4like",
        "follow4likes",
        "follow",
        "follow4",
        "follow4folow",
        "followers",
        "following",
        "liker",
        "likers",
        "likelike",
        "liked",
        "likeme",
        "like4follow",
        "instalike",
        "likeit",
    ]
    .iter()
    .map(|tag| tag.to_string())
    .collect()
}

fn default_tag_media_limit() -> usize {
    DEFAULT_TAG_MEDIA_LIMIT
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    #[serde(default)]
    pub bot: BotConfig,
    pub retry: Option<RetryConfig>,
    pub storage: Option<StorageConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Feature flags plus account-source tuning for one bot instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub likes_enabled: bool,
    #[serde(default)]
    pub comments_enabled: bool,
    #[serde(default)]
    pub following_enabled: bool,
    #[serde(default = "default_hashtags")]
    pub hashtags: Vec<String>,
    #[serde(default = "default_tag_media_limit")]
    pub tag_media_limit: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_fails: Option<u32>,
    pub backoff_secs: Option<u64>,
    pub max_transport_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            likes_enabled: false,
            comments_enabled: false,
            following_enabled: false,
            hashtags: default_hashtags(),
            tag_media_limit: DEFAULT_TAG_MEDIA_LIMIT,
            seed: None,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_fails: Some(DEFAULT_MAX_FAILS),
            backoff_secs: Some(DEFAULT_BACKOFF_SECS),
            max_transport_retries: Some(DEFAULT_MAX_TRANSPORT_RETRIES),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: Some("engager.db".to_string()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str, expected: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{name} must be {expected}")))
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_file = match config_path {
            Some(path) => path,
            None => Self::find_config_file(),
        };

        let mut config = if config_file.exists() {
            tracing::debug!("Loading config from: {}", config_file.display());
            let content = std::fs::read_to_string(&config_file)?;
            toml::from_str::<Config>(&content)?
        } else {
            tracing::debug!("No config file found, using environment variables only");
            Config {
                platform: PlatformConfig {
                    base_url: String::new(),
                    access_token: String::new(),
                    timeout_secs: default_timeout_secs(),
                },
                bot: BotConfig::default(),
                retry: None,
                storage: None,
                logging: None,
            }
        };

        config.apply_env_overrides()?;

        if config.retry.is_none() {
            config.retry = Some(RetryConfig::default());
        }
        if config.storage.is_none() {
            config.storage = Some(StorageConfig::default());
        }
        if config.logging.is_none() {
            config.logging = Some(LoggingConfig::default());
        }

        config.validate()?;

        Ok(config)
    }

    /// Current directory first, then the user's config directory
    fn find_config_file() -> PathBuf {
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return current_dir_config;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("engager").join(CONFIG_FILE_NAME);
            if user_config.exists() {
                return user_config;
            }
        }

        current_dir_config
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Platform
        if let Ok(base_url) = env::var("ENGAGER_PLATFORM_BASE_URL") {
            self.platform.base_url = base_url;
        }
        if let Ok(access_token) = env::var("ENGAGER_PLATFORM_ACCESS_TOKEN") {
            self.platform.access_token = access_token;
        }
        if let Ok(timeout) = env::var("ENGAGER_PLATFORM_TIMEOUT_SECS") {
            self.platform.timeout_secs =
                parse_env("ENGAGER_PLATFORM_TIMEOUT_SECS", &timeout, "a valid number")?;
        }

        // Bot
        if let Ok(enabled) = env::var("ENGAGER_LIKES_ENABLED") {
            self.bot.likes_enabled =
                parse_env("ENGAGER_LIKES_ENABLED", &enabled, "true or false")?;
        }
        if let Ok(enabled) = env::var("ENGAGER_COMMENTS_ENABLED") {
            self.bot.comments_enabled =
                parse_env("ENGAGER_COMMENTS_ENABLED", &enabled, "true or false")?;
        }
        if let Ok(enabled) = env::var("ENGAGER_FOLLOWING_ENABLED") {
            self.bot.following_enabled =
                parse_env("ENGAGER_FOLLOWING_ENABLED", &enabled, "true or false")?;
        }
        if let Ok(hashtags) = env::var("ENGAGER_HASHTAGS") {
            self.bot.hashtags = hashtags
                .split(',')
                .map(|tag| tag.trim().trim_start_matches('#').to_string())
                .filter(|tag| !tag.is_empty())
                .collect();
        }
        if let Ok(limit) = env::var("ENGAGER_TAG_MEDIA_LIMIT") {
            self.bot.tag_media_limit =
                parse_env("ENGAGER_TAG_MEDIA_LIMIT", &limit, "a valid number")?;
        }
        if let Ok(seed) = env::var("ENGAGER_SEED") {
            self.bot.seed = Some(parse_env("ENGAGER_SEED", &seed, "a valid number")?);
        }

        // Retry
        if let Ok(max_fails) = env::var("ENGAGER_RETRY_MAX_FAILS") {
            let retry = self.retry.get_or_insert_with(RetryConfig::default);
            retry.max_fails = Some(parse_env(
                "ENGAGER_RETRY_MAX_FAILS",
                &max_fails,
                "a valid number",
            )?);
        }
        if let Ok(backoff) = env::var("ENGAGER_RETRY_BACKOFF_SECS") {
            let retry = self.retry.get_or_insert_with(RetryConfig::default);
            retry.backoff_secs = Some(parse_env(
                "ENGAGER_RETRY_BACKOFF_SECS",
                &backoff,
                "a valid number",
            )?);
        }
        if let Ok(max_transport) = env::var("ENGAGER_RETRY_MAX_TRANSPORT_RETRIES") {
            let retry = self.retry.get_or_insert_with(RetryConfig::default);
            retry.max_transport_retries = Some(parse_env(
                "ENGAGER_RETRY_MAX_TRANSPORT_RETRIES",
                &max_transport,
                "a valid number",
            )?);
        }

        // Storage
        if let Ok(path) = env::var("ENGAGER_DATABASE_PATH") {
            let storage = self.storage.get_or_insert_with(StorageConfig::default);
            storage.database_path = Some(path);
        }

        // Logging
        if let Ok(level) = env::var("ENGAGER_LOG_LEVEL") {
            let logging = self.logging.get_or_insert_with(LoggingConfig::default);
            logging.level = Some(level);
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.platform.base_url.is_empty() {
            return Err(ConfigError::MissingRequired(
                "platform.base_url or ENGAGER_PLATFORM_BASE_URL".to_string(),
            ));
        }

        let base_url = Url::parse(&self.platform.base_url).map_err(|e| {
            ConfigError::InvalidValue(format!("platform.base_url is not a valid URL: {e}"))
        })?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(ConfigError::InvalidValue(
                "platform.base_url must use http or https".to_string(),
            ));
        }

        if self.platform.access_token.is_empty() {
            return Err(ConfigError::MissingRequired(
                "platform.access_token or ENGAGER_PLATFORM_ACCESS_TOKEN".to_string(),
            ));
        }

        if self.bot.hashtags.is_empty() {
            return Err(ConfigError::InvalidValue(
                "bot.hashtags must contain at least one hashtag".to_string(),
            ));
        }

        if self.bot.tag_media_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "bot.tag_media_limit must be greater than zero".to_string(),
            ));
        }

        if let Some(ref retry) = self.retry {
            if retry.max_fails == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "retry.max_fails must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            platform: PlatformConfig {
                base_url: "https://platform.example".to_string(),
                access_token: "token".to_string(),
                timeout_secs: 30,
            },
            bot: BotConfig::default(),
            retry: None,
            storage: None,
            logging: None,
        }
    }

    #[test]
    fn test_config_defaults() {
        let bot = BotConfig::default();
        assert!(!bot.likes_enabled);
        assert!(!bot.comments_enabled);
        assert!(!bot.following_enabled);
        assert_eq!(bot.hashtags.len(), 15);
        assert!(bot.hashtags.contains(&"follow4like".to_string()));
        assert_eq!(bot.tag_media_limit, 20);

        let retry = RetryConfig::default();
        assert_eq!(retry.max_fails, Some(15));
        assert_eq!(retry.backoff_secs, Some(240));
        assert_eq!(retry.max_transport_retries, Some(15));

        let logging = LoggingConfig::default();
        assert_eq!(logging.level, Some("info".to_string()));
    }

    #[test]
    fn test_config_validation_missing_required() {
        let mut config = create_test_config();
        config.platform.base_url = String::new();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("platform.base_url"));

        let mut config = create_test_config();
        config.platform.access_token = String::new();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("platform.access_token"));
    }

    #[test]
    fn test_config_validation_rejects_bad_url() {
        let mut config = create_test_config();
        config.platform.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.platform.base_url = "ftp://platform.example".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("http or https"));
    }

    #[test]
    fn test_config_validation_rejects_zero_limits() {
        let mut config = create_test_config();
        config.bot.hashtags.clear();
        assert!(config.validate().is_err());

        let mut config = create_test_config();
        config.retry = Some(RetryConfig {
            max_fails: Some(0),
            backoff_secs: None,
            max_transport_retries: None,
        });
        assert!(config.validate().unwrap_err().to_string().contains("max_fails"));
    }

    #[test]
    fn test_absent_flags_default_to_false() {
        let toml_content = r#"
[platform]
base_url = "https://platform.example"
access_token = "secret"

[bot]
likes_enabled = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.bot.likes_enabled);
        assert!(!config.bot.comments_enabled);
        assert!(!config.bot.following_enabled);
        assert_eq!(config.bot.hashtags, default_hashtags());
    }

    #[test]
    fn test_toml_parsing() {
        let toml_content = r#"
[platform]
base_url = "https://platform.example/api"
access_token = "secret"
timeout_secs = 10

[bot]
likes_enabled = true
comments_enabled = true
following_enabled = false
hashtags = ["rustlang", "ferris"]
tag_media_limit = 12
seed = 42

[retry]
max_fails = 5
backoff_secs = 60

[storage]
database_path = "/tmp/engager.db"

[logging]
level = "debug"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();

        assert_eq!(config.platform.base_url, "https://platform.example/api");
        assert_eq!(config.platform.timeout_secs, 10);
        assert!(config.bot.comments_enabled);
        assert_eq!(config.bot.hashtags, vec!["rustlang", "ferris"]);
        assert_eq!(config.bot.tag_media_limit, 12);
        assert_eq!(config.bot.seed, Some(42));
        assert_eq!(config.retry().max_fails, Some(5));
        assert_eq!(config.retry().backoff_secs, Some(60));
        assert_eq!(config.retry().max_transport_retries, None);
        assert_eq!(
            config.storage().database_path,
            Some("/tmp/engager.db".to_string())
        );
        assert_eq!(config.logging().level, Some("debug".to_string()));
    }

    #[test]
    fn test_parse_env_reports_variable_name() {
        let err = parse_env::<bool>("ENGAGER_LIKES_ENABLED", "maybe", "true or false")
            .unwrap_err();
        assert!(err.to_string().contains("ENGAGER_LIKES_ENABLED"));

        let value: u64 = parse_env("ENGAGER_SEED", " 7 ", "a valid number").unwrap();
        assert_eq!(value, 7);
    }
}
