//! Configuration module
//!
//! Server, database, storage, portal, reasoning and browser settings, read from
//! the environment (and `.env`) with defaults.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::models::link::DEFAULT_PORTAL_BASE_URL;
use crate::models::request::Credentials;
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SERVER_PORT: u16 = 8000;
const REASONING_TIMEOUT_SECS: u64 = 20;
const EVENING_OFFSET: u64 = 800_504;
const AUTH_TIMEOUT_SECS: u64 = 30;
const NAVIGATION_TIMEOUT_SECS: u64 = 30;
const CONFIRMATION_TIMEOUT_SECS: u64 = 20;
const MAX_CONCURRENT_SUBMISSIONS: usize = 2;
const TASK_RETENTION_HOURS: u64 = 24;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Which external reasoning API the reconstructor calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningProvider {
    Gemini,
    Anthropic,
}

impl FromStr for ReasoningProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(ReasoningProvider::Gemini),
            "anthropic" | "claude" => Ok(ReasoningProvider::Anthropic),
            _ => Err(anyhow::anyhow!("Invalid reasoning provider: {}", s)),
        }
    }
}

impl Display for ReasoningProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReasoningProvider::Gemini => write!(f, "gemini"),
            ReasoningProvider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: String,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct AttendanceConfig {
    pub base: BaseConfig,
    // Record store; in-memory when unset
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Artifact storage
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    // Portal and reasoning
    pub portal_base_url: String,
    pub reasoning_provider: ReasoningProvider,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub reasoning_timeout_secs: u64,
    pub evening_offset: u64,
    // Browser automation
    pub webdriver_url: String,
    pub browser_headless: bool,
    pub default_username: Option<String>,
    pub default_password: Option<String>,
    pub auth_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    pub confirmation_timeout_secs: u64,
    // Coordinator
    pub max_concurrent_submissions: usize,
    pub task_retention_hours: u64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            storage_backend: StorageBackend::Local,
            local_storage_path: "./storage".to_string(),
            local_storage_base_url: format!("http://localhost:{}/api/download", SERVER_PORT),
            portal_base_url: DEFAULT_PORTAL_BASE_URL.to_string(),
            reasoning_provider: ReasoningProvider::Gemini,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            reasoning_timeout_secs: REASONING_TIMEOUT_SECS,
            evening_offset: EVENING_OFFSET,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            browser_headless: true,
            default_username: None,
            default_password: None,
            auth_timeout_secs: AUTH_TIMEOUT_SECS,
            navigation_timeout_secs: NAVIGATION_TIMEOUT_SECS,
            confirmation_timeout_secs: CONFIRMATION_TIMEOUT_SECS,
            max_concurrent_submissions: MAX_CONCURRENT_SUBMISSIONS,
            task_retention_hours: TASK_RETENTION_HOURS,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

impl AttendanceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = AttendanceConfig::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = match env::var("APP_PORT").or_else(|_| env::var("PORT")) {
            Ok(port) => port
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("APP_PORT must be a valid number"))?,
            Err(_) => SERVER_PORT,
        };

        let base = BaseConfig {
            server_host: env::var("APP_HOST").unwrap_or(defaults.base.server_host),
            server_port,
            cors_origins,
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or(defaults.base.log_format)
                .to_lowercase(),
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.storage_backend,
        };

        let reasoning_provider = match env_opt("REASONING_PROVIDER") {
            Some(value) => value.parse()?,
            None => defaults.reasoning_provider,
        };

        let local_storage_base_url = env_opt("LOCAL_STORAGE_BASE_URL").unwrap_or_else(|| {
            format!("http://localhost:{}/api/download", base.server_port)
        });

        Ok(Self {
            base,
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or(defaults.local_storage_path),
            local_storage_base_url,
            portal_base_url: env_opt("PORTAL_BASE_URL")
                .or_else(|| env_opt("NSBM_BASE_URL"))
                .unwrap_or(defaults.portal_base_url),
            reasoning_provider,
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            gemini_model: env_opt("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_model: env_opt("ANTHROPIC_MODEL").unwrap_or(defaults.anthropic_model),
            reasoning_timeout_secs: env_or("REASONING_TIMEOUT_SECS", REASONING_TIMEOUT_SECS),
            evening_offset: env_or("EVENING_OFFSET", EVENING_OFFSET),
            webdriver_url: env_opt("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url),
            browser_headless: env_or("BROWSER_HEADLESS", true),
            default_username: env_opt("DEFAULT_USERNAME"),
            default_password: env_opt("DEFAULT_PASSWORD"),
            auth_timeout_secs: env_or("AUTH_TIMEOUT_SECS", AUTH_TIMEOUT_SECS),
            navigation_timeout_secs: env_or("NAVIGATION_TIMEOUT_SECS", NAVIGATION_TIMEOUT_SECS),
            confirmation_timeout_secs: env_or(
                "CONFIRMATION_TIMEOUT_SECS",
                CONFIRMATION_TIMEOUT_SECS,
            ),
            max_concurrent_submissions: env_or(
                "MAX_CONCURRENT_SUBMISSIONS",
                MAX_CONCURRENT_SUBMISSIONS,
            ),
            task_retention_hours: env_or("TASK_RETENTION_HOURS", TASK_RETENTION_HOURS),
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgresql://") || url.starts_with("postgres://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.reasoning_provider {
            ReasoningProvider::Gemini if self.gemini_api_key.is_none() => {
                return Err(anyhow::anyhow!(
                    "GEMINI_API_KEY must be set when REASONING_PROVIDER is gemini"
                ));
            }
            ReasoningProvider::Anthropic if self.anthropic_api_key.is_none() => {
                return Err(anyhow::anyhow!(
                    "ANTHROPIC_API_KEY must be set when REASONING_PROVIDER is anthropic"
                ));
            }
            _ => {}
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_empty() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        if self.max_concurrent_submissions == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_SUBMISSIONS must be at least 1"
            ));
        }

        if self.reasoning_timeout_secs == 0
            || self.auth_timeout_secs == 0
            || self.navigation_timeout_secs == 0
            || self.confirmation_timeout_secs == 0
        {
            return Err(anyhow::anyhow!("Stage timeouts must be greater than zero"));
        }

        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AttendanceConfig>);

impl Config {
    fn as_attendance(&self) -> &AttendanceConfig {
        &self.0
    }

    pub fn new(config: AttendanceConfig) -> Self {
        Config(Box::new(config))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.as_attendance().is_production()
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AttendanceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_attendance().validate()
    }

    pub fn server_host(&self) -> &str {
        &self.as_attendance().base.server_host
    }

    pub fn server_port(&self) -> u16 {
        self.as_attendance().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_attendance().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_attendance().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_attendance().base.log_format
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_attendance().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_attendance().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_attendance().db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_attendance().storage_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.as_attendance().local_storage_path
    }

    pub fn local_storage_base_url(&self) -> &str {
        &self.as_attendance().local_storage_base_url
    }

    pub fn portal_base_url(&self) -> &str {
        &self.as_attendance().portal_base_url
    }

    pub fn reasoning_provider(&self) -> ReasoningProvider {
        self.as_attendance().reasoning_provider
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.as_attendance().gemini_api_key.as_deref()
    }

    pub fn gemini_model(&self) -> &str {
        &self.as_attendance().gemini_model
    }

    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.as_attendance().anthropic_api_key.as_deref()
    }

    pub fn anthropic_model(&self) -> &str {
        &self.as_attendance().anthropic_model
    }

    pub fn reasoning_timeout_secs(&self) -> u64 {
        self.as_attendance().reasoning_timeout_secs
    }

    pub fn evening_offset(&self) -> u64 {
        self.as_attendance().evening_offset
    }

    pub fn webdriver_url(&self) -> &str {
        &self.as_attendance().webdriver_url
    }

    pub fn browser_headless(&self) -> bool {
        self.as_attendance().browser_headless
    }

    /// Portal credentials used when a request omits its own.
    pub fn default_credentials(&self) -> Option<Credentials> {
        let config = self.as_attendance();
        match (&config.default_username, &config.default_password) {
            (Some(username), Some(password)) => {
                Some(Credentials::new(username.clone(), password.clone()))
            }
            _ => None,
        }
    }

    pub fn auth_timeout_secs(&self) -> u64 {
        self.as_attendance().auth_timeout_secs
    }

    pub fn navigation_timeout_secs(&self) -> u64 {
        self.as_attendance().navigation_timeout_secs
    }

    pub fn confirmation_timeout_secs(&self) -> u64 {
        self.as_attendance().confirmation_timeout_secs
    }

    pub fn max_concurrent_submissions(&self) -> usize {
        self.as_attendance().max_concurrent_submissions
    }

    pub fn task_retention_hours(&self) -> u64 {
        self.as_attendance().task_retention_hours
    }
}
