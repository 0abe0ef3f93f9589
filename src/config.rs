//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional; without any of them the store runs on its built-in catalog
//! with the advisor in demo mode.
//!
//! - `PORT` - Listen port (default: 8083)
//! - `CATALOG_URL` / `SUPABASE_URL` - REST table endpoint base
//! - `CATALOG_ANON_KEY` / `SUPABASE_ANON_KEY` - REST key
//! - `CATALOG_DATABASE_URL` - Direct Postgres catalog, preferred over REST
//! - `CATALOG_TABLE` - Source table (default: products)
//! - `CATALOG_TIMEOUT_SECS` / `CATALOG_RETRIES` / `CATALOG_BACKOFF_MS` - Fetch bounds (8 / 3 / 200)
//! - `ADVISOR_API_KEY` / `GEMINI_API_KEY` - Language-model key
//! - `ADVISOR_MODEL` - Model name (default: gemini-2.5-flash)
//! - `ADVISOR_TIMEOUT_SECS` - Advisor bound (default: 10)
//! - `POSTAL_BASE_URL` - Postal lookup base (default: ViaCEP)
//! - `POSTAL_TIMEOUT_SECS` - Postal bound (default: 5)
//! - `NATS_URL` - Fulfillment event bus
//! - `SESSION_FILE` - Persisted user-name file (default: .icrazy_session.json)
//! - `ORDER_NUMBER_START` - First order number issued (default: 10235)
//! - `SEED_DEMO_ORDERS` - Seed the dashboard demo orders (default: true)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::catalog::{RetryPolicy, DEFAULT_TABLE};
use crate::services::{advisor, postal};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where the catalog is read from.
#[derive(Clone)]
pub enum CatalogBackend {
    BuiltIn,
    Rest { base_url: String, anon_key: SecretString },
    Postgres { database_url: SecretString },
}

impl std::fmt::Debug for CatalogBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuiltIn => f.write_str("BuiltIn"),
            Self::Rest { base_url, .. } => f.debug_struct("Rest").field("base_url", base_url).field("anon_key", &"[REDACTED]").finish(),
            Self::Postgres { .. } => f.debug_struct("Postgres").field("database_url", &"[REDACTED]").finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    pub table: String,
    pub retry: RetryPolicy,
}

/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct AdvisorConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AdvisorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PostalConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub catalog: CatalogConfig,
    pub advisor: AdvisorConfig,
    pub postal: PostalConfig,
    pub nats_url: Option<String>,
    pub session_file: PathBuf,
    pub order_number_start: u64,
    pub seed_demo_orders: bool,
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a numeric or boolean variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let backend = match (env.first(&["CATALOG_DATABASE_URL"]), env.first(&["CATALOG_URL", "SUPABASE_URL"])) {
            (Some(url), _) => CatalogBackend::Postgres { database_url: SecretString::from(url) },
            (None, Some(base_url)) => CatalogBackend::Rest {
                base_url,
                anon_key: SecretString::from(env.first(&["CATALOG_ANON_KEY", "SUPABASE_ANON_KEY"]).unwrap_or_default()),
            },
            (None, None) => CatalogBackend::BuiltIn,
        };
        let defaults = RetryPolicy::default();
        let catalog = CatalogConfig {
            backend,
            table: env.first(&["CATALOG_TABLE"]).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            retry: RetryPolicy {
                attempts: env.parse("CATALOG_RETRIES", defaults.attempts)?,
                timeout: Duration::from_secs(env.parse("CATALOG_TIMEOUT_SECS", defaults.timeout.as_secs())?),
                initial_backoff: Duration::from_millis(env.parse("CATALOG_BACKOFF_MS", 200)?),
            },
        };

        let advisor = AdvisorConfig {
            api_key: env.first(&["ADVISOR_API_KEY", "GEMINI_API_KEY"]).map(SecretString::from),
            model: env.first(&["ADVISOR_MODEL"]).unwrap_or_else(|| advisor::DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(env.parse("ADVISOR_TIMEOUT_SECS", 10)?),
        };

        let postal = PostalConfig {
            base_url: env.first(&["POSTAL_BASE_URL"]).unwrap_or_else(|| postal::DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(env.parse("POSTAL_TIMEOUT_SECS", 5)?),
        };

        Ok(Self {
            port: env.parse("PORT", 8083)?,
            catalog,
            advisor,
            postal,
            nats_url: env.first(&["NATS_URL"]),
            session_file: env.first(&["SESSION_FILE"]).map_or_else(|| PathBuf::from(".icrazy_session.json"), PathBuf::from),
            order_number_start: env.parse("ORDER_NUMBER_START", 10235)?,
            seed_demo_orders: env.parse("SEED_DEMO_ORDERS", true)?,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// First non-blank value among `keys`.
    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| (self.0)(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.first(&[key]) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}
