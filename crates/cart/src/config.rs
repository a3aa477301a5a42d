//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CART_STORAGE_DIR` - Directory for persisted carts (default: .cartwheel)
//! - `CART_STORAGE_KEY` - Storage slot for the cart (default: cart-storage)
//! - `CART_BACKEND_URL` - Base URL of the product/inventory/order services
//! - `CART_BACKEND_TOKEN` - Bearer token for the backend services
//! - `CART_PRODUCT_CACHE_TTL_SECS` - Product cache lifetime (default: 300)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_DIR: &str = ".cartwheel";
const DEFAULT_STORAGE_KEY: &str = "cart-storage";
const DEFAULT_PRODUCT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Where the cart is persisted
    pub storage: StorageConfig,
    /// Backend services, if configured
    pub backend: Option<BackendConfig>,
}

/// Location of the persisted cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Backend services configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL the service paths are appended to
    pub base_url: Url,
    /// Bearer token sent with every request
    pub api_token: Option<SecretString>,
    /// How long fetched products are cached
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let storage = StorageConfig {
            dir: PathBuf::from(env.get_or_default("CART_STORAGE_DIR", DEFAULT_STORAGE_DIR)),
            key: env.get_or_default("CART_STORAGE_KEY", DEFAULT_STORAGE_KEY),
        };

        let backend = match env.get_optional("CART_BACKEND_URL") {
            Some(raw) => Some(BackendConfig::from_parts(&env, &raw)?),
            None => None,
        };

        Ok(Self { storage, backend })
    }

    /// Backend configuration, or an error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no backend URL was configured.
    pub fn require_backend(&self) -> Result<&BackendConfig, ConfigError> {
        self.backend
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CART_BACKEND_URL".to_string()))
    }
}

impl BackendConfig {
    fn from_parts<F>(env: &Env<F>, raw_url: &str) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = Url::parse(raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CART_BACKEND_URL".to_string(), e.to_string())
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_BACKEND_URL".to_string(),
                "must be a hierarchical URL such as http://host/api".to_string(),
            ));
        }

        let ttl_var = "CART_PRODUCT_CACHE_TTL_SECS";
        let ttl_secs = env
            .get_or_default(ttl_var, DEFAULT_PRODUCT_CACHE_TTL_SECS)
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(ttl_var.to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            api_token: env
                .get_optional("CART_BACKEND_TOKEN")
                .filter(|token| !token.is_empty())
                .map(SecretString::from),
            product_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable; empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.into())
    }
}
