use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://dsp2-technical-test.iliad78.net";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Placeholder substituted into per-account endpoint templates.
pub const ACCOUNT_ID_PLACEHOLDER: &str = "{account_id}";

/// Paths of every endpoint the client talks to, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub token: String,
    pub identity: String,
    pub accounts: String,
    pub account: String,
    pub balances: String,
    pub transactions: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token: "/oauth/token".to_string(),
            identity: "/stet/identity".to_string(),
            accounts: "/stet/account".to_string(),
            account: "/stet/account/{account_id}".to_string(),
            balances: "/stet/account/{account_id}/balance".to_string(),
            transactions: "/stet/account/{account_id}/transaction".to_string(),
        }
    }
}

impl Endpoints {
    /// Read overrides from the environment; unset or empty variables keep the default.
    ///
    /// - `TOKEN_ENDPOINT`
    /// - `IDENTITY`
    /// - `ACCOUNTS`
    /// - `ACCOUNT`
    /// - `BALANCE`
    /// - `TRANSACTIONS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            token: env_or("TOKEN_ENDPOINT", defaults.token),
            identity: env_or("IDENTITY", defaults.identity),
            accounts: env_or("ACCOUNTS", defaults.accounts),
            account: env_or("ACCOUNT", defaults.account),
            balances: env_or("BALANCE", defaults.balances),
            transactions: env_or("TRANSACTIONS", defaults.transactions),
        }
    }

    pub fn account_path(&self, account_id: &str) -> String {
        self.account.replace(ACCOUNT_ID_PLACEHOLDER, account_id)
    }

    pub fn balances_path(&self, account_id: &str) -> String {
        self.balances.replace(ACCOUNT_ID_PLACEHOLDER, account_id)
    }

    pub fn transactions_path(&self, account_id: &str) -> String {
        self.transactions.replace(ACCOUNT_ID_PLACEHOLDER, account_id)
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Dsp2Config {
    pub username: Secret<String>,
    pub password: Secret<String>,
    pub base_url: String,
    pub endpoints: Endpoints,
    pub timeout_seconds: u64,
}

// Credentials never leave the process through serialization
impl Serialize for Dsp2Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Dsp2Config", 5)?;
        state.serialize_field("username", "[REDACTED]")?;
        state.serialize_field("password", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("endpoints", &self.endpoints)?;
        state.serialize_field("timeout_seconds", &self.timeout_seconds)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Dsp2Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Dsp2ConfigHelper {
            username: String,
            password: String,
            base_url: Option<String>,
            #[serde(default)]
            endpoints: Endpoints,
            timeout_seconds: Option<u64>,
        }

        let helper = Dsp2ConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            username: Secret::new(helper.username),
            password: Secret::new(helper.password),
            base_url: helper
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            endpoints: helper.endpoints,
            timeout_seconds: helper.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        })
    }
}

impl Dsp2Config {
    /// Create a configuration against the default base URL and endpoints
    #[must_use]
    pub fn new(username: String, password: String) -> Self {
        Self {
            username: Secret::new(username),
            password: Secret::new(password),
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: Endpoints::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DSP2_USERNAME`, `DSP2_PASSWORD`
    /// - `API_BASE_URL` (optional)
    /// - `DSP2_TIMEOUT_SECONDS` (optional, defaults to 30)
    /// - endpoint overrides, see [`Endpoints::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let username = env::var("DSP2_USERNAME")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("DSP2_USERNAME".to_string()))?;
        let password = env::var("DSP2_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("DSP2_PASSWORD".to_string()))?;

        let timeout_seconds = match env::var("DSP2_TIMEOUT_SECONDS") {
            Ok(raw) if !raw.is_empty() => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidConfiguration(format!(
                    "DSP2_TIMEOUT_SECONDS must be a whole number of seconds: {}",
                    e
                ))
            })?,
            _ => DEFAULT_TIMEOUT_SECONDS,
        };

        Ok(Self {
            username: Secret::new(username),
            password: Secret::new(password),
            base_url: env_or("API_BASE_URL", DEFAULT_BASE_URL.to_string()),
            endpoints: Endpoints::from_env(),
            timeout_seconds,
        })
    }

    /// Create configuration from a `.env` file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file() -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(".env")
    }

    /// Create configuration from a specific .env file path
    ///
    /// A missing file is not an error; the process environment is used as is.
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env()
    }

    /// Both username and password are non-empty
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.username.expose_secret().is_empty() && !self.password.expose_secret().is_empty()
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub const fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
