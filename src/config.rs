//! Configuration for the provider, failover policy and HTTP listener

use std::path::Path;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Models tried in order, fastest first.
pub const DEFAULT_CANDIDATES: &[&str] = &[
  "gemini-2.0-flash"
, "gemini-2.0-flash-lite"
, "gemini-1.5-flash"
, "gemini-1.5-flash-8b"
];

pub const DEFAULT_PORT: u16 = 8001;

/// Provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig
{   /// Credential sent with every provider call
    pub api_key: Option<String>
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Request timeout in seconds, none means the provider decides
    pub timeout_secs: Option<u64>
}

/// Failover configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig
{   /// Candidate model identifiers, in priority order
    pub candidates: Vec<String>
  , /// Pause after an ordinary failure, in milliseconds
    pub short_backoff_ms: u64
  , /// Pause after a quota or rate-limit failure, in milliseconds
    pub long_backoff_ms: u64
  , /// Answer with the fallback query instead of a 500 when
    /// every candidate fails
    pub mask_failures: bool
}

impl Default for FailoverConfig
{   fn default() -> Self
    {   FailoverConfig
        {   candidates: DEFAULT_CANDIDATES
              .iter()
              .map(|m| m.to_string())
              .collect()
          , short_backoff_ms: 1000
          , long_backoff_ms: 5000
          , mask_failures: true
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig
{   pub host: String
  , pub port: u16
}

impl Default for ServerConfig
{   fn default() -> Self
    {   ServerConfig
        {   host: "0.0.0.0".to_string()
          , port: DEFAULT_PORT
        }
    }
}

impl ServerConfig
{   pub fn bind_addr(&self) -> String
    {   format!("{}:{}", self.host, self.port)
    }
}

/// sqlrelay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig
{   pub provider: ProviderConfig
  , pub failover: FailoverConfig
  , pub server: ServerConfig
}

impl RelayConfig
{   /// Load a configuration file, missing sections keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>)
      -> Result<Self, crate::error::Error>
    {   let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })
    }

    /// Defaults, then the file named by `SQLRELAY_CONFIG`, then
    /// environment overrides
    pub fn from_env() -> Result<Self, crate::error::Error>
    {   let mut config = match std::env::var("SQLRELAY_CONFIG")
        {   Ok(path) => RelayConfig::from_json_file(path)?
          , Err(_) => RelayConfig::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
      -> Result<(), crate::error::Error>
    where
      F: Fn(&str) -> Option<String>
    {   let non_empty = |key: &str| {
          lookup(key).filter(|v| !v.trim().is_empty())
        };

        if let Some(key) = non_empty("GEMINI_API_KEY")
          .or_else(|| non_empty("GOOGLE_API_KEY"))
        {   self.provider.api_key = Some(key);
        }
        if let Some(base) = non_empty("GEMINI_API_BASE")
        {   self.provider.api_base = Some(base);
        }
        if let Some(host) = non_empty("HOST")
        {   self.server.host = host;
        }
        if let Some(port) = non_empty("PORT")
        {   self.server.port = port.trim().parse().map_err(|_| {
              crate::error::Error::InvalidConfiguration(
                format!("PORT is not a valid port: {}", port)
              )
            })?;
        }
        if let Some(models) = non_empty("SQLRELAY_MODELS")
        {   self.failover.candidates = models
              .split(',')
              .map(|m| m.trim().to_string())
              .filter(|m| !m.is_empty())
              .collect();
            info!(
              "Candidate models overridden: {:?}",
              self.failover.candidates
            );
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), crate::error::Error>
    {   if self.failover.candidates.is_empty()
        {   return Err(crate::error::Error::InvalidConfiguration(
              "candidate model list is empty".to_string()
            ));
        }
        if self.failover.candidates.iter().any(|m| m.trim().is_empty())
        {   return Err(crate::error::Error::InvalidConfiguration(
              "candidate model names must not be blank".to_string()
            ));
        }
        if self.failover.short_backoff_ms > self.failover.long_backoff_ms
        {   return Err(crate::error::Error::InvalidConfiguration(
              "short_backoff_ms exceeds long_backoff_ms".to_string()
            ));
        }
        if self.provider.api_key.is_none()
        {   warn!(
              "No GEMINI_API_KEY configured, every request will be \
               answered with the fallback query"
            );
        }
        Ok(())
    }
}
