//! Runtime configuration for the fetch adapter.
//!
//! The API credential comes from the deployment environment and is never
//! hard-coded. It is redacted from `Debug` output so it cannot end up in logs.

use crate::error::{FetcherError, Result};
use std::fmt;
use std::time::Duration;

/// Default Elsevier API host
pub const DEFAULT_BASE_URL: &str = "https://api.elsevier.com";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variables checked for the credential, in order
const API_KEY_VARS: &[&str] = &["SCIENCEDIRECT_API_KEY", "ELSEVIER_API_KEY"];

const BASE_URL_VAR: &str = "SCIENCEDIRECT_BASE_URL";
const TIMEOUT_VAR: &str = "SCIENCEDIRECT_TIMEOUT_SECS";

/// Settings for [`crate::sciencedirect::ScienceDirectClient`]
#[derive(Clone)]
pub struct FetcherConfig {
    /// API credential, sent as `apiKey`
    pub api_key: Option<String>,
    /// Scheme and host of the search API, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl FetcherConfig {
    /// Read configuration from the process environment.
    ///
    /// A missing credential is not an error; upstream answers unauthorized.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());

        let base_url = lookup(BASE_URL_VAR)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    FetcherError::Config(format!("{} must be a whole number of seconds", TIMEOUT_VAR))
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            api_key,
            base_url,
            timeout,
        })
    }

    /// Same configuration pointed at another host (used by tests and mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for FetcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
