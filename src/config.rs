use std::fmt;
use std::str::FromStr;

use envconfig::Envconfig;

use crate::upstash::DEFAULT_GROUPS_KEY;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Upstash,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Backend::Memory),
            "upstash" => Ok(Backend::Upstash),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::Upstash => write!(f, "upstash"),
        }
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(from = "HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "PORT", default = "3001")]
    pub port: u16,

    #[envconfig(from = "STORE_BACKEND", default = "memory")]
    pub backend: Backend,

    #[envconfig(from = "UPSTASH_REDIS_REST_URL")]
    pub upstash_url: Option<String>,

    #[envconfig(from = "UPSTASH_REDIS_REST_TOKEN")]
    pub upstash_token: Option<String>,

    #[envconfig(from = "GROUPS_KEY")]
    pub groups_key: Option<String>,

    #[envconfig(from = "API_BASE")]
    pub api_base: Option<String>,
}

impl Config {
    /// Path the group routes are mounted under.
    pub fn api_base(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => match self.backend {
                Backend::Memory => "/api".to_string(),
                Backend::Upstash => "/api/expense".to_string(),
            },
        }
    }

    /// Endpoint and token for the Upstash backend.
    pub fn upstash_credentials(&self) -> anyhow::Result<(String, String)> {
        match (&self.upstash_url, &self.upstash_token) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => {
                Ok((url.clone(), token.clone()))
            }
            _ => anyhow::bail!(
                "UPSTASH_REDIS_REST_URL and UPSTASH_REDIS_REST_TOKEN must be set for the upstash backend"
            ),
        }
    }

    /// Storage key of the collection document; `DEFAULT_GROUPS_KEY` unless overridden.
    pub fn groups_key(&self) -> &str {
        self.groups_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(DEFAULT_GROUPS_KEY)
    }
}
