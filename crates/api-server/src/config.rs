use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ability_estimator::CourseWeighting;
use anyhow::{bail, Context, Result};
use context_client::ContextConfig;

/// Server settings, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub models_path: PathBuf,
    pub catalog_path: PathBuf,
    /// Empty means any origin
    pub cors_origins: Vec<String>,
    pub json_logs: bool,
    pub ability_weighting: CourseWeighting,
    pub context: ContextConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let bind_addr = var("BIND_ADDR", "0.0.0.0:8000")
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let ability_weighting = match var("ABILITY_WEIGHTING", "uniform").to_lowercase().as_str() {
            "uniform" => CourseWeighting::Uniform,
            "typicality" => CourseWeighting::Typicality,
            other => bail!("ABILITY_WEIGHTING must be 'uniform' or 'typicality', got '{}'", other),
        };

        let timeout_secs: u64 = var("CONTEXT_TIMEOUT_SECS", "10")
            .parse()
            .context("CONTEXT_TIMEOUT_SECS must be a whole number of seconds")?;
        if timeout_secs == 0 {
            bail!("CONTEXT_TIMEOUT_SECS must be greater than zero");
        }

        let defaults = ContextConfig::default();
        let context = ContextConfig {
            api_url: lookup("CONTEXT_API_URL").unwrap_or(defaults.api_url),
            model: lookup("CONTEXT_MODEL").unwrap_or(defaults.model),
            api_key: lookup("GROQ_API_KEY").filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            bind_addr,
            models_path: PathBuf::from(var("MODELS_PATH", "models/registry.json")),
            catalog_path: PathBuf::from(var("CATALOG_PATH", "data/catalog.json")),
            cors_origins,
            json_logs: lookup("RUST_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            ability_weighting,
            context,
        })
    }
}
