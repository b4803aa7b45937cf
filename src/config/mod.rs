mod types;

pub use types::*;

use crate::{Error, Result};
use std::{env, path::Path};
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Loads the configuration file (if any), applies environment overrides and
/// validates the result.
pub async fn load() -> Result<Config> {
    let explicit_path = env::var("CONFIG_PATH").ok();
    let mut config = read_config_file(explicit_path.as_deref()).await?;

    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    config.validate()?;

    Ok(config)
}

/// Reads `path`, or `config.yaml` when no path was given. Only the implicit
/// default may be absent.
pub async fn read_config_file(path: Option<&str>) -> Result<Config> {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    if path.is_none() && !Path::new(config_path).exists() {
        debug!("No {} found, using built-in defaults", config_path);
        return Ok(Config::default());
    }

    debug!("Loading configuration from: {}", config_path);

    let config_str = tokio::fs::read_to_string(config_path).await.map_err(|e| {
        Error::config(format!("Failed to read config file '{}': {}", config_path, e))
    })?;
    parse(&config_str)
}

pub fn parse(config_str: &str) -> Result<Config> {
    // An empty document deserializes as unit, not as an empty mapping.
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(config_str)?)
}

/// Overlays environment variables on top of the file configuration.
///
/// The API key comes from `LLM_API_KEY` first, then from the provider's
/// conventional variable, and only then from the file.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = lookup("HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("Invalid PORT value: '{}'", port)))?;
    }
    if let Some(provider) = lookup("LLM_PROVIDER") {
        config.llm.provider = provider.parse()?;
    }
    if let Some(model) = lookup("LLM_MODEL") {
        config.llm.model = model;
    }
    if let Some(base_url) = lookup("LLM_BASE_URL") {
        config.llm.base_url = Some(base_url);
    }
    if let Some(api_key) =
        lookup("LLM_API_KEY").or_else(|| lookup(config.llm.provider.api_key_env()))
    {
        config.llm.api_key = api_key;
    }

    Ok(())
}
