mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./talkforge.toml",
        "./config.toml",
        "~/.config/talkforge/config.toml",
        "/etc/talkforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.limits.max_concurrent_synthesis == 0 {
        anyhow::bail!("limits.max_concurrent_synthesis must be at least 1");
    }

    if config.limits.diagnostic_tail_bytes == 0 {
        anyhow::bail!("limits.diagnostic_tail_bytes must be at least 1");
    }

    let timeouts = [
        ("fetch.timeout_secs", config.fetch.timeout_secs),
        ("engine.timeout_secs", config.engine.timeout_secs),
        ("publish.timeout_secs", config.publish.timeout_secs),
        ("limits.transcode_timeout_secs", config.limits.transcode_timeout_secs),
        ("limits.enhance_timeout_secs", config.limits.enhance_timeout_secs),
    ];
    for (name, secs) in timeouts {
        if secs == 0 {
            anyhow::bail!("{} must be at least 1", name);
        }
    }

    if config.engine.output_prefix.is_empty()
        || config.engine.output_prefix.contains(['/', '\\'])
    {
        anyhow::bail!(
            "engine.output_prefix must be a plain file name prefix, got {:?}",
            config.engine.output_prefix
        );
    }

    match config.publish.backend {
        PublishBackend::Local if config.publish.local_dir.is_none() => {
            anyhow::bail!("publish.backend = \"local\" requires publish.local_dir");
        }
        PublishBackend::FileHost => {
            let endpoint = &config.publish.endpoint;
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                anyhow::bail!("publish.endpoint must be an http(s) URL, got {:?}", endpoint);
            }
        }
        PublishBackend::Local => {}
    }

    for (name, path) in config.weights.entries() {
        if !path.exists() {
            tracing::warn!("Weight path weights.{} does not exist: {:?}", name, path);
        }
    }

    Ok(())
}
