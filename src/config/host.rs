//! Host-level configuration and startup validation.

use super::Settings;
use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Section holding named connection strings.
pub const CONNECTION_STRINGS_SECTION: &str = "ConnectionStrings";
/// Key naming the secret store.
pub const KEY_VAULT_NAME_KEY: &str = "KeyVault:Name";
/// Key toggling startup validation.
pub const VALIDATE_ON_STARTUP_KEY: &str = "Host:ValidateOnStartup";
/// Key overriding the request body limit.
pub const MAX_BODY_SIZE_KEY: &str = "Host:MaxBodySize";

/// Configuration for the dispatch host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Environment values copied into every invocation context.
    pub env: HashMap<String, String>,
    /// Whether [`HostConfig::validate`] rejects bad configuration.
    pub validate_on_startup: bool,
    /// Secret store name, validated but never contacted.
    pub key_vault_name: Option<String>,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            validate_on_startup: true,
            key_vault_name: None,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl HostConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read host switches from settings, keeping defaults for absent keys.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut config = Self::default();
        if let Some(validate) = settings.get_bool(VALIDATE_ON_STARTUP_KEY)? {
            config.validate_on_startup = validate;
        }
        config.key_vault_name = settings.get_non_empty(KEY_VAULT_NAME_KEY).map(str::to_string);
        if let Some(raw) = settings.get_non_empty(MAX_BODY_SIZE_KEY) {
            config.max_body_size = raw.parse().map_err(|_| {
                DispatchError::config(MAX_BODY_SIZE_KEY, format!("'{raw}' is not a byte count"))
            })?;
        }
        Ok(config)
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Enable or disable startup validation.
    pub fn validate_on_startup(mut self, validate: bool) -> Self {
        self.validate_on_startup = validate;
        self
    }

    /// Set the secret store name.
    pub fn key_vault_name(mut self, name: impl Into<String>) -> Self {
        self.key_vault_name = Some(name.into());
        self
    }

    /// Set the maximum request body size.
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Check connection strings and the secret store name.
    ///
    /// Fails on the first invalid value unless validation is disabled, in
    /// which case problems are only logged.
    pub fn validate(&self, settings: &Settings) -> Result<()> {
        let mut problems = Vec::new();

        for (name, value) in settings.children(CONNECTION_STRINGS_SECTION) {
            if let Err(reason) = check_connection_string(value) {
                problems.push(DispatchError::config(
                    format!("{CONNECTION_STRINGS_SECTION}:{name}"),
                    reason,
                ));
            }
        }

        if let Some(name) = &self.key_vault_name {
            match check_key_vault_name(name) {
                // Secret resolution is left to the host.
                Ok(()) => info!(key_vault = %name, "key vault configured"),
                Err(reason) => problems.push(DispatchError::config(KEY_VAULT_NAME_KEY, reason)),
            }
        }

        if !self.validate_on_startup {
            for problem in &problems {
                warn!(error = %problem, "configuration problem ignored; validation disabled");
            }
            return Ok(());
        }

        match problems.into_iter().next() {
            Some(problem) => Err(problem),
            None => Ok(()),
        }
    }
}

/// A connection string is a `;`-separated list of `Key=Value` pairs.
fn check_connection_string(value: &str) -> std::result::Result<(), String> {
    let segments: Vec<&str> = value
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.is_empty() {
        return Err("connection string is empty".to_string());
    }

    for segment in segments {
        match segment.split_once('=') {
            Some((key, _)) if !key.trim().is_empty() => {}
            _ => return Err(format!("segment '{segment}' is not a Key=Value pair")),
        }
    }
    Ok(())
}

/// 3-24 ASCII alphanumerics or hyphens, starting with a letter, with no
/// trailing or doubled hyphen.
fn check_key_vault_name(name: &str) -> std::result::Result<(), String> {
    if !(3..=24).contains(&name.len()) {
        return Err(format!("'{name}' must be 3-24 characters long"));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(format!("'{name}' must start with a letter"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!("'{name}' may only contain letters, digits and hyphens"));
    }
    if name.ends_with('-') || name.contains("--") {
        return Err(format!("'{name}' must not end with or repeat a hyphen"));
    }
    Ok(())
}
