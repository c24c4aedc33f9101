//! Configuration Management
//!
//! Handles persistent configuration storage for mqctl and loading of
//! desired-state declaration files.

use crate::broker::DesiredState;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Region used when nothing else is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API endpoint override (gateway or emulator)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Bearer token sent to the endpoint
    #[serde(default)]
    pub token: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mqctl").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Get effective region (config > AWS environment > default)
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Get effective endpoint for a region (config > regional default)
    ///
    /// The client speaks PascalCase bodies with bearer auth, so the endpoint
    /// is expected to be a gateway or emulator translating to the provider
    /// API. The bare regional endpoint expects camelCase members and SigV4
    /// signing; against it listings come back empty.
    pub fn effective_endpoint(&self, region: &str) -> Result<String> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let endpoint = format!("https://mq.{}.amazonaws.com", region);
                tracing::warn!(
                    "No endpoint configured, falling back to {}; a translating gateway is expected",
                    endpoint
                );
                endpoint
            }
        };

        url::Url::parse(&endpoint).with_context(|| format!("Invalid endpoint '{}'", endpoint))?;
        Ok(endpoint)
    }

    /// Overwrite the given fields and save
    pub fn update(
        &mut self,
        endpoint: Option<String>,
        region: Option<String>,
        token: Option<String>,
    ) -> Result<()> {
        if endpoint.is_some() {
            self.endpoint = endpoint;
        }
        if region.is_some() {
            self.region = region;
        }
        if token.is_some() {
            self.token = token;
        }
        self.save()
    }
}

/// Parse a desired-state declaration (YAML or JSON)
pub fn parse_desired_state(content: &str) -> Result<DesiredState> {
    let value: Value = serde_yaml::from_str(content).context("Failed to parse desired state")?;

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(DesiredState::new()),
        _ => Err(anyhow::anyhow!("Desired state must be a mapping of parameters")),
    }
}

/// Load a desired-state declaration file
pub fn load_desired_state(path: &Path) -> Result<DesiredState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_desired_state(&content)
}
