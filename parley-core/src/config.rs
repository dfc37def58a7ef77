//! Client configuration management

use crate::error::ParleyResult;
use crate::types::ClientConfig;

use std::path::Path;

impl Default for ClientConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|home| home.join(".parley").to_string_lossy().into_owned())
            .unwrap_or_else(|| ".parley".to_string());

        Self {
            server_url: "http://localhost:8080".to_string(),
            data_dir,
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ParleyResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::config_error!("Failed to read config file", "config", e))?;

        let config: ClientConfig = toml::from_str(&content)
            .map_err(|e| crate::config_error!("Failed to parse config", "config", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ParleyResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::config_error!("Failed to serialize config", "config", e))?;

        std::fs::write(path, content)
            .map_err(|e| crate::config_error!("Failed to write config file", "config", e))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ParleyResult<()> {
        if self.server_url.is_empty() {
            return Err(crate::validation_error!(
                "server_url must not be empty",
                "server_url",
                "config"
            ));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(crate::validation_error!(
                "server_url must be an http(s) URL",
                "server_url",
                "config"
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(crate::validation_error!(
                "request_timeout_secs must be greater than 0",
                "request_timeout_secs",
                "config"
            ));
        }

        Ok(())
    }
}
