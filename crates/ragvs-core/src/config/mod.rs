mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

impl Config {
    /// Load configuration from a TOML file with env var overrides, then validate it.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rag.max_chars == 0 {
            bail!("rag.max_chars must be greater than 0");
        }
        if self.rag.retrieve_limit == 0 {
            bail!("rag.retrieve_limit must be greater than 0");
        }
        if self.rag.num_candidates < self.rag.retrieve_limit {
            bail!(
                "rag.num_candidates ({}) must be at least rag.retrieve_limit ({})",
                self.rag.num_candidates,
                self.rag.retrieve_limit
            );
        }
        if !(0.0..=1.0).contains(&self.rag.route_threshold) {
            bail!(
                "rag.route_threshold must be within [0, 1], got {}",
                self.rag.route_threshold
            );
        }
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if self.llm.embedding_model.trim().is_empty() {
            bail!("llm.embedding_model must not be empty");
        }
        Ok(())
    }
}
