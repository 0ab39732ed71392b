use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use certwatch_notify::{ExpiryTemplates, TemplateRenderer, Viewer};

/// Per-user CLI settings loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Viewer used by `list` / `unread` / `status` when no flags are given.
    #[serde(default)]
    pub viewer: Option<ViewerConfig>,

    /// Minijinja template overrides for expiry alerts.
    #[serde(default)]
    pub templates: TemplateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    pub username: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub expiry_title: Option<String>,
    pub expiry_message: Option<String>,
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/certwatch/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("certwatch");
        Ok(config_dir)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Returns default config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if !config_path.exists() {
            debug!(?config_path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        debug!(?config_path, "Loading config");
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", config_path.display()))
    }

    /// Resolve the viewer. Flags win over the config file; both fields are
    /// needed for a viewer to exist.
    pub fn resolve_viewer(&self, user: Option<&str>, role: Option<&str>) -> Option<Viewer> {
        let configured = self.viewer.as_ref();
        let username = user
            .map(str::to_string)
            .or_else(|| configured.map(|v| v.username.clone()))?;
        let role = role
            .map(str::to_string)
            .or_else(|| configured.map(|v| v.role.clone()))?;
        Some(Viewer::new(username, role))
    }

    /// Expiry templates with any configured overrides applied. Overrides
    /// that do not parse are rejected here rather than on every alert.
    pub fn expiry_templates(&self) -> Result<ExpiryTemplates> {
        let renderer = TemplateRenderer::new();
        let mut templates = ExpiryTemplates::default();
        if let Some(ref title) = self.templates.expiry_title {
            renderer
                .validate(title)
                .context("invalid [templates] expiry_title")?;
            templates.title = title.clone();
        }
        if let Some(ref message) = self.templates.expiry_message {
            renderer
                .validate(message)
                .context("invalid [templates] expiry_message")?;
            templates.message = message.clone();
        }
        Ok(templates)
    }
}
