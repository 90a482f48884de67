// ABOUTME: Configuration loading and validation for floatchat
// ABOUTME: Typed widget options with defaults, endpoint settings, TOML with env expansion

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub widget: WidgetConfig,
    pub endpoint: EndpointConfig,
}

/// Screen corner the widget is anchored to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Modern,
    Minimal,
    Rounded,
}

/// What happens to attachments refused by staging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationPolicy {
    /// Drop refused files, log at debug level.
    #[default]
    Silent,
    /// Drop refused files and publish a non-fatal warning to the host.
    Warn,
}

/// Named delays used by the session, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Open animation; input focus is requested when it ends
    pub open_delay_ms: u64,
    /// Close animation; the widget is `Closed` when it ends
    pub close_delay_ms: u64,
    /// Simulated latency before a default-option prompt appears
    pub prompt_delay_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            open_delay_ms: 300,
            close_delay_ms: 200,
            prompt_delay_ms: 500,
        }
    }
}

impl Timings {
    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }

    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }
}

/// Options the host supplies when constructing a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub title: String,
    pub subtitle: String,
    pub position: Position,
    pub primary_color: String,
    pub icon_size: u32,
    pub theme: Theme,
    /// Largest accepted attachment, in bytes
    pub max_file_size: u64,
    /// MIME patterns; `*/*` allows everything, `image/*` matches by prefix
    pub allowed_file_types: Vec<String>,
    /// Transcript cap; oldest entries are evicted first
    pub max_messages: usize,
    pub welcome_message: String,
    /// Whether attachment input starts enabled (the server toggles it later)
    pub attachments_enabled: bool,
    pub validation: ValidationPolicy,
    pub timings: Timings,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            title: "AI Assistant".to_string(),
            subtitle: "We're here to help!".to_string(),
            position: Position::default(),
            primary_color: "#6366f1".to_string(),
            icon_size: 60,
            theme: Theme::default(),
            max_file_size: 10 * 1024 * 1024,
            allowed_file_types: vec!["*/*".to_string()],
            max_messages: 100,
            welcome_message: "👋 Hi there! How can I help you today?".to_string(),
            attachments_enabled: false,
            validation: ValidationPolicy::default(),
            timings: Timings::default(),
        }
    }
}

impl WidgetConfig {
    /// Validate once at construction so nothing downstream re-checks.
    pub fn validate(&self) -> Result<()> {
        if self.max_messages == 0 {
            return Err(ConfigError::Invalid(
                "widget.max_messages must be at least 1".into(),
            ));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid(
                "widget.max_file_size must be greater than 0".into(),
            ));
        }
        if self.allowed_file_types.is_empty() {
            return Err(ConfigError::Invalid(
                "widget.allowed_file_types must not be empty (use \"*/*\" to allow all)".into(),
            ));
        }
        if let Some(bad) = self
            .allowed_file_types
            .iter()
            .find(|pattern| !is_mime_pattern(pattern))
        {
            return Err(ConfigError::Invalid(format!(
                "widget.allowed_file_types entry {:?} is not a type/subtype pattern",
                bad
            )));
        }
        if !is_hex_color(&self.primary_color) {
            return Err(ConfigError::Invalid(format!(
                "widget.primary_color {:?} must be a #rgb or #rrggbb color",
                self.primary_color
            )));
        }
        if self.icon_size == 0 {
            return Err(ConfigError::Invalid(
                "widget.icon_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn is_mime_pattern(pattern: &str) -> bool {
    match pattern.split_once('/') {
        Some((kind, sub)) => !kind.is_empty() && !sub.is_empty() && !sub.contains('/'),
        None => false,
    }
}

fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Remote assistant endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL; `/chat` and `/products/...` are appended
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Total attempts for transient failures (1 disables retries)
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:7166/api".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            retry_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint.base_url is required".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint.base_url {:?} must start with http:// or https://",
                self.base_url
            )));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "endpoint.retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory for floatchat (~/.config/floatchat)
    pub fn config_dir() -> PathBuf {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(dirs::config_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("floatchat")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the given path, or the default location if it exists.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit path is an error.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::config_path();
                if path.exists() {
                    Self::load_from(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse TOML after expanding `${VAR}` references.
    pub fn parse(contents: &str) -> Result<Self> {
        let contents = shellexpand::env_with_context_no_errors(contents, |var: &str| {
            match std::env::var(var) {
                Ok(val) => Some(val),
                Err(_) => {
                    warn!(
                        variable = %var,
                        "Environment variable not defined, using empty string"
                    );
                    Some(String::new())
                }
            }
        });

        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.widget.validate()?;
        self.endpoint.validate()
    }

    /// Commented template written by `floatchat init`
    pub fn default_toml() -> String {
        r##"# floatchat configuration
# Location: ~/.config/floatchat/config.toml

[widget]
title = "AI Assistant"
subtitle = "We're here to help!"
# position = "bottom-right"   # bottom-left, top-right, top-left
# primary_color = "#6366f1"
# theme = "modern"            # minimal, rounded
# max_file_size = 10485760
# allowed_file_types = ["*/*"]
# max_messages = 100
# attachments_enabled = false
# validation = "silent"       # warn

[widget.timings]
# open_delay_ms = 300
# close_delay_ms = 200
# prompt_delay_ms = 500

[endpoint]
base_url = "https://localhost:7166/api"
# timeout_secs = 30
# connect_timeout_secs = 10
# retry_attempts = 3
# retry_backoff_ms = 500
"##
        .to_string()
    }
}
