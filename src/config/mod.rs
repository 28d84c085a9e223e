use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Backend used when neither the config file nor `--server` names one
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// A selectable conversion target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audience {
    pub value: String,  // Sent to the backend as `target`
    pub label: String,  // Shown in the selector
}

impl Audience {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// How the inline error panel is drawn in the output box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPanelStyle {
    #[default]
    Bordered,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the conversion backend
    pub server: String,

    /// Targets offered in the audience selector, in display order
    pub audiences: Vec<Audience>,

    /// Audience value selected at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_audience: Option<String>,

    /// Soft character limit shown by the counter
    pub max_chars: usize,

    /// How long a toast stays on screen
    pub toast_millis: u64,

    /// Also raise toasts as desktop notifications
    pub notifications: bool,

    /// Timeout for the conversion request (transport default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    pub error_panel: ErrorPanelStyle,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            audiences: default_audiences(),
            default_audience: None,
            max_chars: 500,
            toast_millis: 3000,
            notifications: false,
            request_timeout_secs: None,
            error_panel: ErrorPanelStyle::default(),
        }
    }
}

fn default_audiences() -> Vec<Audience> {
    vec![
        Audience::new("Upward", "Boss"),
        Audience::new("Lateral", "Colleague"),
        Audience::new("External", "Customer"),
    ]
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("biztone");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match Self::parse(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse config: {:#}", e),
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
            // Keep the user's broken file around instead of overwriting it
            return Ok(AppConfig::default());
        }

        let config = AppConfig::default();
        if let Err(e) = config.save() {
            tracing::warn!("Failed to write default config: {:#}", e);
        }
        Ok(config)
    }

    /// Parse and normalize a config document
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(content).context("invalid config.toml")?;
        config.normalize();
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Repair values the UI cannot work with
    fn normalize(&mut self) {
        // Blank values cannot be sent as a target
        self.audiences.retain(|a| !a.value.trim().is_empty());
        if self.audiences.is_empty() {
            self.audiences = default_audiences();
        }
        for audience in &mut self.audiences {
            if audience.label.trim().is_empty() {
                audience.label = audience.value.clone();
            }
        }

        if self.default_audience.as_ref().map(|s| s.is_empty()).unwrap_or(false) {
            self.default_audience = None;
        }

        if self.max_chars == 0 {
            self.max_chars = 500;
        }

        let trimmed = self.server.trim().trim_end_matches('/');
        self.server = if trimmed.is_empty() {
            DEFAULT_SERVER.to_string()
        } else {
            trimmed.to_string()
        };
    }

    /// Index of the audience selected at startup
    pub fn initial_audience(&self) -> usize {
        self.default_audience
            .as_ref()
            .and_then(|value| self.audiences.iter().position(|a| &a.value == value))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            server: "https://tone.example.com".to_string(),
            audiences: vec![Audience::new("boss", "Boss"), Audience::new("customer", "Customer")],
            default_audience: Some("customer".to_string()),
            max_chars: 300,
            toast_millis: 2000,
            notifications: true,
            request_timeout_secs: Some(20),
            error_panel: ErrorPanelStyle::Compact,
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized = AppConfig::parse(&serialized).unwrap();

        assert_eq!(config.audiences, deserialized.audiences);
        assert_eq!(config.default_audience, deserialized.default_audience);
        assert_eq!(deserialized.toast_millis, 2000);
        assert_eq!(deserialized.error_panel, ErrorPanelStyle::Compact);
        assert_eq!(deserialized.request_timeout_secs, Some(20));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = AppConfig::parse("notifications = true\n").unwrap();
        assert!(config.notifications);
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.max_chars, 500);
        assert_eq!(config.toast_millis, 3000);
        assert_eq!(config.audiences.len(), 3);
        assert_eq!(config.audiences[0].value, "Upward");
    }

    #[test]
    fn test_normalize_repairs_bad_values() {
        let config = AppConfig::parse(
            r#"
server = "  http://localhost:8080/ "
max_chars = 0
default_audience = ""

[[audiences]]
value = " "
label = "Nobody"

[[audiences]]
value = "team"
label = ""
"#,
        )
        .unwrap();

        assert_eq!(config.server, "http://localhost:8080");
        assert_eq!(config.max_chars, 500);
        assert_eq!(config.default_audience, None);
        assert_eq!(config.audiences, vec![Audience::new("team", "team")]);
    }

    #[test]
    fn test_initial_audience() {
        let mut config = AppConfig::default();
        assert_eq!(config.initial_audience(), 0);

        config.default_audience = Some("External".to_string());
        assert_eq!(config.initial_audience(), 2);

        config.default_audience = Some("Sideways".to_string());
        assert_eq!(config.initial_audience(), 0);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(AppConfig::parse("max_chars = \"many\"").is_err());
    }
}
