//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use chrono::format::{Item, StrftimeItems};
use knowbot_core::BotConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Timestamp format used when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&paths.config_file)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> ConfigResult<()> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &PathBuf) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Knowbot Configuration
# Knowledge-grounded chat over your own documents

[llm]
# Generation backend: "ollama" or "gemini"
provider = "ollama"

# Ollama server address and chat model
host = "http://localhost:11434"
model = "llama3.2"

# Gemini endpoint and model (used when provider = "gemini")
gemini_base_url = "https://generativelanguage.googleapis.com"
gemini_model = "gemini-2.0-flash"

# Environment variable holding the Gemini API key
api_key_env = "GEMINI_API_KEY"

# Request timeout in seconds
timeout_seconds = 120

[bot]
name = "CORE_UNIT_01"
organization_name = "ACME CORP"
industry = "Technology"
custom_instructions = "Be precise, use technical jargon where appropriate, and always conclude with \"End of Transmission\"."

[scan]
# Simulated security scan duration, drawn uniformly from [min, max)
min_delay_ms = 2000
max_delay_ms = 5000

[ui]
# Enable colored output
color = true

# Date format (strftime)
date_format = "%Y-%m-%d %H:%M:%S"
"#
        .to_string()
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scan.min_delay_ms > self.scan.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "scan.min_delay_ms ({}) is greater than scan.max_delay_ms ({})",
                self.scan.min_delay_ms, self.scan.max_delay_ms
            )));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "llm.timeout_seconds must be positive".to_string(),
            ));
        }
        if StrftimeItems::new(&self.ui.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "ui.date_format is not a valid strftime pattern: {}",
                self.ui.date_format
            )));
        }
        Ok(())
    }

    /// Set a value by dotted key, e.g. `llm.model` or `bot.name`.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["llm", "provider"] => {
                self.llm.provider = LlmProvider::from_str(value).ok_or_else(|| {
                    ConfigError::Invalid(format!("unknown provider '{}'", value))
                })?;
            }
            ["llm", "host"] => self.llm.host = value.to_string(),
            ["llm", "model"] => self.llm.model = value.to_string(),
            ["llm", "gemini_base_url"] => self.llm.gemini_base_url = value.to_string(),
            ["llm", "gemini_model"] => self.llm.gemini_model = value.to_string(),
            ["llm", "api_key_env"] => self.llm.api_key_env = value.to_string(),
            ["llm", "timeout_seconds"] => {
                self.llm.timeout_seconds = parse_value(key, value)?;
            }
            ["bot", field] => {
                self.bot
                    .set_field(field, value)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
            ["scan", "min_delay_ms"] => self.scan.min_delay_ms = parse_value(key, value)?,
            ["scan", "max_delay_ms"] => self.scan.max_delay_ms = parse_value(key, value)?,
            ["ui", "color"] => self.ui.color = parse_value(key, value)?,
            ["ui", "date_format"] => self.ui.date_format = value.to_string(),
            _ => {
                return Err(ConfigError::Invalid(format!("unknown config key: {}", key)));
            }
        }

        self.validate()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid value for {}: {}", key, value)))
}

/// Text generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Gemini => "gemini",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(LlmProvider::Ollama),
            "gemini" => Some(LlmProvider::Gemini),
            _ => None,
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub host: String,
    pub model: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            host: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl LlmConfig {
    /// Name of the model the selected provider will use.
    pub fn active_model(&self) -> &str {
        match self.provider {
            LlmProvider::Ollama => &self.model,
            LlmProvider::Gemini => &self.gemini_model,
        }
    }
}

/// Simulated document scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2000,
            max_delay_ms: 5000,
        }
    }
}

/// UI/Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub color: bool,
    pub date_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            color: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.host, "http://localhost:11434");
        assert_eq!(config.bot.name, "CORE_UNIT_01");
        assert_eq!(config.scan.min_delay_ms, 2000);
        assert_eq!(config.scan.max_delay_ms, 5000);
    }

    #[test]
    fn test_default_config_string_parses() {
        let config: Config = toml::from_str(&Config::default_config_string()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.bot, BotConfig::default());
        assert_eq!(config.llm.gemini_model, "gemini-2.0-flash");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.llm.host, deserialized.llm.host);
        assert_eq!(config.bot, deserialized.bot);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [llm]
            provider = "gemini"

            [bot]
            name = "HELPDESK"
            "#
        )
        .unwrap();

        let path = temp_file.path().to_path_buf();
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.active_model(), "gemini-2.0-flash");
        assert_eq!(config.bot.name, "HELPDESK");
        // Defaults should still work
        assert_eq!(config.bot.organization_name, "ACME CORP");
        assert_eq!(config.scan.max_delay_ms, 5000);
    }

    #[test]
    fn test_load_rejects_inverted_scan_bounds() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [scan]
            min_delay_ms = 6000
            max_delay_ms = 1000
            "#
        )
        .unwrap();

        let result = Config::load_from(&temp_file.path().to_path_buf());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.llm.model, "llama3.2");
    }

    #[test]
    fn test_set_keys() {
        let mut config = Config::default();
        config.set("llm.model", "mistral").unwrap();
        config.set("llm.provider", "Gemini").unwrap();
        config.set("bot.industry", "Retail").unwrap();
        config.set("scan.max_delay_ms", "9000").unwrap();

        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.bot.industry, "Retail");
        assert_eq!(config.scan.max_delay_ms, 9000);

        assert!(config.set("llm.provider", "openai").is_err());
        assert!(config.set("llm.timeout_seconds", "soon").is_err());
        assert!(config.set("llm.temperature", "0.9").is_err());
        assert!(config.set("nope.key", "x").is_err());
    }

    #[test]
    fn test_rejects_bad_date_format() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("ui.date_format", "%Q"),
            Err(ConfigError::Invalid(_))
        ));

        config.set("ui.date_format", "%d/%m/%Y").unwrap();
        assert_eq!(config.ui.date_format, "%d/%m/%Y");
    }

    #[test]
    fn test_load_rejects_bad_date_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [ui]
            date_format = "%Y-%Q"
            "#
        )
        .unwrap();

        let result = Config::load_from(&temp_file.path().to_path_buf());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_legacy_temperature_key_is_ignored() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [llm]
            model = "mistral"
            temperature = 1.5
            "#
        )
        .unwrap();

        let config = Config::load_from(&temp_file.path().to_path_buf()).unwrap();
        assert_eq!(config.llm.model, "mistral");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.bot.name = "SAVED".to_string();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.bot.name, "SAVED");
    }
}
