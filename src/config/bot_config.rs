use poise::serenity_prelude::UserId;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::error::{BotError, Result};

/// Bot configuration, loaded once at startup and shared read-only.
///
/// The file form matches the panel bot's `config.json`:
/// `{"token": "...", "prefix": "!", "url": "https://panel", "key": "...", "admin_users": ["123"]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Discord bot token
    pub token: String,

    /// Prefix for text commands
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Panel base URL
    pub url: String,

    /// Panel API key, sent as `x-api-key`
    pub key: String,

    /// Discord user IDs allowed to run admin commands
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub admin_users: Vec<String>,

    /// Directory holding the image and node catalogs
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_secs: u64,

    #[serde(default = "default_cleanup_delay")]
    pub cleanup_delay_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_storage_path() -> String {
    "storage".to_string()
}

fn default_prompt_timeout() -> u64 {
    60
}

fn default_cleanup_delay() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

/// Admin IDs may be written as JSON strings or numbers.
fn deserialize_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    let raw: Vec<RawId> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|id| match id {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        })
        .collect())
}

impl BotConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })?;

        config.normalized().validate()
    }

    /// Build from environment variables (after `dotenv()`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| BotError::ConfigValidation {
                message: format!("missing {} environment variable", key),
            })
        };
        let seconds = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) => raw.trim().parse().map_err(|_| BotError::ConfigValidation {
                    message: format!("{} must be a whole number of seconds, got '{}'", key, raw),
                }),
                None => Ok(default),
            }
        };

        let config = Self {
            token: required("DISCORD_TOKEN")?,
            prefix: lookup("BOT_PREFIX").unwrap_or_else(default_prefix),
            url: required("PANEL_URL")?,
            key: required("PANEL_API_KEY")?,
            admin_users: lookup("ADMIN_USERS")
                .map(|raw| {
                    raw.split(',')
                        .map(|id| id.trim().to_string())
                        .filter(|id| !id.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            storage_path: lookup("STORAGE_PATH").unwrap_or_else(default_storage_path),
            prompt_timeout_secs: seconds("PROMPT_TIMEOUT_SECS", default_prompt_timeout())?,
            cleanup_delay_secs: seconds("CLEANUP_DELAY_SECS", default_cleanup_delay())?,
            request_timeout_secs: seconds("REQUEST_TIMEOUT_SECS", default_request_timeout())?,
        };

        config.normalized().validate()
    }

    fn normalized(mut self) -> Self {
        self.url = self.url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Reject configs the bot cannot run with
    pub fn validate(self) -> Result<Self> {
        let invalid = |message: &str| BotError::ConfigValidation {
            message: message.to_string(),
        };

        if self.token.trim().is_empty() {
            return Err(invalid("token must not be empty"));
        }
        if self.url.is_empty() {
            return Err(invalid("panel url must not be empty"));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(invalid("panel url must start with http:// or https://"));
        }
        if self.key.trim().is_empty() {
            return Err(invalid("panel api key must not be empty"));
        }
        if self.prefix.is_empty() {
            return Err(invalid("prefix must not be empty"));
        }
        if self.prompt_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(invalid("timeouts must be greater than zero"));
        }

        Ok(self)
    }

    /// Check whether a user is on the admin allow-list
    pub fn is_admin(&self, user_id: UserId) -> bool {
        let id = user_id.to_string();
        self.admin_users.iter().any(|admin| *admin == id)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Link to an instance page on the panel
    pub fn instance_url(&self, volume_id: &str) -> String {
        format!("{}/instance/{}", self.url, volume_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_config_file_format() {
        let json = r#"{
            "token": "discord-token",
            "prefix": "?",
            "url": "https://panel.example.com/",
            "key": "secret",
            "admin_users": ["111", 222]
        }"#;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        let config = config.normalized().validate().unwrap();

        assert_eq!(config.prefix, "?");
        assert_eq!(config.url, "https://panel.example.com");
        assert_eq!(config.admin_users, vec!["111", "222"]);
        assert_eq!(config.prompt_timeout(), Duration::from_secs(60));
        assert_eq!(config.cleanup_delay(), Duration::from_secs(300));
        assert_eq!(config.storage_path, "storage");
    }

    #[test]
    fn test_is_admin() {
        let json = r#"{"token": "t", "url": "http://panel", "key": "k", "admin_users": ["42"]}"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();

        assert!(config.is_admin(UserId::new(42)));
        assert!(!config.is_admin(UserId::new(43)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("DISCORD_TOKEN", "t"),
            ("PANEL_URL", "http://panel:8080/"),
            ("PANEL_API_KEY", "k"),
            ("ADMIN_USERS", "1, 2,,3"),
            ("PROMPT_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let config = BotConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.url, "http://panel:8080");
        assert_eq!(config.admin_users, vec!["1", "2", "3"]);
        assert_eq!(config.prompt_timeout_secs, 5);
        assert_eq!(config.prefix, "!");
        assert_eq!(config.instance_url("vol-1"), "http://panel:8080/instance/vol-1");
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let result = BotConfig::from_lookup(|k| match k {
            "DISCORD_TOKEN" => Some("t".to_string()),
            "PANEL_URL" => Some("http://panel".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(BotError::ConfigValidation { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let json = r#"{"token": "t", "url": "panel.example.com", "key": "k"}"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());

        let json = r#"{"token": "t", "url": "http://panel", "key": "k", "prompt_timeout_secs": 0}"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"token": "t", "url": "https://panel", "key": "k", "admin_users": []}"#,
        )
        .unwrap();

        let config = BotConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert!(config.admin_users.is_empty());

        let missing = BotConfig::load_from_file("/nonexistent/config.json");
        assert!(matches!(missing, Err(BotError::ConfigLoad { .. })));
    }
}
