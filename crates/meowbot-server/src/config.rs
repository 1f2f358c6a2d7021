//! YAML deployment configuration.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use meowbot_core::BotConfig;
use serde::Deserialize;

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_database_path() -> String {
    "meowbot.redb".to_string()
}

fn default_zip_code() -> String {
    "10001".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack_verification_token: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub admin_user: Option<String>,
    #[serde(default)]
    pub cat_api_key: String,
    #[serde(default)]
    pub weather_api_key: String,
    #[serde(default = "default_zip_code")]
    pub default_zip_code: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(raw).context("parsing config")?;
        config.validate()?;
        Ok(config)
    }

    /// An absent secret is a deployment mistake; refuse to start rather
    /// than fail on the first API call.
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("slack_verification_token", &self.slack_verification_token),
            ("cat_api_key", &self.cat_api_key),
            ("weather_api_key", &self.weather_api_key),
        ] {
            if value.is_empty() {
                bail!("missing required secret `{name}` in config");
            }
        }
        Ok(())
    }

    pub fn bot_config(&self) -> BotConfig {
        BotConfig {
            admin_user: self.admin_user.clone(),
            cat_api_key: self.cat_api_key.clone(),
            weather_api_key: self.weather_api_key.clone(),
            default_zip_code: self.default_zip_code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "\
slack_verification_token: vtok
client_id: cid
client_secret: csec
admin_user: UADMIN
cat_api_key: catkey
weather_api_key: wkey
default_zip_code: \"94110\"
database_path: /var/lib/meowbot/meowbot.redb
listen_addr: 127.0.0.1:5000
";

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(FULL).unwrap();
        assert_eq!(config.slack_verification_token, "vtok");
        assert_eq!(config.admin_user.as_deref(), Some("UADMIN"));
        assert_eq!(config.default_zip_code, "94110");
        assert_eq!(config.listen_addr, "127.0.0.1:5000");
    }

    #[test]
    fn test_defaults_fill_optional_fields() {
        let config = Config::parse(
            "slack_verification_token: vtok\ncat_api_key: c\nweather_api_key: w\n",
        )
        .unwrap();
        assert_eq!(config.database_path, "meowbot.redb");
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.default_zip_code, "10001");
        assert_eq!(config.admin_user, None);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let err = Config::parse("slack_verification_token: vtok\ncat_api_key: c\n").unwrap_err();
        assert!(err
            .to_string()
            .contains("missing required secret `weather_api_key`"));
    }
}
