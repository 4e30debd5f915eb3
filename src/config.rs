//! Application-level configuration loaded from the environment at startup.

use std::{env, path::PathBuf};

use thiserror::Error;

use crate::i18n::DEFAULT_LOCALE;

const DB_URI_ENV: &str = "HIGAWARI_DB_URI";
const DB_NAME_ENV: &str = "HIGAWARI_DB_NAME";
const RELAY_URL_ENV: &str = "HIGAWARI_RELAY_URL";
const TOKEN_ENV: &str = "HIGAWARI_TOKEN";
const MODERATION_CHANNEL_ENV: &str = "HIGAWARI_MOD_CH";
const CHALLENGE_CHANNEL_ENV: &str = "HIGAWARI_CH_CH";
const LOCALE_ENV: &str = "HIGAWARI_LOCALE";
const LOCALES_DIR_ENV: &str = "HIGAWARI_LOCALES_DIR";
/// Default directory searched for `<locale>.json` files.
const DEFAULT_LOCALES_DIR: &str = "locales";
const DEFAULT_PORT: u16 = 8080;

/// Errors raised while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    Missing(&'static str),
    #[error("environment variable `{var}` has an invalid value `{value}`")]
    Invalid { var: &'static str, value: String },
}

/// Channels the bot listens to and posts in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Channel where moderator commands are accepted and reviews are posted.
    pub moderation: String,
    /// Public channel receiving announcements and the published compilation.
    pub challenge: String,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration.
pub struct AppConfig {
    /// MongoDB URI; the in-memory store is used when absent.
    pub db_uri: Option<String>,
    pub db_name: Option<String>,
    pub relay_url: String,
    /// Credential shared with the chat relay, used in both directions.
    pub token: String,
    pub channels: ChannelConfig,
    pub locale: String,
    pub locales_dir: PathBuf,
    pub port: u16,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read the configuration through `lookup`, treating blank values as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let require = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let port = match get("PORT").or_else(|| get("SERVER_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            db_uri: get(DB_URI_ENV),
            db_name: get(DB_NAME_ENV),
            relay_url: require(RELAY_URL_ENV)?,
            token: require(TOKEN_ENV)?,
            channels: ChannelConfig {
                moderation: require(MODERATION_CHANNEL_ENV)?,
                challenge: require(CHALLENGE_CHANNEL_ENV)?,
            },
            locale: get(LOCALE_ENV).unwrap_or_else(|| DEFAULT_LOCALE.to_owned()),
            locales_dir: get(LOCALES_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCALES_DIR)),
            port,
        })
    }
}
