use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use board_bot::client::{DEFAULT_KEYWORD_API_URL, DEFAULT_TALK_API_URL};
use board_bot::processor::BotKind;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub bots: Vec<BotKind>,
    pub queue_capacity: usize,
    pub inbox_capacity: usize,
    pub poster_capacity: usize,
    pub publish_timeout: Duration,
    pub api_timeout: Duration,
    pub rng_seed: Option<u64>,
    pub keyword: ApiConfig,
    pub talk: ApiConfig,
}

/// Endpoint plus credential for one external API. No credential disables the bot.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub url: String,
    pub key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `lookup` returns `None` for unset names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.into());

        let bots = var("BOARD_BOTS", "helloworld,omikuji,keyword,gacha,talk")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(BotKind::from_str)
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("BOARD_BOTS")?;

        let rng_seed = match lookup("BOARD_RNG_SEED") {
            Some(seed) => Some(seed.trim().parse().context("BOARD_RNG_SEED")?),
            None => None,
        };

        Ok(Self {
            host: var("BOARD_HOST", "0.0.0.0"),
            port: parse(&lookup, "BOARD_PORT", 8080)?,
            db_path: var("BOARD_DB_PATH", "board.db").into(),
            bots,
            queue_capacity: parse(&lookup, "BOARD_QUEUE_CAPACITY", 64)?,
            inbox_capacity: parse(&lookup, "BOARD_INBOX_CAPACITY", 16)?,
            poster_capacity: parse(&lookup, "BOARD_POSTER_CAPACITY", 10)?,
            publish_timeout: Duration::from_millis(parse(&lookup, "BOARD_PUBLISH_TIMEOUT_MS", 250)?),
            api_timeout: Duration::from_secs(parse(&lookup, "BOARD_API_TIMEOUT_SECS", 10)?),
            rng_seed,
            keyword: ApiConfig {
                url: var("KEYWORD_API_URL", DEFAULT_KEYWORD_API_URL),
                key: lookup("KEYWORD_API_APP_ID").filter(|k| !k.is_empty()),
            },
            talk: ApiConfig {
                url: var("TALK_API_URL", DEFAULT_TALK_API_URL),
                key: lookup("TALK_API_KEY").filter(|k| !k.is_empty()),
            },
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 8080);
        assert_eq!(c.bots, BotKind::ALL.to_vec());
        assert_eq!(c.poster_capacity, 10);
        assert_eq!(c.publish_timeout, Duration::from_millis(250));
        assert_eq!(c.keyword.url, DEFAULT_KEYWORD_API_URL);
        assert!(c.keyword.key.is_none());
        assert!(c.rng_seed.is_none());
    }

    #[test]
    fn overrides() {
        let c = config(&[
            ("BOARD_PORT", "3000"),
            ("BOARD_BOTS", "gacha, Talk"),
            ("BOARD_RNG_SEED", "42"),
            ("TALK_API_KEY", "secret"),
            ("KEYWORD_API_APP_ID", ""),
        ])
        .unwrap();
        assert_eq!(c.port, 3000);
        assert_eq!(c.bots, vec![BotKind::Gacha, BotKind::Talk]);
        assert_eq!(c.rng_seed, Some(42));
        assert_eq!(c.talk.key.as_deref(), Some("secret"));
        assert!(c.keyword.key.is_none());
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(config(&[("BOARD_PORT", "eighty")]).is_err());
        assert!(config(&[("BOARD_BOTS", "helloworld,weather")]).is_err());
        assert!(config(&[("BOARD_RNG_SEED", "-1")]).is_err());
    }
}
