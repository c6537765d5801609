use std::{env, fs, path::Path, str::FromStr, time::Duration};

use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::{errors::Error, Result};

pub const DEFAULT_FEED_URL: &str = "https://api.underdogfantasy.com/beta/news/nba";
pub const DEFAULT_PLAYER_IMAGE_URL: &str = "https://nba-players.familyds.com/players/{last}/{first}";

/// Typed configuration for the bot.
///
/// Timing constants live here instead of inline so every tick/limit can be
/// tuned from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    /// Destination chat for poller and digest notices.
    pub channel_id: i64,

    // Feed
    pub feed_url: String,
    pub feed_timeout: Duration,

    // Timers
    pub poll_interval: Duration,
    pub digest_check_interval: Duration,
    /// Local wall-clock minute at which the daily digest fires.
    pub digest_time: NaiveTime,
    pub timezone: Tz,

    // Presentation
    pub recent_limit: usize,
    pub max_notice_fields: usize,
    /// Template with `{first}` / `{last}` placeholders. Empty disables thumbnails.
    pub player_image_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (environment, map, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required settings
        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let channel_id = get("CHANNEL_ID").ok_or_else(|| {
            Error::Config("CHANNEL_ID environment variable is required".to_string())
        })?;
        let channel_id = parse_value::<i64>("CHANNEL_ID", &channel_id)?;

        let feed_url = get("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let feed_timeout = Duration::from_secs(parse_opt(&get, "FEED_TIMEOUT_SECS")?.unwrap_or(10));

        let poll_interval = Duration::from_secs(positive(
            "POLL_INTERVAL_SECS",
            parse_opt(&get, "POLL_INTERVAL_SECS")?.unwrap_or(20),
        )?);
        let digest_check_interval = Duration::from_secs(positive(
            "DIGEST_CHECK_INTERVAL_SECS",
            parse_opt(&get, "DIGEST_CHECK_INTERVAL_SECS")?.unwrap_or(60),
        )?);

        let digest_time = match get("DIGEST_TIME") {
            Some(v) => parse_clock_time(&v)?,
            None => NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
        };

        let timezone = match get("DISPLAY_TIMEZONE") {
            Some(v) => Tz::from_str(v.trim())
                .map_err(|e| Error::Config(format!("DISPLAY_TIMEZONE={v:?}: {e}")))?,
            None => chrono_tz::US::Eastern,
        };

        let recent_limit = parse_opt(&get, "RECENT_LIMIT")?.unwrap_or(10);
        let max_notice_fields = parse_opt(&get, "MAX_NOTICE_FIELDS")?.unwrap_or(25);

        // Explicitly empty disables thumbnails, so read the raw value here.
        let player_image_url = lookup("PLAYER_IMAGE_URL")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_PLAYER_IMAGE_URL.to_string());

        Ok(Self {
            telegram_bot_token,
            channel_id,
            feed_url,
            feed_timeout,
            poll_interval,
            digest_check_interval,
            digest_time,
            timezone,
            recent_limit,
            max_notice_fields,
            player_image_url,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
}

fn parse_opt<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    get(key).map(|v| parse_value(key, &v)).transpose()
}

fn positive(key: &str, secs: u64) -> Result<u64> {
    if secs == 0 {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }
    Ok(secs)
}

/// Accepts `HH:MM` or `HH:MM:SS`.
fn parse_clock_time(raw: &str) -> Result<NaiveTime> {
    let v = raw.trim();
    NaiveTime::parse_from_str(v, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(v, "%H:%M:%S"))
        .map_err(|e| Error::Config(format!("DIGEST_TIME={raw:?}: {e}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
