//! Display configuration.
//!
//! Everything the engine needs is resolved into a [`DisplayConfig`] before
//! the scheduler starts. [`DisplayConfig::from_env`] builds one from
//! environment variables for the binary.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;

use crate::display::{AnimationConfig, PrimarySelector};
use crate::domain::{InvalidThresholds, UrgencyThresholds};
use crate::feed::{DEFAULT_AGENCY, DEFAULT_BASE_URL, LiveFeedConfig};

/// Default replay file, shipped with the crate.
pub const DEFAULT_REPLAY_FILE: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/data/replay/l_taraval.jsonl");

/// Default stop code (West Portal, inbound).
pub const DEFAULT_STOP_CODE: &str = "13210";

/// Default poll interval.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Errors from resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be set in live mode")]
    MissingValue(&'static str),

    #[error(transparent)]
    Thresholds(#[from] InvalidThresholds),

    #[error("animation step counts must be at least 1")]
    ZeroSteps,

    #[error("poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("fetch timeout {timeout:?} exceeds half the poll interval ({limit:?})")]
    FetchTimeoutTooLong { timeout: Duration, limit: Duration },
}

/// Where payloads come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    /// Poll the 511.org StopMonitoring API.
    Live {
        api_key: String,
        agency: String,
        stop_code: String,
        base_url: String,
    },
    /// Cycle through a recorded replay file.
    Replay { path: PathBuf },
}

impl FeedMode {
    pub fn live(api_key: impl Into<String>, stop_code: impl Into<String>) -> Self {
        FeedMode::Live {
            api_key: api_key.into(),
            agency: DEFAULT_AGENCY.to_string(),
            stop_code: stop_code.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn replay(path: impl Into<PathBuf>) -> Self {
        FeedMode::Replay { path: path.into() }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, FeedMode::Live { .. })
    }
}

/// Resolved configuration for the display engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub mode: FeedMode,

    /// How often a payload is fetched.
    pub poll_interval: Duration,

    /// Upper bound on a live fetch. Defaults to a third of the poll interval.
    pub fetch_timeout: Option<Duration>,

    pub thresholds: UrgencyThresholds,

    /// How long past its expected instant an arrival may still be shown.
    pub departed_grace: chrono::Duration,

    /// Number of following arrivals listed under the primary.
    pub upcoming_count: usize,

    pub animation: AnimationConfig,
}

impl DisplayConfig {
    /// Create a configuration with default timing for the given mode.
    pub fn new(mode: FeedMode) -> Self {
        Self {
            mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_timeout: None,
            thresholds: UrgencyThresholds::default(),
            departed_grace: chrono::Duration::seconds(60),
            upcoming_count: 2,
            animation: AnimationConfig::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn with_thresholds(mut self, thresholds: UrgencyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_upcoming_count(mut self, n: usize) -> Self {
        self.upcoming_count = n;
        self
    }

    /// Effective fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout.unwrap_or(self.poll_interval / 3)
    }

    /// Selector built from the thresholds and selection settings.
    pub fn selector(&self) -> PrimarySelector {
        PrimarySelector::new(self.thresholds, self.departed_grace, self.upcoming_count)
    }

    /// Client settings, in live mode.
    pub fn live_feed_config(&self) -> Option<LiveFeedConfig> {
        match &self.mode {
            FeedMode::Live {
                api_key,
                agency,
                stop_code,
                base_url,
            } => Some(
                LiveFeedConfig::new(api_key.as_str(), stop_code.as_str())
                    .with_agency(agency.as_str())
                    .with_base_url(base_url.as_str())
                    .with_timeout(self.fetch_timeout()),
            ),
            FeedMode::Replay { .. } => None,
        }
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }

        let limit = self.poll_interval / 2;
        if self.fetch_timeout() > limit {
            return Err(ConfigError::FetchTimeoutTooLong {
                timeout: self.fetch_timeout(),
                limit,
            });
        }

        if self.animation.exit_steps == 0 || self.animation.enter_steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }

        if let FeedMode::Live { api_key, .. } = &self.mode {
            if api_key.is_empty() {
                return Err(ConfigError::MissingValue("MUNI_API_KEY"));
            }
        }

        Ok(())
    }

    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from a key lookup.
    ///
    /// Without an explicit `ARRIVALS_MODE`, live mode is used when an API
    /// key is present and replay mode otherwise.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("MUNI_API_KEY").filter(|k| !k.is_empty());

        let live = match lookup("ARRIVALS_MODE").as_deref() {
            Some("live") => true,
            Some("replay") => false,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "ARRIVALS_MODE",
                    value: other.to_string(),
                });
            }
            None => api_key.is_some(),
        };

        let mode = if live {
            FeedMode::Live {
                api_key: api_key.ok_or(ConfigError::MissingValue("MUNI_API_KEY"))?,
                agency: lookup("MUNI_AGENCY").unwrap_or_else(|| DEFAULT_AGENCY.to_string()),
                stop_code: lookup("MUNI_STOP_CODE")
                    .unwrap_or_else(|| DEFAULT_STOP_CODE.to_string()),
                base_url: lookup("MUNI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            }
        } else {
            FeedMode::replay(
                lookup("ARRIVALS_REPLAY_FILE").unwrap_or_else(|| DEFAULT_REPLAY_FILE.to_string()),
            )
        };

        let mut config = Self::new(mode);

        if let Some(secs) = parse_var(&lookup, "ARRIVALS_POLL_SECS")? {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "ARRIVALS_FETCH_TIMEOUT_SECS")? {
            config.fetch_timeout = Some(Duration::from_secs(secs));
        }

        let defaults = UrgencyThresholds::default();
        config.thresholds = UrgencyThresholds::new(
            seconds_var(&lookup, "ARRIVALS_NOW_SECS", defaults.now())?,
            seconds_var(&lookup, "ARRIVALS_IMMINENT_SECS", defaults.imminent())?,
            seconds_var(&lookup, "ARRIVALS_SOON_SECS", defaults.soon())?,
        )?;

        if let Some(steps) = parse_var(&lookup, "ARRIVALS_STEPS")? {
            config.animation.exit_steps = steps;
            config.animation.enter_steps = steps;
        }
        if let Some(ms) = parse_var(&lookup, "ARRIVALS_FRAME_MS")? {
            config.animation.frame_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var(&lookup, "ARRIVALS_UTC_OFFSET_SECS")? {
            config.animation.clock_offset =
                FixedOffset::east_opt(secs).ok_or_else(|| ConfigError::InvalidValue {
                    key: "ARRIVALS_UTC_OFFSET_SECS",
                    value: secs.to_string(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

/// A signed number of seconds, rejecting values chrono cannot represent.
fn seconds_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: chrono::Duration,
) -> Result<chrono::Duration, ConfigError> {
    match parse_var::<i64>(lookup, key)? {
        None => Ok(default),
        Some(secs) => {
            chrono::Duration::try_seconds(secs).ok_or_else(|| ConfigError::InvalidValue {
                key,
                value: secs.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = DisplayConfig::new(FeedMode::replay(DEFAULT_REPLAY_FILE));

        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.thresholds, UrgencyThresholds::default());
        assert_eq!(config.upcoming_count, 2);
        assert_eq!(config.animation.exit_steps, 12);
        assert!(config.validate().is_ok());
        assert!(config.live_feed_config().is_none());
    }

    #[test]
    fn no_api_key_falls_back_to_replay() {
        let config = DisplayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.mode, FeedMode::replay(DEFAULT_REPLAY_FILE));
    }

    #[test]
    fn api_key_selects_live_mode() {
        let config = DisplayConfig::from_lookup(lookup(&[
            ("MUNI_API_KEY", "secret"),
            ("MUNI_STOP_CODE", "15731"),
            ("ARRIVALS_POLL_SECS", "60"),
        ]))
        .unwrap();

        assert!(config.mode.is_live());
        let client = config.live_feed_config().unwrap();
        assert_eq!(client.api_key, "secret");
        assert_eq!(client.stop_code, "15731");
        assert_eq!(client.agency, "SF");
        assert_eq!(client.timeout, Duration::from_secs(20));
    }

    #[test]
    fn explicit_live_mode_requires_key() {
        let result = DisplayConfig::from_lookup(lookup(&[("ARRIVALS_MODE", "live")]));
        assert_eq!(result, Err(ConfigError::MissingValue("MUNI_API_KEY")));
    }

    #[test]
    fn explicit_replay_mode_ignores_key() {
        let config = DisplayConfig::from_lookup(lookup(&[
            ("ARRIVALS_MODE", "replay"),
            ("MUNI_API_KEY", "secret"),
            ("ARRIVALS_REPLAY_FILE", "other.jsonl"),
        ]))
        .unwrap();
        assert_eq!(config.mode, FeedMode::replay("other.jsonl"));
    }

    #[test]
    fn threshold_overrides() {
        let config = DisplayConfig::from_lookup(lookup(&[
            ("ARRIVALS_IMMINENT_SECS", "180"),
            ("ARRIVALS_SOON_SECS", "900"),
        ]))
        .unwrap();

        assert_eq!(config.thresholds.imminent(), chrono::Duration::minutes(3));
        assert_eq!(config.thresholds.soon(), chrono::Duration::minutes(15));
        assert_eq!(config.thresholds.now(), chrono::Duration::zero());
    }

    #[test]
    fn rejects_bad_values() {
        let result = DisplayConfig::from_lookup(lookup(&[("ARRIVALS_POLL_SECS", "soon")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "ARRIVALS_POLL_SECS", .. })
        ));

        let result = DisplayConfig::from_lookup(lookup(&[("ARRIVALS_MODE", "demo")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        let result = DisplayConfig::from_lookup(lookup(&[("ARRIVALS_SOON_SECS", "60")]));
        assert_eq!(result, Err(ConfigError::Thresholds(InvalidThresholds)));

        let result = DisplayConfig::from_lookup(lookup(&[("ARRIVALS_STEPS", "0")]));
        assert_eq!(result, Err(ConfigError::ZeroSteps));

        let result = DisplayConfig::from_lookup(lookup(&[(
            "ARRIVALS_SOON_SECS",
            "9223372036854775807",
        )]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "ARRIVALS_SOON_SECS", .. })
        ));

        let result = DisplayConfig::from_lookup(lookup(&[("ARRIVALS_UTC_OFFSET_SECS", "90000")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "ARRIVALS_UTC_OFFSET_SECS", .. })
        ));
    }

    #[test]
    fn clock_offset_override() {
        let config =
            DisplayConfig::from_lookup(lookup(&[("ARRIVALS_UTC_OFFSET_SECS", "-25200")])).unwrap();
        assert_eq!(config.animation.clock_offset.local_minus_utc(), -25200);
    }

    #[test]
    fn default_replay_file_does_not_depend_on_working_directory() {
        let path = std::path::Path::new(DEFAULT_REPLAY_FILE);
        assert!(path.is_absolute());
        assert!(path.is_file());
    }

    #[test]
    fn fetch_timeout_must_be_a_fraction_of_poll() {
        let config = DisplayConfig::new(FeedMode::live("key", DEFAULT_STOP_CODE))
            .with_poll_interval(Duration::from_secs(10))
            .with_fetch_timeout(Duration::from_secs(6));

        assert_eq!(
            config.validate(),
            Err(ConfigError::FetchTimeoutTooLong {
                timeout: Duration::from_secs(6),
                limit: Duration::from_secs(5),
            })
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = DisplayConfig::new(FeedMode::replay("x")).with_poll_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }
}
