//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::tour::StepCatalog;

/// How the sequencer combines the goal and urgency orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Urgency ordering dominates; the investment ordering only breaks ties.
    #[default]
    LastRuleWins,
    /// Action steps first, then investment-focused and personalization steps.
    Blended,
}

impl FromStr for OrderingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_rule_wins" => Ok(Self::LastRuleWins),
            "blended" => Ok(Self::Blended),
            _ => Err(format!("Unknown ordering policy: {}", s)),
        }
    }
}

/// Tour runtime configuration.
#[derive(Debug, Clone)]
pub struct TourConfig {
    /// Maximum number of steps presented in one run.
    pub max_steps: usize,
    /// Delay between answering a question and the automatic advance.
    pub auto_advance_delay: Duration,
    /// Period of the on-screen elapsed-time counter.
    pub tick_interval: Duration,
    /// Page path reported to the action tracker.
    pub page_path: String,
    /// Ordering policy for goal/urgency re-sorting.
    pub ordering: OrderingPolicy,
    /// Optional cap on interaction log entries. `None` keeps everything.
    pub interaction_log_cap: Option<usize>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            max_steps: 8,
            auto_advance_delay: Duration::from_millis(600),
            tick_interval: Duration::from_secs(1),
            page_path: "/".to_string(),
            ordering: OrderingPolicy::default(),
            interaction_log_cap: None,
        }
    }
}

impl TourConfig {
    /// Build from `GUIDED_TOUR_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_steps = env_parse("GUIDED_TOUR_MAX_STEPS")?.unwrap_or(defaults.max_steps);
        if max_steps < 2 {
            return Err(ConfigError::InvalidValue {
                key: "GUIDED_TOUR_MAX_STEPS".to_string(),
                message: "must be at least 2".to_string(),
            });
        }

        let auto_advance_delay = env_parse::<u64>("GUIDED_TOUR_AUTO_ADVANCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.auto_advance_delay);

        let page_path = std::env::var("GUIDED_TOUR_PAGE_PATH").unwrap_or(defaults.page_path);

        let ordering = env_parse("GUIDED_TOUR_ORDERING")?.unwrap_or(defaults.ordering);

        let interaction_log_cap = env_parse("GUIDED_TOUR_INTERACTION_CAP")?;

        Ok(Self {
            max_steps,
            auto_advance_delay,
            tick_interval: defaults.tick_interval,
            page_path,
            ordering,
            interaction_log_cap,
        })
    }
}

/// Service configuration for the HTTP binary.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Path of the libSQL database holding the profile document.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Analytics collector endpoint. Events are only logged when unset.
    pub analytics_url: Option<String>,
    /// Optional JSON catalog replacing the built-in steps.
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/guided-tour.db"),
            port: 8080,
            analytics_url: None,
            catalog_path: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            db_path: std::env::var("GUIDED_TOUR_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            port: env_parse("GUIDED_TOUR_PORT")?.unwrap_or(defaults.port),
            analytics_url: std::env::var("GUIDED_TOUR_ANALYTICS_URL").ok(),
            catalog_path: std::env::var("GUIDED_TOUR_CATALOG_PATH")
                .ok()
                .map(PathBuf::from),
        })
    }

    /// The configured step catalog, or the built-in one when no path is set.
    pub fn load_catalog(&self) -> crate::error::Result<StepCatalog> {
        let Some(ref path) = self.catalog_path else {
            return Ok(StepCatalog::default());
        };
        let json = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Ok(StepCatalog::from_json(&json)?)
    }
}

/// Parse an optional environment variable. Unset is `Ok(None)`.
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
