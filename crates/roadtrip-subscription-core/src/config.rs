//! Engine configuration

use std::num::NonZeroU32;

use chrono::{DateTime, Duration, Months, Utc};
use roadtrip_db::PoolOptions;
use roadtrip_types::{Plan, ResourceKind, UsageWindow};

/// Subscription engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Length of a free-plan term
    pub free_term_months: NonZeroU32,
    /// Length of a paid-plan term
    pub paid_term_months: NonZeroU32,
    /// Rolling window over which AI consultations are counted
    pub ai_consultation_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            free_term_months: NonZeroU32::MIN,
            paid_term_months: NonZeroU32::MIN.saturating_add(11),
            ai_consultation_window: Duration::hours(24),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let free_term_months = parse_env("SUBSCRIPTION_FREE_TERM_MONTHS", defaults.free_term_months)?;
        let paid_term_months = parse_env("SUBSCRIPTION_PAID_TERM_MONTHS", defaults.paid_term_months)?;
        let window_hours: i64 = parse_env(
            "AI_CONSULTATION_WINDOW_HOURS",
            defaults.ai_consultation_window.num_hours(),
        )?;

        let ai_consultation_window = Duration::try_hours(window_hours)
            .filter(|window| *window > Duration::zero())
            .ok_or(ConfigError::Invalid("AI_CONSULTATION_WINDOW_HOURS"))?;

        Ok(Self {
            free_term_months,
            paid_term_months,
            ai_consultation_window,
        })
    }

    /// Set the free-plan term length
    pub fn with_free_term_months(mut self, months: NonZeroU32) -> Self {
        self.free_term_months = months;
        self
    }

    /// Set the paid-plan term length
    pub fn with_paid_term_months(mut self, months: NonZeroU32) -> Self {
        self.paid_term_months = months;
        self
    }

    /// Set the AI consultation counting window
    pub fn with_ai_consultation_window(mut self, window: Duration) -> Self {
        self.ai_consultation_window = window;
        self
    }

    /// Term length for a plan
    pub fn term_months(&self, plan: Plan) -> u32 {
        if plan.is_paid() {
            self.paid_term_months.get()
        } else {
            self.free_term_months.get()
        }
    }

    /// End of a term for `plan` starting at `from`
    pub fn term_end(&self, plan: Plan, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_months(Months::new(self.term_months(plan)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Counting window for a resource kind
    pub fn window_for(&self, kind: ResourceKind) -> UsageWindow {
        match kind {
            ResourceKind::Trip => UsageWindow::Lifetime,
            ResourceKind::AiConsultation => UsageWindow::Rolling(self.ai_consultation_window),
        }
    }
}

/// Database connection configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let max_connections = parse_env(
            "DATABASE_MAX_CONNECTIONS",
            PoolOptions::default().max_connections,
        )?;

        Ok(Self {
            url,
            max_connections,
        })
    }

    /// Pool options derived from this configuration
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            ..PoolOptions::default()
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

fn parse_env<T: std::str::FromStr + ToString>(key: &'static str, default: T) -> Result<T, ConfigError> {
    roadtrip_utils::env_or(key, &default.to_string())
        .parse()
        .map_err(|_| ConfigError::Invalid(key))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
