//! Engine errors

use roadtrip_db::DbError;
use roadtrip_types::{ParseError, Plan, SubscriptionStatus};
use thiserror::Error;

/// Subscription engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending input field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// Unrecognized plan identifier
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// No such record
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The user holds no current subscription
    #[error("no active subscription")]
    NoActiveSubscription,

    /// Operation requires an active subscription
    #[error("subscription is not active (status: {0})")]
    NotActive(SubscriptionStatus),

    /// Would violate a uniqueness or single-current-subscription invariant
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource limit reached for the current plan
    #[error("quota exceeded for {feature}: {current} / {limit} on {plan} plan")]
    QuotaExceeded {
        /// Limiting feature (e.g. `maxTrips`)
        feature: &'static str,
        /// Plan limit
        limit: u32,
        /// Usage at the time of the check
        current: u64,
        /// Plan the user is on
        plan: Plan,
    },

    /// No entitlement to check against
    #[error("an active subscription is required")]
    SubscriptionRequired,

    /// Storage failure; no write of the operation took effect
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),
}

/// Engine result type
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Build a validation error
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::InvalidPlan(_) => 400,
            Self::NotFound(_) | Self::NoActiveSubscription => 404,
            Self::NotActive(_) | Self::Conflict(_) => 409,
            Self::SubscriptionRequired => 402,
            Self::QuotaExceeded { .. } => 403,
            Self::TransactionAborted(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidPlan(_) => "INVALID_PLAN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoActiveSubscription => "NO_ACTIVE_SUBSCRIPTION",
            Self::NotActive(_) => "SUBSCRIPTION_NOT_ACTIVE",
            Self::Conflict(_) => "CONFLICT",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::SubscriptionRequired => "SUBSCRIPTION_REQUIRED",
            Self::TransactionAborted(_) => "TRANSACTION_ABORTED",
        }
    }

    /// Check if this is a client input error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidPlan(_))
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound("record"),
            DbError::UniqueViolation(constraint) => {
                Self::Conflict(format!("unique constraint {constraint} violated"))
            }
            other => {
                tracing::error!("Database error: {}", other);
                Self::TransactionAborted(other.to_string())
            }
        }
    }
}

impl From<ParseError> for EngineError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidPlan(plan) => Self::InvalidPlan(plan),
            ParseError::InvalidPaymentMethod(_) => Self::validation("paymentMethod", err.to_string()),
            ParseError::InvalidStatus(_) => Self::validation("status", err.to_string()),
            ParseError::InvalidResourceKind(_) => Self::validation("resourceKind", err.to_string()),
            other => Self::validation("value", other.to_string()),
        }
    }
}
