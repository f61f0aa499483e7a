//! Quota-limited resources and dependent records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ParseError, UsageWindow, UserId};

/// Kinds of resources whose creation is gated by a plan limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Trip owned by the user, counted over its lifetime
    Trip,
    /// AI assistant consultation, counted over a rolling day
    AiConsultation,
}

impl ResourceKind {
    /// Every gated kind
    pub const ALL: [ResourceKind; 2] = [Self::Trip, Self::AiConsultation];

    /// Get the resource kind identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trip => "trip",
            Self::AiConsultation => "ai_consultation",
        }
    }

    /// Name of the feature limit that gates this kind
    pub const fn feature_name(&self) -> &'static str {
        match self {
            Self::Trip => "maxTrips",
            Self::AiConsultation => "aiConsultations",
        }
    }

    /// Counting window used unless configuration overrides it
    pub fn default_window(&self) -> UsageWindow {
        match self {
            Self::Trip => UsageWindow::Lifetime,
            Self::AiConsultation => UsageWindow::Rolling(Duration::hours(24)),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trip" | "trips" => Ok(Self::Trip),
            "ai_consultation" | "ai_consultations" | "ai" => Ok(Self::AiConsultation),
            _ => Err(ParseError::InvalidResourceKind(s.to_string())),
        }
    }
}

/// A stored quota-limited resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: Uuid,
    pub owner: UserId,
    pub kind: ResourceKind,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Create a new record owned by `owner`
    pub fn new(owner: UserId, kind: ResourceKind, title: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            kind,
            title,
            created_at: Utc::now(),
        }
    }

    /// Override the creation time
    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }
}

/// A trip bookmarked by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub trip_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FavoriteRecord {
    /// Create a new favorite
    pub fn new(user_id: UserId, trip_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            trip_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_windows() {
        assert_eq!(ResourceKind::Trip.default_window(), UsageWindow::Lifetime);
        assert_eq!(
            ResourceKind::AiConsultation.default_window(),
            UsageWindow::Rolling(Duration::hours(24))
        );
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("trips".parse::<ResourceKind>().unwrap(), ResourceKind::Trip);
        assert_eq!(
            "AI".parse::<ResourceKind>().unwrap(),
            ResourceKind::AiConsultation
        );
        assert!("favorite".parse::<ResourceKind>().is_err());
    }
}
