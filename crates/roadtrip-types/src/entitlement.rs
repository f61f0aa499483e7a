//! Entitlement and feature types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{ParseError, ResourceKind};

/// Trip export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Csv,
    Excel,
    Gpx,
}

impl ExportFormat {
    /// Get the format identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Gpx => "gpx",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "csv" => Ok(Self::Csv),
            "excel" => Ok(Self::Excel),
            "gpx" => Ok(Self::Gpx),
            _ => Err(ParseError::InvalidExportFormat(s.to_string())),
        }
    }
}

/// Capability limits attached to a plan.
///
/// Subscriptions store a copy of this value taken when the plan was chosen.
/// Later catalog changes never rewrite an existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    /// Maximum number of trips owned at any time
    pub max_trips: u32,
    /// AI consultations allowed per rolling window
    pub ai_consultations: u32,
    /// Maximum collaborators per trip
    pub max_collaborators: u32,
    /// Custom branding and layouts
    pub customization: bool,
    /// Formats trips can be exported to
    pub export_formats: Vec<ExportFormat>,
    /// Priority support queue
    pub priority_support: bool,
    /// Offline maps and itineraries
    pub offline_access: bool,
    /// No advertising in the app
    pub advertising_free: bool,
}

impl FeatureSet {
    /// Get the quota ceiling for a resource kind
    pub fn limit_for(&self, kind: ResourceKind) -> u32 {
        match kind {
            ResourceKind::Trip => self.max_trips,
            ResourceKind::AiConsultation => self.ai_consultations,
        }
    }

    /// Check whether trips can be exported to `format`
    pub fn supports_export(&self, format: ExportFormat) -> bool {
        self.export_formats.contains(&format)
    }
}

/// Window over which usage of a resource kind is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageWindow {
    /// Every record the user currently owns
    Lifetime,
    /// Records created within the trailing duration
    Rolling(Duration),
}

impl UsageWindow {
    /// Lower bound of the window relative to `now`, if any.
    ///
    /// A rolling window reaching past the earliest representable time has no
    /// lower bound and counts like [`UsageWindow::Lifetime`].
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Lifetime => None,
            Self::Rolling(duration) => now.checked_sub_signed(*duration),
        }
    }
}

/// Result of a quota check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum QuotaDecision {
    /// Creation is permitted
    Allow {
        /// Ceiling from the subscription snapshot
        limit: u32,
        /// Usage counted before the new resource
        current: u64,
    },
    /// Creation is refused
    Deny {
        /// Human-readable reason naming the feature and plan
        reason: String,
        /// Feature that limits the request (e.g. `maxTrips`)
        feature: String,
        /// Ceiling from the subscription snapshot
        limit: u32,
        /// Usage counted before the new resource
        current: u64,
    },
}

impl QuotaDecision {
    /// Whether the decision permits creation
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Remaining headroom; zero when denied
    pub fn remaining(&self) -> u64 {
        match self {
            Self::Allow { limit, current } => u64::from(*limit).saturating_sub(*current),
            Self::Deny { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_window_since() {
        let now = Utc::now();
        let window = UsageWindow::Rolling(Duration::hours(24));
        assert_eq!(window.since(now), Some(now - Duration::hours(24)));
        assert_eq!(UsageWindow::Lifetime.since(now), None);

        let huge = UsageWindow::Rolling(Duration::MAX);
        assert_eq!(huge.since(now), None);
    }

    #[test]
    fn test_feature_set_wire_names() {
        let features = FeatureSet {
            max_trips: 3,
            ai_consultations: 1,
            max_collaborators: 0,
            customization: false,
            export_formats: vec![ExportFormat::Pdf],
            priority_support: false,
            offline_access: false,
            advertising_free: false,
        };
        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["maxTrips"], 3);
        assert_eq!(json["aiConsultations"], 1);
        assert_eq!(json["exportFormats"][0], "pdf");
        assert!(features.supports_export(ExportFormat::Pdf));
        assert!(!features.supports_export(ExportFormat::Gpx));
    }

    #[test]
    fn test_quota_decision_remaining() {
        let allow = QuotaDecision::Allow {
            limit: 3,
            current: 2,
        };
        assert!(allow.is_allowed());
        assert_eq!(allow.remaining(), 1);

        let deny = QuotaDecision::Deny {
            reason: "limit reached".into(),
            feature: "maxTrips".into(),
            limit: 3,
            current: 3,
        };
        assert!(!deny.is_allowed());
        assert_eq!(deny.remaining(), 0);
    }
}
