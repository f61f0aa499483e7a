//! Subscription plan types

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Commercial plan tiers
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free tier - 3 trips, 1 AI consultation per day
    #[default]
    Free,
    /// Standard tier - 10 trips, 5 AI consultations per day
    Standard,
    /// Premium tier - 50 trips, 20 AI consultations per day
    Premium,
    /// Enterprise tier - travel agencies, 1000 trips
    Enterprise,
}

impl Plan {
    /// Every plan, in ascending order
    pub const ALL: [Plan; 4] = [Self::Free, Self::Standard, Self::Premium, Self::Enterprise];

    /// Get the plan identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Enterprise => "enterprise",
        }
    }

    /// Whether the plan is billed
    pub const fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }

    /// Display order of the plan; higher means more capabilities
    pub const fn order(&self) -> u8 {
        match self {
            Self::Free => 1,
            Self::Standard => 2,
            Self::Premium => 3,
            Self::Enterprise => 4,
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Plan {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(ParseError::InvalidPlan(s.to_string())),
        }
    }
}
