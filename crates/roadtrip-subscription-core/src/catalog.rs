//! Entitlement catalog
//!
//! Immutable table from plan to [`FeatureSet`]. Built once and shared by
//! `Arc` with the lifecycle manager and the quota gate. Feature snapshots on
//! subscriptions are taken from here at creation and plan-change time and
//! never recomputed on read.

use std::cmp::Ordering;
use std::collections::HashMap;

use roadtrip_types::{ExportFormat, FeatureSet, Plan};
use serde::Serialize;

use crate::{EngineError, EngineResult};

/// Suffix of yearly billing plan identifiers
const YEARLY_SUFFIX: &str = "_yearly";

/// Plan entitlement table
#[derive(Debug, Clone)]
pub struct EntitlementCatalog {
    plans: HashMap<Plan, FeatureSet>,
}

impl Default for EntitlementCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitlementCatalog {
    /// Catalog with the standard plan table
    pub fn new() -> Self {
        Self {
            plans: Plan::ALL
                .into_iter()
                .map(|plan| (plan, default_features(plan)))
                .collect(),
        }
    }

    /// Override the entitlements of one plan
    pub fn with_features(mut self, plan: Plan, features: FeatureSet) -> Self {
        self.plans.insert(plan, features);
        self
    }

    /// Feature snapshot for a plan
    pub fn derive_features(&self, plan: Plan) -> FeatureSet {
        self.plans
            .get(&plan)
            .cloned()
            .unwrap_or_else(|| default_features(plan))
    }

    /// Resolve a plan identifier, accepting yearly billing aliases
    pub fn resolve(&self, plan_id: &str) -> EngineResult<Plan> {
        let id = plan_id.trim().to_lowercase();
        let base = id.strip_suffix(YEARLY_SUFFIX).unwrap_or(&id);

        match base.parse::<Plan>() {
            // There is no yearly free plan
            Ok(Plan::Free) if base.len() != id.len() => Err(EngineError::InvalidPlan(plan_id.to_string())),
            Ok(plan) => Ok(plan),
            Err(_) => Err(EngineError::InvalidPlan(plan_id.to_string())),
        }
    }

    /// Entitlements for a plan identifier
    pub fn get_plan(&self, plan_id: &str) -> EngineResult<FeatureSet> {
        let plan = self
            .resolve(plan_id)
            .map_err(|_| EngineError::NotFound("plan"))?;
        Ok(self.derive_features(plan))
    }

    /// Compare two plans for display
    pub fn diff(&self, current_plan: &str, target_plan: &str) -> EngineResult<PlanDiff> {
        let from = self.resolve(current_plan)?;
        let to = self.resolve(target_plan)?;
        let current = self.derive_features(from);
        let target = self.derive_features(to);

        let mut differences = Vec::new();
        push_count(&mut differences, "maxTrips", current.max_trips, target.max_trips);
        push_count(&mut differences, "aiConsultations", current.ai_consultations, target.ai_consultations);
        push_flag(&mut differences, "customization", current.customization, target.customization);
        push_count(&mut differences, "maxCollaborators", current.max_collaborators, target.max_collaborators);

        let same_formats = current.export_formats.len() == target.export_formats.len()
            && current
                .export_formats
                .iter()
                .all(|format| target.supports_export(*format));
        if !same_formats {
            let delta = target.export_formats.len() as i64 - current.export_formats.len() as i64;
            let change = match delta.cmp(&0) {
                Ordering::Greater => format!("{delta} more format(s)"),
                Ordering::Less => format!("{} fewer format(s)", -delta),
                Ordering::Equal => "formats changed".to_string(),
            };
            differences.push(FeatureChange {
                feature: "exportFormats",
                from: FeatureValue::Formats(current.export_formats.clone()),
                to: FeatureValue::Formats(target.export_formats.clone()),
                change,
            });
        }

        push_flag(&mut differences, "prioritySupport", current.priority_support, target.priority_support);
        push_flag(&mut differences, "offlineAccess", current.offline_access, target.offline_access);
        push_flag(&mut differences, "advertisingFree", current.advertising_free, target.advertising_free);

        Ok(PlanDiff {
            from,
            to,
            is_upgrade: to.order() > from.order(),
            differences,
        })
    }
}

fn push_count(differences: &mut Vec<FeatureChange>, feature: &'static str, from: u32, to: u32) {
    if from != to {
        let delta = i64::from(to) - i64::from(from);
        differences.push(FeatureChange {
            feature,
            from: FeatureValue::Count(from),
            to: FeatureValue::Count(to),
            change: if delta > 0 {
                format!("+{delta}")
            } else {
                delta.to_string()
            },
        });
    }
}

fn push_flag(differences: &mut Vec<FeatureChange>, feature: &'static str, from: bool, to: bool) {
    if from != to {
        differences.push(FeatureChange {
            feature,
            from: FeatureValue::Flag(from),
            to: FeatureValue::Flag(to),
            change: if to { "enabled" } else { "disabled" }.to_string(),
        });
    }
}

/// Built-in entitlements for a plan
pub fn default_features(plan: Plan) -> FeatureSet {
    use ExportFormat::*;

    match plan {
        Plan::Free => FeatureSet {
            max_trips: 3,
            ai_consultations: 1,
            max_collaborators: 0,
            customization: false,
            export_formats: vec![Pdf],
            priority_support: false,
            offline_access: false,
            advertising_free: false,
        },
        Plan::Standard => FeatureSet {
            max_trips: 10,
            ai_consultations: 5,
            max_collaborators: 1,
            customization: false,
            export_formats: vec![Pdf, Csv],
            priority_support: false,
            offline_access: false,
            advertising_free: true,
        },
        Plan::Premium => FeatureSet {
            max_trips: 50,
            ai_consultations: 20,
            max_collaborators: 5,
            customization: true,
            export_formats: vec![Pdf, Csv, Excel, Gpx],
            priority_support: true,
            offline_access: true,
            advertising_free: true,
        },
        Plan::Enterprise => FeatureSet {
            max_trips: 1000,
            ai_consultations: 100,
            max_collaborators: 20,
            customization: true,
            export_formats: vec![Pdf, Csv, Excel, Gpx],
            priority_support: true,
            offline_access: true,
            advertising_free: true,
        },
    }
}

/// Upgrade/downgrade delta between two plans
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDiff {
    pub from: Plan,
    pub to: Plan,
    pub is_upgrade: bool,
    pub differences: Vec<FeatureChange>,
}

/// One changed feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureChange {
    pub feature: &'static str,
    pub from: FeatureValue,
    pub to: FeatureValue,
    /// Human-readable change, e.g. `+7` or `enabled`
    pub change: String,
}

/// Value of a single feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Count(u32),
    Flag(bool),
    Formats(Vec<ExportFormat>),
}
