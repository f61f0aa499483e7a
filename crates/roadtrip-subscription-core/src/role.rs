//! Plan to role projection

use roadtrip_types::{Plan, Role};

/// Authorization role granted by a plan.
///
/// Only ever yields a [`Role`]; administrative [`roadtrip_types::Privilege`]
/// is assigned independently of billing.
pub const fn plan_to_role(plan: Plan) -> Role {
    match plan {
        Plan::Free | Plan::Standard => Role::User,
        Plan::Premium => Role::Premium,
        Plan::Enterprise => Role::Enterprise,
    }
}
