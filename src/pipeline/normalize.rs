use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

use crate::constants::{
    PROJECT_ROLES, PROP_ADDRESS, PROP_EMAIL, PROP_FIRSTNAME, PROP_LASTNAME, PROP_PHONE,
    PROP_PROJECT_ROLE, UNKNOWN_NAME,
};
use crate::types::{Contact, RawContactRecord};

/// Supplies the role for contacts whose CRM record carries none.
///
/// Random assignment is a placeholder for missing CRM data, not business
/// logic; swap in `FixedRolePolicy` wherever output must be deterministic.
pub trait DefaultRolePolicy: Send + Sync {
    fn default_role(&self) -> String;
}

/// Uniform pick from the fixed project role enumeration
pub struct RandomRolePolicy {
    rng: Mutex<StdRng>,
}

impl RandomRolePolicy {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for RandomRolePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultRolePolicy for RandomRolePolicy {
    fn default_role(&self) -> String {
        // A poisoned lock only means another thread panicked mid-pick; the rng is still usable
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        PROJECT_ROLES
            .choose(&mut *rng)
            .copied()
            .unwrap_or(PROJECT_ROLES[0])
            .to_string()
    }
}

/// Always assigns the same role
pub struct FixedRolePolicy(pub String);

impl DefaultRolePolicy for FixedRolePolicy {
    fn default_role(&self) -> String {
        self.0.clone()
    }
}

/// Maps raw CRM records onto the internal contact shape. Never fails.
#[derive(Clone)]
pub struct ContactNormalizer {
    role_policy: Arc<dyn DefaultRolePolicy>,
}

impl ContactNormalizer {
    pub fn new(role_policy: Arc<dyn DefaultRolePolicy>) -> Self {
        Self { role_policy }
    }

    pub fn normalize(&self, raw: &RawContactRecord) -> Contact {
        let text = |key: &str| raw.property(key).unwrap_or_default().to_string();

        let roles = raw
            .property(PROP_PROJECT_ROLE)
            .map(parse_roles)
            .filter(|roles| !roles.is_empty())
            .unwrap_or_else(|| vec![self.role_policy.default_role()]);

        Contact {
            id: raw.id.clone(),
            name: display_name(raw.property(PROP_FIRSTNAME), raw.property(PROP_LASTNAME)),
            email: text(PROP_EMAIL),
            phone: text(PROP_PHONE),
            address: text(PROP_ADDRESS),
            roles,
        }
    }

    pub fn normalize_batch(&self, raw: &[RawContactRecord]) -> Vec<Contact> {
        raw.iter().map(|r| self.normalize(r)).collect()
    }
}

fn display_name(first: Option<&str>, last: Option<&str>) -> String {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        parts.join(" ")
    }
}

/// Split a comma-delimited role field, keeping order and dropping blanks
pub fn parse_roles(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
