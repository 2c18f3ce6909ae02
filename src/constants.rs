/// Project role constants shared by the normalizer, filters and the legend
/// These define the fixed role enumeration shown on the contacts map

pub const CONTRACTOR: &str = "Contractor";
pub const HOME_OWNER: &str = "Home Owner";
pub const AFFILIATE: &str = "Affiliate";
pub const REFERRAL_PARTNER: &str = "Referral Partner";
pub const COMMUNITY_PARTNER: &str = "Community Partner";
pub const GEO_TECH: &str = "Geo Tech";

/// All project roles in legend order
pub const PROJECT_ROLES: [&str; 6] = [
    CONTRACTOR,
    HOME_OWNER,
    AFFILIATE,
    REFERRAL_PARTNER,
    COMMUNITY_PARTNER,
    GEO_TECH,
];

/// Marker colour for contacts whose first role is not in the enumeration
pub const DEFAULT_ROLE_COLOR: &str = "#ff0000";

/// Legend colour for a role, falling back to the default marker colour
pub fn role_color(role: &str) -> &'static str {
    match role {
        CONTRACTOR => "#3388ff",
        HOME_OWNER => "#33cc33",
        AFFILIATE => "#ffcc00",
        REFERRAL_PARTNER => "#9933cc",
        COMMUNITY_PARTNER => "#ff9900",
        GEO_TECH => "#ff66cc",
        _ => DEFAULT_ROLE_COLOR,
    }
}

/// Name used when a record carries neither first nor last name
pub const UNKNOWN_NAME: &str = "Unknown";

// HubSpot contact property names
pub const PROP_FIRSTNAME: &str = "firstname";
pub const PROP_LASTNAME: &str = "lastname";
pub const PROP_EMAIL: &str = "email";
pub const PROP_PHONE: &str = "phone";
pub const PROP_ADDRESS: &str = "address";
pub const PROP_PROJECT_ROLE: &str = "project_role";

/// Properties requested from the CRM on every fetch
pub const HUBSPOT_PROPERTIES: [&str; 6] = [
    PROP_FIRSTNAME,
    PROP_LASTNAME,
    PROP_EMAIL,
    PROP_PHONE,
    PROP_ADDRESS,
    PROP_PROJECT_ROLE,
];

pub const HUBSPOT_CONTACTS_PATH: &str = "/crm/v3/objects/contacts";
pub const HUBSPOT_MAX_LIMIT: u32 = 100;

// Fallback coordinate: continental US centre with uniform jitter
pub const FALLBACK_LAT: f64 = 37.0;
pub const FALLBACK_LNG: f64 = -95.0;
pub const FALLBACK_JITTER_DEGREES: f64 = 5.0;

/// Client marker sent to the geocoding service per its usage policy
pub const DEFAULT_USER_AGENT: &str = "ProStructEngineeringApp/1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_role_has_a_legend_color() {
        for role in PROJECT_ROLES {
            assert_ne!(role_color(role), DEFAULT_ROLE_COLOR, "{role} has no colour");
        }
        assert_eq!(role_color("Plumber"), DEFAULT_ROLE_COLOR);
    }
}
