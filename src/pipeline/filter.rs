use serde::{Deserialize, Serialize};

use crate::pipeline::normalize::parse_roles;
use crate::types::EnrichedContact;

/// User-chosen filters over the enriched contact set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Insertion-ordered, no duplicates
    pub selected_roles: Vec<String>,
    pub location: String,
}

impl FilterCriteria {
    /// Build from the comma-separated role list and location text used by
    /// the query string and the CLI
    pub fn from_parts(roles: Option<&str>, location: Option<&str>) -> Self {
        let mut criteria = Self::default();
        for role in roles.map(parse_roles).unwrap_or_default() {
            if !criteria.has_role(&role) {
                criteria.selected_roles.push(role);
            }
        }
        criteria.set_location(location.unwrap_or_default());
        criteria
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.selected_roles.iter().any(|r| r == role)
    }

    /// Add the role if absent, remove it if present
    pub fn toggle_role(&mut self, role: &str) {
        if self.has_role(role) {
            self.selected_roles.retain(|r| r != role);
        } else {
            self.selected_roles.push(role.to_string());
        }
    }

    pub fn set_location(&mut self, location: &str) {
        self.location = location.to_string();
    }

    pub fn is_empty(&self) -> bool {
        self.selected_roles.is_empty() && self.location.trim().is_empty()
    }

    pub fn matches(&self, contact: &EnrichedContact) -> bool {
        let role_ok = self.selected_roles.is_empty()
            || contact.contact.roles.iter().any(|r| self.has_role(r));
        if !role_ok {
            return false;
        }

        // blank text disables the filter; otherwise the text is matched as typed
        self.location.trim().is_empty()
            || contact
                .contact
                .address
                .to_lowercase()
                .contains(&self.location.to_lowercase())
    }
}

/// Visible subset of `contacts`, in their original order
pub fn derive_view<'a>(
    contacts: &'a [EnrichedContact],
    criteria: &FilterCriteria,
) -> Vec<&'a EnrichedContact> {
    if criteria.is_empty() {
        return contacts.iter().collect();
    }
    contacts.iter().filter(|c| criteria.matches(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Contact, CoordinateSource, Coordinates};

    fn contact(id: &str, roles: &[&str], address: &str) -> EnrichedContact {
        EnrichedContact {
            contact: Contact {
                id: id.to_string(),
                name: format!("Contact {id}"),
                email: String::new(),
                phone: String::new(),
                address: address.to_string(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
            coordinates: Coordinates::new(37.0, -95.0),
            coordinate_source: CoordinateSource::Fallback,
        }
    }

    fn fixture() -> Vec<EnrichedContact> {
        vec![
            contact("1", &["Contractor", "Geo Tech"], "100 Pine St, Seattle, WA"),
            contact("2", &["Home Owner"], "12 Oak Ave, Portland, OR"),
            contact("3", &["Affiliate"], ""),
            contact("4", &["Geo Tech"], "9 Lake Rd, SEATTLE, WA"),
        ]
    }

    fn ids(view: &[&EnrichedContact]) -> Vec<String> {
        view.iter().map(|c| c.contact.id.clone()).collect()
    }

    #[test]
    fn test_empty_criteria_shows_everything() {
        let contacts = fixture();
        assert_eq!(ids(&derive_view(&contacts, &FilterCriteria::default())), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_role_filter_uses_intersection() {
        let contacts = fixture();
        let criteria = FilterCriteria::from_parts(Some("Geo Tech, Home Owner"), None);
        assert_eq!(ids(&derive_view(&contacts, &criteria)), vec!["1", "2", "4"]);
    }

    #[test]
    fn test_location_is_case_insensitive_substring() {
        let contacts = fixture();
        let criteria = FilterCriteria::from_parts(None, Some("seattle"));
        assert_eq!(ids(&derive_view(&contacts, &criteria)), vec!["1", "4"]);
    }

    #[test]
    fn test_filters_combine() {
        let contacts = fixture();
        let criteria = FilterCriteria::from_parts(Some("Contractor"), Some("Seattle"));
        assert_eq!(ids(&derive_view(&contacts, &criteria)), vec!["1"]);

        let criteria = FilterCriteria::from_parts(Some("Affiliate"), Some("Seattle"));
        assert!(derive_view(&contacts, &criteria).is_empty());
    }

    #[test]
    fn test_blank_location_is_ignored() {
        let contacts = fixture();
        let criteria = FilterCriteria::from_parts(None, Some("   "));
        assert!(criteria.is_empty());
        assert_eq!(derive_view(&contacts, &criteria).len(), 4);
    }

    #[test]
    fn test_location_padding_is_part_of_the_match() {
        let contacts = fixture();
        let criteria = FilterCriteria::from_parts(None, Some("wa "));
        assert!(!criteria.is_empty());
        assert!(derive_view(&contacts, &criteria).is_empty());

        let criteria = FilterCriteria::from_parts(None, Some(" seattle"));
        assert_eq!(ids(&derive_view(&contacts, &criteria)), vec!["1", "4"]);
    }

    #[test]
    fn test_toggle_role_adds_and_removes() {
        let mut criteria = FilterCriteria::default();
        criteria.toggle_role("Geo Tech");
        criteria.toggle_role("Affiliate");
        assert_eq!(criteria.selected_roles, vec!["Geo Tech", "Affiliate"]);
        criteria.toggle_role("Geo Tech");
        assert_eq!(criteria.selected_roles, vec!["Affiliate"]);
    }

    #[test]
    fn test_view_is_repeatable() {
        let contacts = fixture();
        let criteria = FilterCriteria::from_parts(Some("Geo Tech"), Some("wa"));
        assert_eq!(derive_view(&contacts, &criteria), derive_view(&contacts, &criteria));
    }

    #[test]
    fn test_duplicate_roles_collapse() {
        let criteria = FilterCriteria::from_parts(Some("Affiliate,Affiliate"), None);
        assert_eq!(criteria.selected_roles, vec!["Affiliate"]);
    }
}
