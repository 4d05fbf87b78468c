//! Event filters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::data::{EventStatus, HazardEvent};

/// Which events the console shows. An absent set means "no restriction".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    /// Visible statuses.
    #[serde(default)]
    pub statuses: Option<BTreeSet<EventStatus>>,
    /// Visible hazard types (`PHEN.SIG[.SUB]`).
    #[serde(default)]
    pub hazard_types: Option<BTreeSet<String>>,
    /// Visible issuing sites.
    #[serde(default)]
    pub site_ids: Option<BTreeSet<String>>,
}

impl EventFilter {
    /// Whether an event passes every configured restriction.
    pub fn matches(&self, event: &HazardEvent) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&event.status) {
                return false;
            }
        }
        if let Some(hazard_types) = &self.hazard_types {
            match event.hazard_type() {
                Some(hazard_type) if hazard_types.contains(&hazard_type) => {},
                _ => return false,
            }
        }
        if let Some(site_ids) = &self.site_ids {
            match event.site_id.as_ref() {
                Some(site_id) if site_ids.contains(site_id) => {},
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(EventFilter::default().matches(&HazardEvent::new("E1", 0, 1)));
    }

    #[test]
    fn each_restriction_applies() {
        let event = HazardEvent::new("E1", 0, 1)
            .with_type("FF", Some("W"), None)
            .with_status(EventStatus::Issued);

        let by_status = EventFilter {
            statuses: Some([EventStatus::Pending].into_iter().collect()),
            ..EventFilter::default()
        };
        assert!(!by_status.matches(&event));

        let by_type = EventFilter {
            hazard_types: Some(["FF.W".to_string()].into_iter().collect()),
            ..EventFilter::default()
        };
        assert!(by_type.matches(&event));

        let by_site = EventFilter {
            site_ids: Some(["OAX".to_string()].into_iter().collect()),
            ..EventFilter::default()
        };
        assert!(!by_site.matches(&event));
    }
}
