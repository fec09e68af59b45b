//! Zone extraction from server profile names
//!
//! Profile names follow the `ocp4-hypershift-...` convention with the zone
//! embedded somewhere after the prefix, e.g.:
//!
//! - `ocp4-hypershift-zone-a-01`       -> `zone-a`
//! - `ocp4-hypershift-data-zone-b-01`  -> `zone-b`
//! - `ocp4-hypershift-h100-zone-c-01`  -> `zone-c`
//! - `ocp4-hypershift-zone-e-l4-01`    -> `zone-e`
//!
//! Rules are ordered most specific first and the first match wins. New naming
//! conventions get a new rule appended to the end; earlier rules must keep
//! winning for the names they already claim (locked in by tests below).

use std::sync::OnceLock;

use regex::Regex;

/// Literal prefix all managed profile names carry.
pub const PROFILE_PREFIX: &str = "ocp4-hypershift";

/// Default bulk-scan pattern (anchored at start, case-insensitive match).
pub const DEFAULT_PATTERN: &str = "^ocp4-hypershift-.*";

/// Ordered extraction rules. Hardware-class prefixes (`data`, `h100`, `v100`)
/// sit before the zone, the generic rule captures up to a digit run or the
/// `l4` marker, and the last-resort rule takes the first alphanumeric token.
fn zone_rules() -> &'static Vec<Regex> {
    static RULES: OnceLock<Vec<Regex>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            r"(?i)ocp4-hypershift-data-([a-zA-Z0-9\-]+?)-(?:\d+|l4)",
            r"(?i)ocp4-hypershift-h100-([a-zA-Z0-9\-]+?)-(?:\d+|l4)",
            r"(?i)ocp4-hypershift-v100-([a-zA-Z0-9\-]+?)-(?:\d+|l4)",
            r"(?i)ocp4-hypershift-([a-zA-Z0-9\-]+?)-(?:\d+|l4)",
            r"(?i)ocp4-hypershift-([a-zA-Z0-9]+)-",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid zone rule"))
        .collect()
    })
}

/// Extract the zone from a profile name.
///
/// Pure and deterministic; returns `None` when no rule matches, which is a
/// valid outcome (the profile lands in the unknown-zone bucket), never an
/// error.
pub fn extract_zone(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    for rule in zone_rules() {
        if let Some(caps) = rule.captures(name) {
            if let Some(m) = caps.get(1) {
                return Some(m.as_str().to_lowercase());
            }
        }
    }
    None
}

/// All distinct zones present in a list of names, sorted.
pub fn extract_zones(names: &[String]) -> Vec<String> {
    let mut zones: Vec<String> = names.iter().filter_map(|n| extract_zone(n)).collect();
    zones.sort();
    zones.dedup();
    zones
}

/// Zone allow-list.
///
/// An empty filter allows everything. Profiles whose zone could not be
/// classified are ALWAYS allowed regardless of the filter - unclassified
/// servers must stay visible, they surface under "Unknown Zone".
#[derive(Debug, Clone, Default)]
pub struct ZoneFilter {
    zones: Vec<String>,
}

impl ZoneFilter {
    pub fn new(zones: Vec<String>) -> Self {
        Self { zones }
    }

    /// Parse a comma-separated list; `None` or blank means no filtering.
    pub fn from_str(spec: Option<&str>) -> Self {
        let zones = spec
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|z| !z.is_empty())
            .map(str::to_string)
            .collect();
        Self { zones }
    }

    /// Whether any filtering is active.
    pub fn is_active(&self) -> bool {
        !self.zones.is_empty()
    }

    pub fn is_allowed(&self, zone: Option<&str>) -> bool {
        if self.zones.is_empty() {
            return true;
        }
        match zone {
            // Unknown zone is always allowed, by policy.
            None => true,
            Some(z) => self.zones.iter().any(|allowed| allowed == z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_zone_names() {
        assert_eq!(
            extract_zone("ocp4-hypershift-zone-a-01").as_deref(),
            Some("zone-a")
        );
        assert_eq!(
            extract_zone("ocp4-hypershift-zone-e-l4-01").as_deref(),
            Some("zone-e")
        );
    }

    #[test]
    fn hardware_class_prefixes_win_over_generic_rule() {
        // The data/h100/v100 rules must claim these names; a lower-priority
        // rule would capture "data-zone-b" instead of "zone-b".
        assert_eq!(
            extract_zone("ocp4-hypershift-data-zone-b-01").as_deref(),
            Some("zone-b")
        );
        assert_eq!(
            extract_zone("ocp4-hypershift-h100-zone-c-01").as_deref(),
            Some("zone-c")
        );
        assert_eq!(
            extract_zone("ocp4-hypershift-v100-zone-d-01").as_deref(),
            Some("zone-d")
        );
    }

    #[test]
    fn zone_is_lowercased() {
        assert_eq!(
            extract_zone("OCP4-HYPERSHIFT-ZONE-A-01").as_deref(),
            Some("zone-a")
        );
    }

    #[test]
    fn unmatched_names_yield_none() {
        assert!(extract_zone("some-other-host").is_none());
        assert!(extract_zone("").is_none());
    }

    #[test]
    fn extract_zones_sorts_and_dedups() {
        let names = vec![
            "ocp4-hypershift-zone-b-01".to_string(),
            "ocp4-hypershift-zone-a-01".to_string(),
            "ocp4-hypershift-zone-a-02".to_string(),
            "unrelated".to_string(),
        ];
        assert_eq!(extract_zones(&names), vec!["zone-a", "zone-b"]);
    }

    #[test]
    fn empty_filter_allows_all() {
        let filter = ZoneFilter::from_str(None);
        assert!(!filter.is_active());
        assert!(filter.is_allowed(Some("zone-a")));
        assert!(filter.is_allowed(None));
    }

    #[test]
    fn active_filter_restricts_known_zones_only() {
        let filter = ZoneFilter::from_str(Some("zone-a, zone-b"));
        assert!(filter.is_active());
        assert!(filter.is_allowed(Some("zone-a")));
        assert!(filter.is_allowed(Some("zone-b")));
        assert!(!filter.is_allowed(Some("zone-c")));
        // Unknown zones pass through an active filter.
        assert!(filter.is_allowed(None));
    }
}
