//! Scan result aggregation
//!
//! Nested zone -> vendor -> profiles structure with a separate bucket for
//! profiles whose zone could not be classified. Rebuilt from scratch on
//! every scan and published wholesale; never mutated after that.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::profile::ServerProfile;
use crate::vendor::VendorKind;

/// Aggregated scan results grouped by zone, then vendor.
///
/// Records keep insertion order within a bin; display layers re-sort by
/// name. Every profile added lands in exactly one bin.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResults {
    zones: BTreeMap<String, BTreeMap<VendorKind, Vec<ServerProfile>>>,
    unknown: BTreeMap<VendorKind, Vec<ServerProfile>>,
}

impl ScanResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bin a profile by its zone (or the unknown bucket) and vendor.
    pub fn add(&mut self, profile: ServerProfile) {
        match profile.zone.clone() {
            Some(zone) => self
                .zones
                .entry(zone)
                .or_default()
                .entry(profile.vendor)
                .or_default()
                .push(profile),
            None => self.unknown.entry(profile.vendor).or_default().push(profile),
        }
    }

    /// Known zones, sorted.
    pub fn zones(&self) -> Vec<&str> {
        self.zones.keys().map(String::as_str).collect()
    }

    /// Vendors present in a zone, sorted.
    pub fn vendors_in_zone(&self, zone: &str) -> Vec<VendorKind> {
        self.zones
            .get(zone)
            .map(|vendors| vendors.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Profiles for a zone/vendor bin, in insertion order.
    pub fn profiles(&self, zone: &str, vendor: VendorKind) -> &[ServerProfile] {
        self.zones
            .get(zone)
            .and_then(|vendors| vendors.get(&vendor))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Unknown-zone profiles keyed by vendor.
    pub fn unknown_zone_profiles(&self) -> &BTreeMap<VendorKind, Vec<ServerProfile>> {
        &self.unknown
    }

    pub fn has_unknown(&self) -> bool {
        !self.unknown.is_empty()
    }

    /// Total number of profiles across all bins, unknown included.
    pub fn total(&self) -> usize {
        let known: usize = self
            .zones
            .values()
            .flat_map(|vendors| vendors.values())
            .map(Vec::len)
            .sum();
        let unknown: usize = self.unknown.values().map(Vec::len).sum();
        known + unknown
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty() && self.unknown.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, vendor: VendorKind, zone: Option<&str>) -> ServerProfile {
        ServerProfile::new(name, vendor)
            .unwrap()
            .with_zone(zone.map(str::to_string))
    }

    #[test]
    fn total_matches_number_of_adds() {
        let mut results = ScanResults::new();
        results.add(profile("a-01", VendorKind::Hp, Some("zone-a")));
        results.add(profile("a-02", VendorKind::Hp, Some("zone-a")));
        results.add(profile("b-01", VendorKind::Dell, Some("zone-b")));
        results.add(profile("x-01", VendorKind::Cisco, None));
        assert_eq!(results.total(), 4);
    }

    #[test]
    fn zones_are_sorted() {
        let mut results = ScanResults::new();
        results.add(profile("b", VendorKind::Hp, Some("zone-b")));
        results.add(profile("a", VendorKind::Hp, Some("zone-a")));
        assert_eq!(results.zones(), vec!["zone-a", "zone-b"]);
    }

    #[test]
    fn unknown_bucket_is_separate() {
        let mut results = ScanResults::new();
        results.add(profile("n", VendorKind::Dell, None));
        assert!(results.has_unknown());
        assert!(results.zones().is_empty());
        assert_eq!(results.total(), 1);
        let unknown = results.unknown_zone_profiles();
        assert_eq!(unknown.get(&VendorKind::Dell).unwrap().len(), 1);
    }

    #[test]
    fn profiles_keep_insertion_order() {
        let mut results = ScanResults::new();
        results.add(profile("z-02", VendorKind::Hp, Some("zone-a")));
        results.add(profile("z-01", VendorKind::Hp, Some("zone-a")));
        let names: Vec<&str> = results
            .profiles("zone-a", VendorKind::Hp)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["z-02", "z-01"]);
    }

    #[test]
    fn missing_bins_are_empty() {
        let results = ScanResults::new();
        assert!(results.profiles("zone-a", VendorKind::Hp).is_empty());
        assert!(results.vendors_in_zone("zone-a").is_empty());
        assert!(results.is_empty());
    }
}
