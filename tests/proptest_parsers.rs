//! Property-based tests using proptest
//!
//! Randomized inputs for the zone classifier and the hostname rules: the
//! classifier must be a pure function, managed names must always classify,
//! and MAC-shaped strings must never pass as server names.

use proptest::prelude::*;

use rackscan::cluster::hostname::{extract_hostname, is_mac_address, is_valid_server_name};
use rackscan::zone::extract_zone;

// Alphabetic segments only: a digit run or `l4` inside the zone would be
// eaten as the terminator, and `data`/`h100`/`v100` are class tokens, not
// zones (excluded by never starting a segment with 'd').
fn arb_zone() -> impl Strategy<Value = String> {
    "[a-ce-z][a-z]{2,7}(-[a-z]{1,6})?".prop_map(|z| z)
}

fn arb_colon_mac() -> impl Strategy<Value = String> {
    prop::collection::vec("[0-9a-fA-F]{2}", 6).prop_map(|pairs| pairs.join(":"))
}

proptest! {
    /// Same input, same output: the classifier holds no state.
    #[test]
    fn classifier_is_deterministic(name in ".{0,64}") {
        prop_assert_eq!(extract_zone(&name), extract_zone(&name));
    }

    /// Every name following the plain convention classifies to its zone,
    /// lowercased.
    #[test]
    fn conventional_names_always_classify(zone in arb_zone(), index in 0u32..1000) {
        let name = format!("ocp4-hypershift-{zone}-{index:02}");
        prop_assert_eq!(extract_zone(&name), Some(zone.to_lowercase()));
    }

    /// Hardware-class names classify to the zone, not the class token.
    #[test]
    fn class_tokens_never_leak_into_the_zone(
        class in prop_oneof!["data", "h100", "v100"],
        zone in arb_zone(),
        index in 0u32..1000,
    ) {
        let name = format!("ocp4-hypershift-{class}-{zone}-{index:02}");
        let extracted = extract_zone(&name);
        prop_assert_eq!(extracted, Some(zone.to_lowercase()));
    }

    /// Classification is case-insensitive over the whole name.
    #[test]
    fn classification_ignores_case(zone in arb_zone(), index in 0u32..1000) {
        let lower = format!("ocp4-hypershift-{zone}-{index:02}");
        let upper = lower.to_uppercase();
        prop_assert_eq!(extract_zone(&lower), extract_zone(&upper));
    }

    /// Names without the managed prefix never classify.
    #[test]
    fn foreign_names_never_classify(name in "[a-np-z][a-z0-9-]{0,40}") {
        // anything not starting with 'o' cannot carry the prefix
        prop_assert_eq!(extract_zone(&name), None);
    }

    /// Colon-separated MACs are always recognized, in any case mix.
    #[test]
    fn colon_macs_are_recognized(mac in arb_colon_mac()) {
        prop_assert!(is_mac_address(&mac));
        prop_assert!(is_mac_address(&mac.replace(':', "-")));
        prop_assert!(is_mac_address(&mac.replace(':', "")));
    }

    /// A MAC-shaped hostname is never accepted as a server name, so an
    /// Agent reporting one falls through to its requested hostname.
    #[test]
    fn mac_hostnames_fall_back(mac in arb_colon_mac(), zone in arb_zone()) {
        let requested = format!("ocp4-hypershift-{zone}-01");
        let extracted = extract_hostname(Some(mac.as_str()), Some(requested.as_str()));
        prop_assert_eq!(extracted.as_deref(), Some(requested.as_str()));
    }

    /// Truncated hex strings are not MACs.
    #[test]
    fn wrong_length_hex_is_not_a_mac(hex in "[0-9a-f]{1,11}") {
        prop_assert!(!is_mac_address(&hex));
    }

    /// Only names carrying the managed prefix count as server names.
    #[test]
    fn server_names_require_the_prefix(suffix in "[a-z0-9-]{0,24}") {
        let managed = format!("ocp4-hypershift-{suffix}");
        let foreign = format!("ocp5-other-{suffix}");
        prop_assert!(is_valid_server_name(&managed));
        prop_assert!(!is_valid_server_name(&foreign));
    }
}
