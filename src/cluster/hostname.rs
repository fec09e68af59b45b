//! Hostname extraction from Agent resources
//!
//! Agents frequently report a MAC address as their discovered hostname
//! before the real name is assigned. The rules:
//!
//! 1. prefer `status.inventory.hostname` when it is not MAC-shaped and
//!    matches the managed-name convention;
//! 2. if it is a MAC, fall back to `status.requestedHostname`;
//! 3. the fallback must itself match the convention;
//! 4. nothing valid -> skip the Agent.
//!
//! The precedence order is load-bearing: reordering changes which servers
//! are treated as already provisioned.

use std::sync::OnceLock;

use regex::Regex;

use crate::zone::PROFILE_PREFIX;

/// Six colon/dash-separated hex pairs, or twelve contiguous hex digits.
fn mac_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$|^([0-9A-Fa-f]{12})$")
            .expect("invalid MAC pattern")
    })
}

/// Whether a string looks like a MAC address.
pub fn is_mac_address(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && mac_pattern().is_match(trimmed)
}

/// Whether a name belongs to the managed fleet.
pub fn is_valid_server_name(name: &str) -> bool {
    !name.is_empty() && name.to_lowercase().contains(PROFILE_PREFIX)
}

/// Apply the precedence rules to the two hostname fields of an Agent.
pub fn extract_hostname(hostname: Option<&str>, requested: Option<&str>) -> Option<String> {
    if let Some(h) = hostname {
        if !is_mac_address(h) && is_valid_server_name(h) {
            return Some(h.to_string());
        }
    }

    if let Some(r) = requested {
        if is_valid_server_name(r) {
            return Some(r.to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_shapes() {
        assert!(is_mac_address("aa:bb:cc:dd:ee:ff"));
        assert!(is_mac_address("AA-BB-CC-DD-EE-FF"));
        assert!(is_mac_address("aabbccddeeff"));
        assert!(!is_mac_address("not-a-mac"));
        assert!(!is_mac_address("zone-a-01"));
        assert!(!is_mac_address(""));
        assert!(!is_mac_address("aa:bb:cc:dd:ee"));
    }

    #[test]
    fn hostname_preferred_when_valid() {
        assert_eq!(
            extract_hostname(
                Some("ocp4-hypershift-zone-a-01"),
                Some("ocp4-hypershift-zone-b-02")
            )
            .as_deref(),
            Some("ocp4-hypershift-zone-a-01")
        );
    }

    #[test]
    fn mac_hostname_falls_back_to_requested() {
        assert_eq!(
            extract_hostname(Some("aa:bb:cc:dd:ee:ff"), Some("ocp4-hypershift-zone-a-01"))
                .as_deref(),
            Some("ocp4-hypershift-zone-a-01")
        );
    }

    #[test]
    fn fallback_must_match_the_convention() {
        assert!(extract_hostname(Some("aa:bb:cc:dd:ee:ff"), Some("random-host")).is_none());
        assert!(extract_hostname(Some("aa:bb:cc:dd:ee:ff"), None).is_none());
    }

    #[test]
    fn invalid_hostname_still_tries_requested() {
        // hostname is neither MAC nor managed-name; the requested hostname
        // can still rescue the Agent.
        assert_eq!(
            extract_hostname(Some("localhost"), Some("ocp4-hypershift-zone-c-03")).as_deref(),
            Some("ocp4-hypershift-zone-c-03")
        );
    }

    #[test]
    fn nothing_valid_skips() {
        assert!(extract_hostname(None, None).is_none());
        assert!(extract_hostname(Some("localhost"), Some("other")).is_none());
    }
}
