//! Server profile value object
//!
//! The normalized record every backend produces. Immutable after
//! construction; zone attachment returns a new value.

use serde::Serialize;

use crate::vendor::VendorKind;

/// One server profile as reported by a vendor management console.
///
/// Only `name` and `vendor` are guaranteed; everything else depends on what
/// the vendor's bulk listing already carried. Detail fields for a single
/// server come from [`HardwareDetail`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerProfile {
    pub name: String,
    pub vendor: VendorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ServerProfile {
    /// Create a profile with identity fields only.
    ///
    /// Returns `None` for an empty name; backends skip such entries rather
    /// than propagate them.
    pub fn new(name: impl Into<String>, vendor: VendorKind) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            vendor,
            zone: None,
            mac_address: None,
            management_address: None,
            serial_number: None,
            model: None,
        })
    }

    /// Immutable update: same profile with the classified zone attached.
    pub fn with_zone(&self, zone: Option<String>) -> Self {
        Self {
            zone,
            ..self.clone()
        }
    }
}

/// Single-server lookup result (MAC + BMC/iLO/iDRAC address).
///
/// Used by callers that query one known server; never populated during bulk
/// scans to keep the expensive call count proportional to the number of
/// backends, not the number of servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HardwareDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        assert!(ServerProfile::new("", VendorKind::Hp).is_none());
    }

    #[test]
    fn with_zone_preserves_identity() {
        let p = ServerProfile::new("ocp4-hypershift-zone-a-01", VendorKind::Dell).unwrap();
        let zoned = p.with_zone(Some("zone-a".to_string()));
        assert_eq!(zoned.name, p.name);
        assert_eq!(zoned.vendor, VendorKind::Dell);
        assert_eq!(zoned.zone.as_deref(), Some("zone-a"));
        // original untouched
        assert!(p.zone.is_none());
    }
}
