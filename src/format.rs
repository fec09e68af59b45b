//! Scan result rendering for the CLI
//!
//! Three renderings of the same zone/vendor grouping: an indented list, an
//! aligned table, and JSON. Servers are sorted by name inside each bin.

use clap::ValueEnum;
use serde_json::json;

use crate::profile::ServerProfile;
use crate::results::ScanResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    List,
    Table,
    Json,
}

const EMPTY_MESSAGE: &str = "No servers found matching the pattern.";

pub fn render(results: &ScanResults, format: OutputFormat) -> String {
    match format {
        OutputFormat::List => render_list(results),
        OutputFormat::Table => render_table(results),
        OutputFormat::Json => render_json(results),
    }
}

fn sorted_names(profiles: &[ServerProfile]) -> Vec<&str> {
    let mut names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    names.sort_unstable();
    names
}

fn render_list(results: &ScanResults) -> String {
    if results.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }

    let mut lines = Vec::new();
    for zone in results.zones() {
        lines.push(format!("\nZone: {zone}"));
        lines.push("=".repeat(60));
        for vendor in results.vendors_in_zone(zone) {
            lines.push(format!("\n  {vendor}:"));
            for name in sorted_names(results.profiles(zone, vendor)) {
                lines.push(format!("    - {name}"));
            }
        }
    }

    if results.has_unknown() {
        lines.push("\nUnknown Zone:".to_string());
        lines.push("=".repeat(60));
        for (vendor, profiles) in results.unknown_zone_profiles() {
            lines.push(format!("\n  {vendor}:"));
            for name in sorted_names(profiles) {
                lines.push(format!("    - {name}"));
            }
        }
    }

    lines.join("\n")
}

fn render_table(results: &ScanResults) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "\n{:<20} {:<10} {:<50}",
        "ZONE", "VENDOR", "SERVER NAME"
    ));
    lines.push("=".repeat(80));

    for zone in results.zones() {
        let vendors = results.vendors_in_zone(zone);
        let mut first_in_zone = true;
        for vendor in vendors {
            for name in sorted_names(results.profiles(zone, vendor)) {
                // Zone appears only on its first row.
                let zone_cell = if first_in_zone { zone } else { "" };
                first_in_zone = false;
                lines.push(format!(
                    "{:<20} {:<10} {:<50}",
                    zone_cell,
                    vendor.to_string(),
                    name
                ));
            }
        }
    }

    if results.has_unknown() {
        let mut first = true;
        for (vendor, profiles) in results.unknown_zone_profiles() {
            for name in sorted_names(profiles) {
                let zone_cell = if first { "Unknown" } else { "" };
                first = false;
                lines.push(format!(
                    "{:<20} {:<10} {:<50}",
                    zone_cell,
                    vendor.to_string(),
                    name
                ));
            }
        }
    }

    if results.is_empty() {
        lines.push(EMPTY_MESSAGE.to_string());
    }

    lines.join("\n")
}

fn render_json(results: &ScanResults) -> String {
    let mut zones = serde_json::Map::new();
    for zone in results.zones() {
        let mut vendors = serde_json::Map::new();
        for vendor in results.vendors_in_zone(zone) {
            let mut profiles: Vec<&ServerProfile> =
                results.profiles(zone, vendor).iter().collect();
            profiles.sort_by(|a, b| a.name.cmp(&b.name));
            vendors.insert(vendor.to_string(), json!(profiles));
        }
        zones.insert(zone.to_string(), vendors.into());
    }

    if results.has_unknown() {
        let mut vendors = serde_json::Map::new();
        for (vendor, bucket) in results.unknown_zone_profiles() {
            let mut profiles: Vec<&ServerProfile> = bucket.iter().collect();
            profiles.sort_by(|a, b| a.name.cmp(&b.name));
            vendors.insert(vendor.to_string(), json!(profiles));
        }
        zones.insert("unknown".to_string(), vendors.into());
    }

    let output = json!({
        "total_servers": results.total(),
        "zones": zones,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::error!("failed to render JSON output: {}", e);
            String::new()
        }
    }
}
