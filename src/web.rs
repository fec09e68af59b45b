//! JSON dashboard API
//!
//! Thin `axum` surface over the cache. Handlers never scan directly: reads
//! go through [`ScanCache::get`], explicit triggers through
//! [`ScanCache::force_refresh`] and answer 503 when a refresh for the same
//! key is already running.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::{ScanCache, ScanSnapshot};
use crate::cluster::ClusterMembership;

const UNKNOWN_ZONE: &str = "unknown";

#[derive(Debug, Deserialize)]
struct ServersQuery {
    zone_filter: Option<String>,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Deserialize)]
struct TriggerQuery {
    zone_filter: Option<String>,
}

/// One server as the dashboard shows it.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub vendor: String,
    /// `available` or `installed`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ZoneData {
    pub zone: String,
    pub vendors: BTreeMap<String, Vec<ServerInfo>>,
}

#[derive(Debug, Serialize)]
pub struct ClusterStats {
    pub name: String,
    pub installed_count: usize,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_servers: usize,
    pub available: usize,
    pub installed: usize,
    pub zone_count: usize,
}

#[derive(Debug, Serialize)]
pub struct CacheInfo {
    pub cached: bool,
    pub age_seconds: u64,
    pub next_refresh_seconds: u64,
}

/// Payload of `GET /api/servers`.
#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub zones: Vec<ZoneData>,
    pub clusters: Vec<ClusterStats>,
    pub summary: Summary,
    pub cache_info: CacheInfo,
    pub scanned_at: DateTime<Utc>,
}

pub fn router(cache: Arc<ScanCache>) -> Router {
    Router::new()
        .route("/api/servers", get(servers))
        .route("/api/cache/status", get(cache_status))
        .route("/api/cache/clear", post(cache_clear))
        .route("/api/scan/trigger", post(scan_trigger))
        .route("/api/clusters", get(clusters))
        .route("/api/zones", get(zones))
        .with_state(cache)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(cache: Arc<ScanCache>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("dashboard listening on http://{}", addr);
    axum::serve(listener, router(cache))
        .await
        .context("dashboard server failed")
}

type ApiError = (StatusCode, Json<Value>);

fn busy() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "a scan is already running, try again shortly"})),
    )
}

async fn servers(
    State(cache): State<Arc<ScanCache>>,
    Query(query): Query<ServersQuery>,
) -> Result<Json<DashboardData>, ApiError> {
    let zone_filter = query.zone_filter.as_deref();
    let snapshot = if query.force_refresh {
        cache.force_refresh(zone_filter).await.map_err(|_| busy())?
    } else {
        cache.get(zone_filter).await
    };

    let age = cache.age(zone_filter).await.unwrap_or_default();
    Ok(Json(dashboard_data(
        &snapshot,
        age.as_secs(),
        cache.ttl().as_secs(),
    )))
}

async fn cache_status(State(cache): State<Arc<ScanCache>>) -> Json<Value> {
    let entries = cache.status().await;
    Json(json!({
        "ttl_seconds": cache.ttl().as_secs(),
        "entries": entries,
    }))
}

async fn cache_clear(State(cache): State<Arc<ScanCache>>) -> Json<Value> {
    cache.clear().await;
    Json(json!({"status": "cleared"}))
}

async fn scan_trigger(
    State(cache): State<Arc<ScanCache>>,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<Value>, ApiError> {
    let snapshot = cache
        .force_refresh(query.zone_filter.as_deref())
        .await
        .map_err(|_| busy())?;
    Ok(Json(json!({
        "status": "completed",
        "total_servers": snapshot.results.total(),
        "scanned_at": snapshot.scanned_at,
    })))
}

async fn clusters(State(cache): State<Arc<ScanCache>>) -> Json<Value> {
    let names: Vec<String> = cache
        .scanner()
        .agent_filter()
        .map(|filter| filter.cluster_names().to_vec())
        .unwrap_or_default();
    Json(json!({"clusters": names}))
}

async fn zones(State(cache): State<Arc<ScanCache>>) -> Json<Value> {
    // Cached view when available; a cold cache scans once.
    let snapshot = match cache.peek(None).await {
        Some(snapshot) => snapshot,
        None => cache.get(None).await,
    };
    let mut zones: Vec<String> = snapshot
        .results
        .zones()
        .into_iter()
        .map(str::to_string)
        .collect();
    if snapshot.results.has_unknown() {
        zones.push(UNKNOWN_ZONE.to_string());
    }
    Json(json!({"zones": zones}))
}

/// Which cluster a server is installed in, if any.
fn installed_in<'a>(membership: &'a ClusterMembership, name: &str) -> Option<&'a str> {
    membership
        .iter()
        .find(|(_, names)| names.contains(name))
        .map(|(cluster, _)| cluster.as_str())
}

fn dashboard_data(snapshot: &ScanSnapshot, age_seconds: u64, ttl_seconds: u64) -> DashboardData {
    let results = &snapshot.results;
    let membership = &snapshot.installed_by_cluster;

    let mut installed = 0usize;
    let mut to_info = |profile: &crate::profile::ServerProfile| {
        let cluster = installed_in(membership, &profile.name);
        if cluster.is_some() {
            installed += 1;
        }
        ServerInfo {
            name: profile.name.clone(),
            vendor: profile.vendor.to_string(),
            status: if cluster.is_some() {
                "installed"
            } else {
                "available"
            },
            cluster: cluster.map(str::to_string),
            serial_number: profile.serial_number.clone(),
            management_address: profile.management_address.clone(),
        }
    };

    let mut zones = Vec::new();
    for zone in results.zones() {
        let mut vendors = BTreeMap::new();
        for vendor in results.vendors_in_zone(zone) {
            let mut servers: Vec<ServerInfo> =
                results.profiles(zone, vendor).iter().map(&mut to_info).collect();
            servers.sort_by(|a, b| a.name.cmp(&b.name));
            vendors.insert(vendor.to_string(), servers);
        }
        zones.push(ZoneData {
            zone: zone.to_string(),
            vendors,
        });
    }

    if results.has_unknown() {
        let mut vendors = BTreeMap::new();
        for (vendor, profiles) in results.unknown_zone_profiles() {
            let mut servers: Vec<ServerInfo> = profiles.iter().map(&mut to_info).collect();
            servers.sort_by(|a, b| a.name.cmp(&b.name));
            vendors.insert(vendor.to_string(), servers);
        }
        zones.push(ZoneData {
            zone: UNKNOWN_ZONE.to_string(),
            vendors,
        });
    }

    let clusters = membership
        .iter()
        .map(|(name, names)| ClusterStats {
            name: name.clone(),
            installed_count: names.len(),
        })
        .collect();

    let total = results.total();
    DashboardData {
        zones,
        clusters,
        summary: Summary {
            total_servers: total,
            available: total - installed,
            installed,
            zone_count: results.zones().len(),
        },
        cache_info: CacheInfo {
            cached: true,
            age_seconds,
            next_refresh_seconds: ttl_seconds.saturating_sub(age_seconds),
        },
        scanned_at: snapshot.scanned_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ServerProfile;
    use crate::results::ScanResults;
    use crate::vendor::VendorKind;
    use std::collections::BTreeSet;

    fn snapshot() -> ScanSnapshot {
        let mut results = ScanResults::new();
        for (name, vendor, zone) in [
            ("ocp4-hypershift-zone-a-02", VendorKind::Hp, Some("zone-a")),
            ("ocp4-hypershift-zone-a-01", VendorKind::Hp, Some("zone-a")),
            ("ocp4-hypershift-zone-b-01", VendorKind::Dell, Some("zone-b")),
            ("stray-box", VendorKind::Cisco, None),
        ] {
            results.add(
                ServerProfile::new(name, vendor)
                    .unwrap()
                    .with_zone(zone.map(str::to_string)),
            );
        }

        let mut membership = ClusterMembership::new();
        membership.insert(
            "prod-1".to_string(),
            BTreeSet::from(["ocp4-hypershift-zone-b-01".to_string()]),
        );
        membership.insert("prod-2".to_string(), BTreeSet::new());

        ScanSnapshot {
            results,
            installed_by_cluster: membership,
            scanned_at: Utc::now(),
        }
    }

    #[test]
    fn installed_servers_are_marked_with_their_cluster() {
        let data = dashboard_data(&snapshot(), 10, 3600);

        let zone_b = data.zones.iter().find(|z| z.zone == "zone-b").unwrap();
        let dell = &zone_b.vendors["DELL"];
        assert_eq!(dell[0].status, "installed");
        assert_eq!(dell[0].cluster.as_deref(), Some("prod-1"));

        let zone_a = data.zones.iter().find(|z| z.zone == "zone-a").unwrap();
        assert!(zone_a.vendors["HP"].iter().all(|s| s.status == "available"));
    }

    #[test]
    fn servers_are_sorted_by_name_within_a_bin() {
        let data = dashboard_data(&snapshot(), 0, 3600);
        let zone_a = data.zones.iter().find(|z| z.zone == "zone-a").unwrap();
        let names: Vec<&str> = zone_a.vendors["HP"].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["ocp4-hypershift-zone-a-01", "ocp4-hypershift-zone-a-02"]
        );
    }

    #[test]
    fn summary_counts_add_up() {
        let data = dashboard_data(&snapshot(), 0, 3600);
        assert_eq!(data.summary.total_servers, 4);
        assert_eq!(data.summary.installed, 1);
        assert_eq!(data.summary.available, 3);
        assert_eq!(data.summary.zone_count, 2);
    }

    #[test]
    fn unknown_zone_appears_last() {
        let data = dashboard_data(&snapshot(), 0, 3600);
        assert_eq!(data.zones.last().unwrap().zone, UNKNOWN_ZONE);
    }

    #[test]
    fn cache_info_counts_down_to_the_next_refresh() {
        let data = dashboard_data(&snapshot(), 100, 3600);
        assert_eq!(data.cache_info.age_seconds, 100);
        assert_eq!(data.cache_info.next_refresh_seconds, 3500);
    }

    #[test]
    fn cluster_stats_include_empty_clusters() {
        let data = dashboard_data(&snapshot(), 0, 3600);
        assert_eq!(data.clusters.len(), 2);
        assert_eq!(data.clusters[0].name, "prod-1");
        assert_eq!(data.clusters[0].installed_count, 1);
        assert_eq!(data.clusters[1].installed_count, 0);
    }
}
