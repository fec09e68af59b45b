//! Scan result cache
//!
//! Scans are expensive (several console logins, full profile listings, one
//! API call per cluster), so the dashboard never scans on the request path
//! when it can avoid it. Results live here keyed by the zone-filter string,
//! age out after a TTL, and are refreshed by at most one task at a time per
//! key; concurrent readers of a stale key wait for that one refresh instead
//! of piling on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cluster::ClusterMembership;
use crate::error::CacheBusy;
use crate::results::ScanResults;
use crate::scanner::{ScanOptions, Scanner};
use crate::zone::ZoneFilter;

/// Time source, swappable in tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The real clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// One completed scan, frozen for sharing.
pub struct ScanSnapshot {
    pub results: ScanResults,
    pub installed_by_cluster: ClusterMembership,
    pub scanned_at: DateTime<Utc>,
}

struct CacheEntry {
    snapshot: Arc<ScanSnapshot>,
    created_at: Instant,
}

/// Freshness report for one cache key.
#[derive(Debug, Serialize)]
pub struct KeyStatus {
    pub key: String,
    pub total_servers: usize,
    pub age_seconds: u64,
    pub ttl_seconds: u64,
    pub scanned_at: DateTime<Utc>,
}

/// TTL cache over [`Scanner`] runs, one entry per zone-filter string.
pub struct ScanCache {
    scanner: Arc<Scanner>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
    // One gate per key serializes refreshes for that key.
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ScanCache {
    pub fn new(scanner: Arc<Scanner>, ttl: Duration) -> Self {
        Self::with_clock(scanner, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(scanner: Arc<Scanner>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            scanner,
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    /// The key a zone-filter string maps to. Intentionally ignores every
    /// other scan parameter.
    pub fn cache_key(zone_filter: Option<&str>) -> String {
        format!("dashboard_{}", zone_filter.unwrap_or("all"))
    }

    /// Return the snapshot for this zone filter, scanning if the entry is
    /// missing or stale. Callers hitting a stale key while another one is
    /// refreshing it block until that refresh lands, then share its result.
    pub async fn get(&self, zone_filter: Option<&str>) -> Arc<ScanSnapshot> {
        let key = Self::cache_key(zone_filter);
        if let Some(snapshot) = self.fresh(&key).await {
            tracing::debug!("cache hit for '{}'", key);
            return snapshot;
        }

        let gate = self.gate(&key).await;
        let _held = gate.lock().await;

        // Someone may have refreshed while we waited on the gate.
        if let Some(snapshot) = self.fresh(&key).await {
            tracing::debug!("cache refreshed by another task for '{}'", key);
            return snapshot;
        }

        self.refresh(&key, zone_filter).await
    }

    /// Fresh snapshot for this zone filter, or `None` without scanning.
    pub async fn peek(&self, zone_filter: Option<&str>) -> Option<Arc<ScanSnapshot>> {
        self.fresh(&Self::cache_key(zone_filter)).await
    }

    /// Refresh now, skipping the freshness check. Fails fast when a refresh
    /// for the same key is already running.
    pub async fn force_refresh(
        &self,
        zone_filter: Option<&str>,
    ) -> Result<Arc<ScanSnapshot>, CacheBusy> {
        let key = Self::cache_key(zone_filter);
        let gate = self.gate(&key).await;
        let Ok(_held) = gate.try_lock() else {
            tracing::info!("refresh for '{}' already in flight", key);
            return Err(CacheBusy);
        };
        Ok(self.refresh(&key, zone_filter).await)
    }

    /// Drop every entry, including the installed-server memo.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
        if let Some(filter) = self.scanner.agent_filter() {
            filter.clear_cache().await;
        }
        tracing::info!("cache cleared");
    }

    /// Freshness report across all keys, for the status endpoint.
    pub async fn status(&self) -> Vec<KeyStatus> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        let mut report: Vec<KeyStatus> = entries
            .iter()
            .map(|(key, entry)| KeyStatus {
                key: key.clone(),
                total_servers: entry.snapshot.results.total(),
                age_seconds: now.saturating_duration_since(entry.created_at).as_secs(),
                ttl_seconds: self.ttl.as_secs(),
                scanned_at: entry.snapshot.scanned_at,
            })
            .collect();
        report.sort_by(|a, b| a.key.cmp(&b.key));
        report
    }

    /// Age of one key's entry, if present.
    pub async fn age(&self, zone_filter: Option<&str>) -> Option<Duration> {
        let key = Self::cache_key(zone_filter);
        let entries = self.entries.lock().await;
        entries
            .get(&key)
            .map(|entry| self.clock.now().saturating_duration_since(entry.created_at))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Periodically re-scan the unfiltered key so dashboard reads stay warm.
    /// Skipped rounds (a refresh already running) are fine; the next tick
    /// catches up.
    pub fn spawn_refresher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(
                "background refresh every {} second(s)",
                interval.as_secs()
            );
            loop {
                tokio::time::sleep(interval).await;
                tracing::info!("background refresh starting");
                match cache.force_refresh(None).await {
                    Ok(snapshot) => tracing::info!(
                        "background refresh done, {} server(s)",
                        snapshot.results.total()
                    ),
                    Err(CacheBusy) => {
                        tracing::debug!("background refresh skipped, one already running")
                    }
                }
            }
        })
    }

    async fn fresh(&self, key: &str) -> Option<Arc<ScanSnapshot>> {
        let entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        let age = self.clock.now().saturating_duration_since(entry.created_at);
        if age < self.ttl {
            Some(Arc::clone(&entry.snapshot))
        } else {
            None
        }
    }

    async fn gate(&self, key: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(
            gates
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn refresh(&self, key: &str, zone_filter: Option<&str>) -> Arc<ScanSnapshot> {
        tracing::info!("scanning for cache key '{}'", key);

        // The memoized installed-server set must not outlive the snapshot
        // it was computed for.
        if let Some(filter) = self.scanner.agent_filter() {
            filter.clear_cache().await;
        }

        // The dashboard marks installed servers instead of hiding them, so
        // the cached scan keeps them and carries the membership alongside.
        let opts = ScanOptions {
            zone_filter: ZoneFilter::from_str(zone_filter),
            filter_installed: false,
            ..Default::default()
        };
        let results = self.scanner.scan(&opts).await;
        let installed_by_cluster = self.scanner.cluster_membership().await;

        let snapshot = Arc::new(ScanSnapshot {
            results,
            installed_by_cluster,
            scanned_at: Utc::now(),
        });

        self.entries.lock().await.insert(
            key.to_string(),
            CacheEntry {
                snapshot: Arc::clone(&snapshot),
                created_at: self.clock.now(),
            },
        );
        snapshot
    }
}
