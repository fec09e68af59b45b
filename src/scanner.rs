//! Scan orchestration
//!
//! One scan: compute the installed-name set (optional), fan out across the
//! configured vendor backends concurrently, then classify, filter, and bin
//! every profile. A failing backend or cluster degrades the result instead
//! of aborting it; the aggregated model is only exposed once complete.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cluster::{AgentFilter, ClusterMembership};
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::profile::HardwareDetail;
use crate::results::ScanResults;
use crate::vendor::{build_backends, VendorBackend, VendorKind};
use crate::zone::{self, ZoneFilter, DEFAULT_PATTERN};

/// Parameters of one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Name pattern, matched case-insensitively from the start of the name.
    pub pattern: String,
    /// Restrict to these vendors; `None` scans every configured backend.
    pub vendors: Option<Vec<VendorKind>>,
    /// Zone allow-list (unknown zones always pass).
    pub zone_filter: ZoneFilter,
    /// Hide servers already present in a cluster registry.
    pub filter_installed: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            vendors: None,
            zone_filter: ZoneFilter::default(),
            filter_installed: true,
        }
    }
}

/// Coordinates backends, the installed filter, and zone classification.
pub struct Scanner {
    backends: Vec<Arc<dyn VendorBackend>>,
    agent_filter: Option<Arc<AgentFilter>>,
}

impl Scanner {
    /// Assemble from explicit parts. Test seam: stub backends go here.
    pub fn new(
        backends: Vec<Arc<dyn VendorBackend>>,
        agent_filter: Option<Arc<AgentFilter>>,
    ) -> Self {
        Self {
            backends,
            agent_filter,
        }
    }

    /// Assemble from configuration. Fatal when no backend is configured -
    /// there would be nothing to scan.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let backends = build_backends(config);
        if backends.is_empty() {
            return Err(ConfigError::NoVendorsConfigured);
        }

        let agent_filter = config
            .cluster
            .as_ref()
            .filter(|cluster| cluster.is_configured())
            .map(|cluster| Arc::new(AgentFilter::new(cluster.clone(), config.k8s_timeout)));
        if agent_filter.is_some() {
            tracing::info!("Agent filter configured");
        }

        Ok(Self {
            backends,
            agent_filter,
        })
    }

    pub fn agent_filter(&self) -> Option<&Arc<AgentFilter>> {
        self.agent_filter.as_ref()
    }

    /// Configured vendors, in registration order.
    pub fn vendors(&self) -> Vec<VendorKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Installed servers per cluster, for reporting layers. Empty when no
    /// filter is configured.
    pub async fn cluster_membership(&self) -> ClusterMembership {
        match &self.agent_filter {
            Some(filter) => filter.membership().await,
            None => ClusterMembership::new(),
        }
    }

    /// Run one scan to completion.
    pub async fn scan(&self, opts: &ScanOptions) -> ScanResults {
        let installed = if opts.filter_installed {
            self.installed_names().await
        } else {
            BTreeSet::new()
        };

        let fetches = self
            .backends
            .iter()
            .filter(|backend| match &opts.vendors {
                Some(allowed) => allowed.contains(&backend.kind()),
                None => true,
            })
            .map(|backend| {
                let backend = Arc::clone(backend);
                let pattern = opts.pattern.clone();
                async move {
                    let outcome = backend.fetch_profiles(&pattern).await;
                    // Session teardown happens no matter how the fetch went.
                    backend.release().await;
                    (backend.kind(), outcome)
                }
            });

        let mut results = ScanResults::new();
        for (vendor, outcome) in futures::future::join_all(fetches).await {
            let profiles = match outcome {
                Ok(profiles) => {
                    tracing::info!("found {} profiles in {}", profiles.len(), vendor);
                    profiles
                }
                Err(e) => {
                    tracing::error!("error scanning {}: {}", vendor, e);
                    continue;
                }
            };

            for profile in profiles {
                if opts.filter_installed && installed.contains(&profile.name) {
                    tracing::debug!("skipping installed server: {}", profile.name);
                    continue;
                }

                let profile_zone = zone::extract_zone(&profile.name);
                if !opts.zone_filter.is_allowed(profile_zone.as_deref()) {
                    tracing::debug!(
                        "skipping server in non-allowed zone: {} (zone: {:?})",
                        profile.name,
                        profile_zone
                    );
                    continue;
                }

                results.add(profile.with_zone(profile_zone));
            }
        }

        tracing::info!("scan complete, total servers: {}", results.total());
        results
    }

    /// Single-server detail lookup across all configured backends; first
    /// hit wins. Never used by bulk scans.
    pub async fn lookup(&self, name: &str) -> Option<(VendorKind, HardwareDetail)> {
        for backend in &self.backends {
            let found = match backend.fetch_one(name).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("lookup against {} failed: {}", backend.kind(), e);
                    None
                }
            };
            backend.release().await;
            if let Some(detail) = found {
                return Some((backend.kind(), detail));
            }
        }
        None
    }

    /// Release every backend session. Idempotent.
    pub async fn release_all(&self) {
        for backend in &self.backends {
            backend.release().await;
        }
    }

    async fn installed_names(&self) -> BTreeSet<String> {
        let Some(filter) = &self.agent_filter else {
            return BTreeSet::new();
        };
        let names = filter.installed_names().await;
        tracing::info!("found {} installed servers to filter out", names.len());
        names
    }
}
