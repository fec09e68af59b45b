//! Installed-server filter backed by cluster registries
//!
//! Servers that already joined a cluster exist there as `Agent` custom
//! resources (`agent-install.openshift.io/v1beta1`). This module queries
//! every configured cluster's API server for those Agents, extracts server
//! names via [`hostname`], and unions them into the set of names a scan
//! should hide. A failing cluster contributes zero names and never stops
//! the others.

pub mod hostname;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::ClusterConfig;
use crate::error::ClusterError;

const AGENT_GROUP: &str = "agent-install.openshift.io";
const AGENT_VERSION: &str = "v1beta1";
const AGENT_PLURAL: &str = "agents";

/// Which servers each cluster holds. Ephemeral; recomputed per invocation
/// (the filter memoizes one result until [`AgentFilter::clear_cache`]).
pub type ClusterMembership = BTreeMap<String, BTreeSet<String>>;

/// Typed view of an Agent list response. Every non-identity field is
/// optional; absence decodes to `None` instead of being probed for.
#[derive(Debug, Deserialize)]
struct AgentList {
    #[serde(default)]
    items: Vec<Agent>,
}

#[derive(Debug, Deserialize)]
struct Agent {
    #[serde(default)]
    status: AgentStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentStatus {
    #[serde(default)]
    inventory: AgentInventory,
    requested_hostname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentInventory {
    hostname: Option<String>,
}

impl Agent {
    fn server_name(&self) -> Option<String> {
        hostname::extract_hostname(
            self.status.inventory.hostname.as_deref(),
            self.status.requested_hostname.as_deref(),
        )
    }
}

/// Queries Agent resources across the configured clusters.
pub struct AgentFilter {
    config: ClusterConfig,
    timeout: Duration,
    membership: Mutex<Option<ClusterMembership>>,
}

impl AgentFilter {
    pub fn new(config: ClusterConfig, timeout: Duration) -> Self {
        Self {
            config,
            timeout,
            membership: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn cluster_names(&self) -> &[String] {
        &self.config.clusters
    }

    /// Installed server names per cluster.
    ///
    /// Memoized until [`clear_cache`](Self::clear_cache); recomputing under
    /// unchanged cluster state yields the same result.
    pub async fn membership(&self) -> ClusterMembership {
        {
            let cached = self.membership.lock().await;
            if let Some(membership) = cached.as_ref() {
                return membership.clone();
            }
        }

        let membership = self.query_all().await;
        *self.membership.lock().await = Some(membership.clone());
        membership
    }

    /// Union of installed names across all clusters.
    pub async fn installed_names(&self) -> BTreeSet<String> {
        self.membership()
            .await
            .into_values()
            .flatten()
            .collect()
    }

    /// Drop the memoized membership; the next query hits the clusters again.
    pub async fn clear_cache(&self) {
        *self.membership.lock().await = None;
    }

    async fn query_all(&self) -> ClusterMembership {
        tracing::info!(
            "checking Agent resources across {} cluster(s)",
            self.config.clusters.len()
        );

        let queries = self
            .config
            .clusters
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| async move {
                let result = self.query_cluster(index, name).await;
                (name.clone(), result)
            });

        let mut membership = ClusterMembership::new();
        for (cluster, result) in futures::future::join_all(queries).await {
            match result {
                Ok(names) => {
                    tracing::info!("cluster '{}': {} Agent(s)", cluster, names.len());
                    membership.insert(cluster, names);
                }
                Err(e) => {
                    // Classified per-cluster failure: log, contribute nothing.
                    tracing::warn!("failed to query cluster '{}': {}", cluster, e);
                    membership.insert(cluster, BTreeSet::new());
                }
            }
        }

        let total: usize = membership.values().map(BTreeSet::len).sum();
        tracing::info!("total installed servers across all clusters: {}", total);
        membership
    }

    async fn query_cluster(
        &self,
        index: usize,
        cluster: &str,
    ) -> Result<BTreeSet<String>, ClusterError> {
        let endpoint = self.config.endpoint_for(cluster);
        tracing::debug!("querying cluster '{}' at {}", cluster, endpoint);

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .build()?;

        let path = match self.config.namespace.as_deref() {
            Some(ns) => format!(
                "/apis/{AGENT_GROUP}/{AGENT_VERSION}/namespaces/{ns}/{AGENT_PLURAL}"
            ),
            None => format!("/apis/{AGENT_GROUP}/{AGENT_VERSION}/{AGENT_PLURAL}"),
        };
        let url = format!("{endpoint}{path}");

        let mut request = client.get(&url);
        if let Some(token) = self.config.token_for(index) {
            request = request.bearer_auth(token);
        } else if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            tracing::warn!("basic auth is deprecated; use token authentication instead");
            request = request.basic_auth(user, Some(pass));
        } else {
            return Err(ClusterError::NoCredentials);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClusterError::Timeout
            } else {
                ClusterError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClusterError::from_status(status.as_u16()));
        }

        let list: AgentList = response.json().await?;
        let names = list
            .items
            .iter()
            .filter_map(Agent::server_name)
            .collect::<BTreeSet<String>>();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_decoding_tolerates_missing_status() {
        let list: AgentList = serde_json::from_str(r#"{"items": [{}]}"#).unwrap();
        assert_eq!(list.items.len(), 1);
        assert!(list.items[0].server_name().is_none());
    }

    #[test]
    fn agent_name_follows_precedence() {
        let list: AgentList = serde_json::from_value(serde_json::json!({
            "items": [
                {"status": {
                    "inventory": {"hostname": "ocp4-hypershift-zone-a-01"},
                    "requestedHostname": "ocp4-hypershift-ignored"
                }},
                {"status": {
                    "inventory": {"hostname": "aa:bb:cc:dd:ee:ff"},
                    "requestedHostname": "ocp4-hypershift-zone-b-02"
                }},
                {"status": {
                    "inventory": {"hostname": "aa:bb:cc:dd:ee:ff"},
                    "requestedHostname": "unmanaged-host"
                }}
            ]
        }))
        .unwrap();

        let names: Vec<Option<String>> = list.items.iter().map(Agent::server_name).collect();
        assert_eq!(names[0].as_deref(), Some("ocp4-hypershift-zone-a-01"));
        assert_eq!(names[1].as_deref(), Some("ocp4-hypershift-zone-b-02"));
        assert!(names[2].is_none());
    }

    #[test]
    fn empty_list_decodes() {
        let list: AgentList = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
    }
}
