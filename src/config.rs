//! Configuration management
//!
//! Everything comes from environment variables (optionally loaded from a
//! `.env` file). Startup validation is the one place a missing credential is
//! fatal: a vendor with no credentials at all is silently excluded, but a
//! partially configured one - or zero configured vendors - is an error.

use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::vendor::VendorKind;

/// Default cache TTL and background rescan interval (1 hour each).
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;
/// Default outbound call timeouts.
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_K8S_TIMEOUT_SECS: u64 = 30;

/// Credentials for a REST console (HP OneView, Dell OME).
#[derive(Debug, Clone, Default)]
pub struct ConsoleCredentials {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConsoleCredentials {
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.username.is_some() && self.password.is_some()
    }

    fn is_partial(&self) -> bool {
        self.host.is_some() && !self.is_complete()
    }
}

/// Cisco UCS Central credentials. Central credentials authenticate the
/// inventory query; manager credentials are needed for per-server lookups
/// against the owning UCS Manager domain.
#[derive(Debug, Clone, Default)]
pub struct UcsCredentials {
    pub central_host: Option<String>,
    pub central_username: Option<String>,
    pub central_password: Option<String>,
    pub manager_username: Option<String>,
    pub manager_password: Option<String>,
}

impl UcsCredentials {
    pub fn is_complete(&self) -> bool {
        self.central_host.is_some()
            && self.central_username.is_some()
            && self.central_password.is_some()
            && self.manager_username.is_some()
            && self.manager_password.is_some()
    }

    fn is_partial(&self) -> bool {
        self.central_host.is_some() && !self.is_complete()
    }
}

/// Kubernetes cluster registry configuration for the installed-server
/// filter.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Cluster names, in token-matching order.
    pub clusters: Vec<String>,
    /// Domain the API servers live under.
    pub domain: String,
    /// One shared token, or one token per cluster (matched by position).
    pub tokens: Vec<String>,
    /// Namespace to query; `None` queries cluster-wide.
    pub namespace: Option<String>,
    /// Basic-auth fallback, deprecated.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Endpoint template with `{cluster}` / `{domain}` placeholders.
    /// Overridable so tests can point at a local server.
    pub endpoint_template: String,
}

impl ClusterConfig {
    pub const DEFAULT_ENDPOINT_TEMPLATE: &'static str = "https://api.{cluster}.{domain}:6443";

    pub fn is_configured(&self) -> bool {
        let has_auth =
            !self.tokens.is_empty() || (self.username.is_some() && self.password.is_some());
        !self.clusters.is_empty() && !self.domain.is_empty() && has_auth
    }

    /// API endpoint for one cluster.
    pub fn endpoint_for(&self, cluster: &str) -> String {
        self.endpoint_template
            .replace("{cluster}", cluster)
            .replace("{domain}", &self.domain)
    }

    /// Token for a cluster by position: a per-cluster token when enough were
    /// supplied, else the single shared token, else none.
    pub fn token_for(&self, cluster_index: usize) -> Option<&str> {
        match self.tokens.len() {
            0 => None,
            1 => Some(self.tokens[0].as_str()),
            n if cluster_index < n => Some(self.tokens[cluster_index].as_str()),
            n => {
                tracing::warn!(
                    "not enough tokens: expected {}, got {}",
                    cluster_index + 1,
                    n
                );
                None
            }
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub oneview: ConsoleCredentials,
    pub ome: ConsoleCredentials,
    pub ucs: UcsCredentials,
    pub cluster: Option<ClusterConfig>,
    /// Comma-separated zone allow-list from `ZONES`.
    pub zones: Option<String>,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub api_timeout: Duration,
    pub k8s_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            oneview: ConsoleCredentials::default(),
            ome: ConsoleCredentials::default(),
            ucs: UcsCredentials::default(),
            cluster: None,
            zones: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            api_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            k8s_timeout: Duration::from_secs(DEFAULT_K8S_TIMEOUT_SECS),
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_secs(name: &str, default: u64) -> Duration {
    let secs = env_opt(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Load a `.env` file (the default one, or an explicit path) before
    /// reading the environment. A missing default file is not an error.
    pub fn load_env(env_file: Option<&Path>) {
        match env_file {
            Some(path) => match dotenvy::from_path_override(path) {
                Ok(()) => tracing::info!("loaded environment from {}", path.display()),
                Err(e) => tracing::warn!("could not load {}: {}", path.display(), e),
            },
            None => {
                let _ = dotenvy::dotenv();
            }
        }
    }

    /// Read configuration from the environment.
    pub fn from_env() -> Self {
        let cluster = env_opt("K8S_CLUSTER_NAMES").map(|names| ClusterConfig {
            clusters: split_list(&names),
            domain: env_opt("K8S_DOMAIN_NAME").unwrap_or_default(),
            tokens: env_opt("K8S_TOKEN")
                .map(|t| split_list(&t))
                .unwrap_or_default(),
            namespace: env_opt("K8S_NAMESPACE"),
            username: env_opt("K8S_USERNAME"),
            password: env_opt("K8S_PASSWORD"),
            endpoint_template: ClusterConfig::DEFAULT_ENDPOINT_TEMPLATE.to_string(),
        });

        Self {
            oneview: ConsoleCredentials {
                host: env_opt("ONEVIEW_IP"),
                username: env_opt("ONEVIEW_USERNAME"),
                password: env_opt("ONEVIEW_PASSWORD"),
            },
            ome: ConsoleCredentials {
                host: env_opt("OME_IP"),
                username: env_opt("OME_USERNAME"),
                password: env_opt("OME_PASSWORD"),
            },
            ucs: UcsCredentials {
                central_host: env_opt("UCS_CENTRAL_IP"),
                central_username: env_opt("UCS_CENTRAL_USERNAME"),
                central_password: env_opt("UCS_CENTRAL_PASSWORD"),
                manager_username: env_opt("UCS_MANAGER_USERNAME"),
                manager_password: env_opt("UCS_MANAGER_PASSWORD"),
            },
            cluster,
            zones: env_opt("ZONES"),
            cache_ttl: env_secs("CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECS),
            refresh_interval: env_secs("BACKGROUND_SCAN_INTERVAL", DEFAULT_SCAN_INTERVAL_SECS),
            api_timeout: env_secs("API_TIMEOUT", DEFAULT_API_TIMEOUT_SECS),
            k8s_timeout: env_secs("K8S_TIMEOUT", DEFAULT_K8S_TIMEOUT_SECS),
            host: env_opt("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_opt("PORT").and_then(|p| p.parse().ok()).unwrap_or(8000),
        }
    }

    /// How many vendors are fully configured.
    pub fn configured_vendor_count(&self) -> usize {
        [
            self.oneview.is_complete(),
            self.ome.is_complete(),
            self.ucs.is_complete(),
        ]
        .iter()
        .filter(|c| **c)
        .count()
    }

    /// Startup validation.
    ///
    /// Fatal: a vendor with a host but incomplete credentials, zero fully
    /// configured vendors, or a token list that matches neither one-for-all
    /// nor one-per-cluster. Unconfigured Kubernetes only warns: the filter
    /// is optional.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oneview.is_partial() {
            return Err(ConfigError::IncompleteVendor {
                vendor: VendorKind::Hp,
            });
        }
        if self.ome.is_partial() {
            return Err(ConfigError::IncompleteVendor {
                vendor: VendorKind::Dell,
            });
        }
        if self.ucs.is_partial() {
            return Err(ConfigError::IncompleteVendor {
                vendor: VendorKind::Cisco,
            });
        }

        if self.configured_vendor_count() == 0 {
            return Err(ConfigError::NoVendorsConfigured);
        }

        match &self.cluster {
            Some(cluster) if cluster.is_configured() => {
                if cluster.tokens.len() > 1 && cluster.tokens.len() != cluster.clusters.len() {
                    return Err(ConfigError::TokenCountMismatch {
                        tokens: cluster.tokens.len(),
                        clusters: cluster.clusters.len(),
                    });
                }
            }
            _ => {
                tracing::warn!("Kubernetes not configured - installed server filtering disabled");
            }
        }

        tracing::info!(
            "configuration validated: {} vendor(s) configured",
            self.configured_vendor_count()
        );
        Ok(())
    }
}
