//! Error taxonomy
//!
//! Three failure families with very different blast radii: configuration
//! problems are fatal at startup, vendor failures are isolated per backend,
//! cluster failures are isolated per cluster. Nothing below the orchestrator
//! is allowed to unwind a whole scan.

use thiserror::Error;

use crate::vendor::VendorKind;

/// Fatal startup configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no vendor credentials configured (need at least one of: HP, Dell, Cisco)")]
    NoVendorsConfigured,

    #[error("{vendor} host configured but credentials are incomplete")]
    IncompleteVendor { vendor: VendorKind },

    #[error("token count ({tokens}) doesn't match cluster count ({clusters})")]
    TokenCountMismatch { tokens: usize, clusters: usize },
}

/// A vendor management console could not be scanned.
///
/// These are caught at the orchestrator and converted into an empty result
/// for that vendor; the scan continues with the remaining backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{vendor}: request failed: {source}")]
    Unavailable {
        vendor: VendorKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{vendor}: authentication rejected (HTTP {status})")]
    Auth { vendor: VendorKind, status: u16 },

    #[error("{vendor}: unexpected response: {message}")]
    Protocol { vendor: VendorKind, message: String },

    #[error("invalid name pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl BackendError {
    /// Wrap a transport-level failure, folding timeouts into the same bucket.
    pub fn unavailable(vendor: VendorKind, source: reqwest::Error) -> Self {
        Self::Unavailable { vendor, source }
    }
}

/// A forced refresh collided with one already in flight for the same key.
#[derive(Debug, Error)]
#[error("a refresh for this cache key is already running")]
pub struct CacheBusy;

/// A single cluster registry query failed.
///
/// Classified so the log line tells the operator what to fix; never aborts
/// the remaining clusters.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Agent CRD not found (cluster may not run the assisted installer)")]
    CrdMissing,

    #[error("forbidden (403) - token may lack get/list on agents.agent-install.openshift.io")]
    Forbidden,

    #[error("unauthorized (401) - credentials invalid or expired")]
    Unauthorized,

    #[error("no credentials available for this cluster")]
    NoCredentials,

    #[error("request timed out")]
    Timeout,

    #[error("API error: HTTP {status}")]
    Api { status: u16 },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClusterError {
    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::CrdMissing,
            403 => Self::Forbidden,
            401 => Self::Unauthorized,
            other => Self::Api { status: other },
        }
    }
}
