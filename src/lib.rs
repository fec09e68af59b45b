//! rackscan - bare-metal inventory discovery cache
//!
//! Scans server profiles out of HP OneView, Dell OpenManage Enterprise and
//! Cisco UCS Central, classifies them into zones by name, hides (or marks)
//! servers already installed in an OpenShift cluster, and serves the
//! aggregated view either as a one-shot CLI scan or through a cached JSON
//! dashboard API.

pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod format;
pub mod profile;
pub mod results;
pub mod scanner;
pub mod vendor;
pub mod web;
pub mod zone;
