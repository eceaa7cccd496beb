//! Structured logging for setup runs and check results
//!
//! Events carry an `event` field so JSON log lines can be filtered without
//! parsing the message text.

use crate::check::{CheckOutcome, CheckRequest, Severity};
use crate::hierarchy::Hierarchy;
use std::path::PathBuf;
use tracing::{info, warn};

/// Structured logger bound to one management endpoint
#[derive(Clone)]
pub struct StructuredLogger {
    endpoint: String,
}

impl StructuredLogger {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Log a session being established
    pub fn log_connected(&self, product: &str, api_version: &str) {
        info!(
            event = "session_opened",
            endpoint = %self.endpoint,
            product = %product,
            api_version = %api_version,
            "Connected to management endpoint"
        );
    }

    /// Log the outcome of a check evaluation
    pub fn log_check_result(&self, request: &CheckRequest, outcome: &CheckOutcome) {
        let value = outcome.perf_data.as_ref().map(|p| p.value);
        match outcome.severity {
            Severity::Ok | Severity::Warning => {
                info!(
                    event = "check_result",
                    endpoint = %self.endpoint,
                    kind = %request.entity_kind,
                    entity = %request.entity_name,
                    counter = %request.counter,
                    severity = %outcome.severity,
                    value = ?value,
                    "Check evaluated"
                );
            }
            Severity::Critical | Severity::Unknown => {
                warn!(
                    event = "check_result",
                    endpoint = %self.endpoint,
                    kind = %request.entity_kind,
                    entity = %request.entity_name,
                    counter = %request.counter,
                    severity = %outcome.severity,
                    value = ?value,
                    message = %outcome.message,
                    "Check evaluated"
                );
            }
        }
    }

    /// Log a summary of a completed setup run
    pub fn log_setup_summary(&self, hierarchy: &Hierarchy, written: &[PathBuf]) {
        info!(
            event = "setup_completed",
            endpoint = %self.endpoint,
            datacenters = hierarchy.datacenters.len(),
            clusters = hierarchy.groups.clusters.len(),
            hosts = hierarchy.hosts.len(),
            vms = hierarchy.vms.len(),
            datastores = hierarchy.datastores.len(),
            files = written.len(),
            "Generated monitoring configuration"
        );

        if !hierarchy.orphaned_vms.is_empty() {
            warn!(
                event = "orphaned_vms",
                endpoint = %self.endpoint,
                count = hierarchy.orphaned_vms.len(),
                vms = ?hierarchy.orphaned_vms,
                "Some virtual machines could not be placed and were left out"
            );
        }
    }
}
