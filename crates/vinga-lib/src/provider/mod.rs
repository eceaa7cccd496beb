//! Access to the virtualization management plane
//!
//! Everything above this module talks to the provider only through the
//! [`InfrastructureProvider`] trait: property traversal over container
//! views, the performance counter list, metric queries and the provider's
//! clock. [`VimClient`] implements it over the vSphere VI/JSON API.

mod vim;

#[cfg(test)]
pub(crate) mod fake;

pub use vim::{ConnectParams, VimClient, DEFAULT_API_RELEASE};

use crate::error::ProviderError;
use crate::models::{ManagedObjectRecord, MoRef, ObjectKind, ProviderKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Product information reported by the endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct AboutInfo {
    pub name: String,
    pub full_name: String,
    /// `VirtualCenter` or `HostAgent`
    pub api_type: String,
    pub api_version: String,
}

impl AboutInfo {
    pub fn provider_kind(&self) -> ProviderKind {
        if self.api_type == "HostAgent" {
            ProviderKind::StandaloneHost
        } else {
            ProviderKind::VCenter
        }
    }
}

/// One page of a property traversal
#[derive(Debug, Clone, Default)]
pub struct RetrievePage {
    pub objects: Vec<ManagedObjectRecord>,
    /// Present while more pages remain
    pub token: Option<String>,
}

/// Performance counter description
#[derive(Debug, Clone, PartialEq)]
pub struct PerfCounterInfo {
    pub key: i32,
    pub group: String,
    pub name: String,
    pub rollup: String,
}

impl PerfCounterInfo {
    /// `group.name.rollup`, e.g. `cpu.ready.summation`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.group, self.name, self.rollup)
    }
}

/// A single-counter performance query
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub entity: MoRef,
    pub counter_id: i32,
    /// `""` for the aggregate, `"*"` for all instances
    pub instance: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_secs: i32,
}

/// Values returned for one (counter, instance) pair
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub counter_id: i32,
    pub instance: String,
    pub values: Vec<i64>,
}

/// Narrow interface to the infrastructure API
#[async_trait]
pub trait InfrastructureProvider: Send + Sync {
    async fn about(&self) -> Result<AboutInfo, ProviderError>;

    /// Create a recursive container view of `kind` rooted at the root folder
    async fn create_container_view(&self, kind: ObjectKind) -> Result<MoRef, ProviderError>;

    async fn retrieve_properties(
        &self,
        view: &MoRef,
        kind: ObjectKind,
        properties: &[String],
    ) -> Result<RetrievePage, ProviderError>;

    async fn continue_retrieve(&self, token: &str) -> Result<RetrievePage, ProviderError>;

    async fn destroy_view(&self, view: &MoRef) -> Result<(), ProviderError>;

    async fn perf_counters(&self) -> Result<Vec<PerfCounterInfo>, ProviderError>;

    async fn query_metric(&self, query: &MetricQuery) -> Result<Vec<MetricSeries>, ProviderError>;

    /// The provider's clock, which metric windows must be anchored to
    async fn current_time(&self) -> Result<DateTime<Utc>, ProviderError>;

    async fn logout(&self) -> Result<(), ProviderError>;
}
