//! Raw inventory collection for the hierarchy resolver

use crate::error::ProviderError;
use crate::fetcher::PropertyFetcher;
use crate::models::{ManagedObjectRecord, ObjectKind};
use tracing::info;

/// Flat property records for every object type the resolver needs
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub hosts: Vec<ManagedObjectRecord>,
    pub vms: Vec<ManagedObjectRecord>,
    /// Stand-alone compute resources and clusters
    pub compute_resources: Vec<ManagedObjectRecord>,
    pub folders: Vec<ManagedObjectRecord>,
    pub datacenters: Vec<ManagedObjectRecord>,
    pub datastores: Vec<ManagedObjectRecord>,
}

impl Inventory {
    pub async fn collect(fetcher: &PropertyFetcher<'_>) -> Result<Self, ProviderError> {
        let hosts = fetcher
            .fetch(ObjectKind::HostSystem, &["name", "parent"])
            .await?;
        let vms = fetcher
            .fetch(ObjectKind::VirtualMachine, &["name", "runtime.host"])
            .await?;
        // Cluster compute resources are a subtype and come back here too
        let compute_resources = fetcher
            .fetch(ObjectKind::ComputeResource, &["name", "parent"])
            .await?;
        let folders = fetcher
            .fetch(ObjectKind::Folder, &["name", "parent"])
            .await?;
        let datacenters = fetcher.fetch(ObjectKind::Datacenter, &["name"]).await?;
        let datastores = fetcher
            .fetch(ObjectKind::Datastore, &["name", "parent"])
            .await?;

        info!(
            hosts = hosts.len(),
            vms = vms.len(),
            compute_resources = compute_resources.len(),
            datacenters = datacenters.len(),
            datastores = datastores.len(),
            "Collected inventory"
        );

        Ok(Self {
            hosts,
            vms,
            compute_resources,
            folders,
            datacenters,
            datastores,
        })
    }
}
