//! Hierarchy resolution
//!
//! Rebuilds the containment graph (datacenter → cluster → host → VM and
//! datacenter → datastore) from flat property records that only carry
//! back-references to their parents, and derives the deduplicated groupings
//! the config emitter works from.

mod inventory;


pub use inventory::Inventory;

use crate::error::HierarchyError;
use crate::models::{
    short_host_name, DatacenterGroupSet, DatastoreRecord, HostRecord, ManagedObjectRecord, MoRef,
    ParentKind, VmRecord,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Folder nesting followed before giving up on finding a datacenter
const MAX_PARENT_DEPTH: usize = 16;

/// Fully resolved inventory
#[derive(Debug, Clone, Default, Serialize)]
pub struct Hierarchy {
    pub hosts: Vec<HostRecord>,
    pub vms: Vec<VmRecord>,
    pub datastores: Vec<DatastoreRecord>,
    pub groups: DatacenterGroupSet,
    pub datacenters: BTreeSet<String>,
    /// VMs whose host could not be correlated
    pub orphaned_vms: Vec<String>,
}

/// Placement group for a VM: `<datacenter>-<cluster or short host>-vms`
pub fn derived_group_name(datacenter: &str, cluster_or_host: &str) -> String {
    format!(
        "{}-{}-vms",
        datacenter.to_lowercase(),
        cluster_or_host.to_lowercase()
    )
}

/// Lookup tables over the parent-bearing records
struct ParentIndex<'a> {
    by_ref: HashMap<&'a MoRef, &'a ManagedObjectRecord>,
}

impl<'a> ParentIndex<'a> {
    fn new(inventory: &'a Inventory) -> Self {
        let by_ref = inventory
            .compute_resources
            .iter()
            .chain(&inventory.folders)
            .chain(&inventory.datacenters)
            .map(|record| (&record.opaque_ref, record))
            .collect();
        Self { by_ref }
    }

    fn get(&self, reference: &MoRef) -> Option<&'a ManagedObjectRecord> {
        self.by_ref.get(reference).copied()
    }

    /// Walk parent links from `start` up to the enclosing datacenter
    fn datacenter_of(&self, start: &MoRef) -> Result<String, HierarchyError> {
        let mut current = start.clone();

        for _ in 0..MAX_PARENT_DEPTH {
            let record = self
                .get(&current)
                .ok_or_else(|| HierarchyError::DatacenterNotFound(start.clone()))?;

            if current.kind == "Datacenter" {
                return record.name.clone().ok_or_else(|| HierarchyError::MissingProperty {
                    object: current.to_string(),
                    property: "name".into(),
                });
            }

            current = record
                .get_ref("parent")
                .ok_or_else(|| HierarchyError::DatacenterNotFound(start.clone()))?;
        }

        Err(HierarchyError::DatacenterNotFound(start.clone()))
    }
}

fn required_name(record: &ManagedObjectRecord) -> Result<String, HierarchyError> {
    record
        .name
        .clone()
        .ok_or_else(|| HierarchyError::MissingProperty {
            object: record.opaque_ref.to_string(),
            property: "name".into(),
        })
}

fn classify_host(
    record: &ManagedObjectRecord,
    index: &ParentIndex<'_>,
) -> Result<HostRecord, HierarchyError> {
    let name = required_name(record)?;
    let parent = record
        .get_ref("parent")
        .ok_or_else(|| HierarchyError::MissingProperty {
            object: name.clone(),
            property: "parent".into(),
        })?;

    let parent_kind = ParentKind::from_type_name(&parent.kind);
    if parent_kind == ParentKind::Unknown {
        return Err(HierarchyError::UnknownParentKind {
            host: name,
            kind: parent.kind,
        });
    }

    let container = index
        .get(&parent)
        .ok_or_else(|| HierarchyError::DatacenterNotFound(parent.clone()))?;
    let container_parent = container
        .get_ref("parent")
        .ok_or_else(|| HierarchyError::DatacenterNotFound(parent.clone()))?;
    let datacenter_name = index.datacenter_of(&container_parent)?;

    let cluster_name = match parent_kind {
        ParentKind::Cluster => Some(required_name(container)?),
        _ => None,
    };

    Ok(HostRecord {
        name,
        opaque_ref: record.opaque_ref.clone(),
        parent_kind,
        cluster_name,
        datacenter_name,
    })
}

/// Resolve the full hierarchy from collected inventory
pub fn resolve(inventory: &Inventory) -> Result<Hierarchy, HierarchyError> {
    let index = ParentIndex::new(inventory);
    let mut hierarchy = Hierarchy::default();

    for record in &inventory.hosts {
        let host = classify_host(record, &index)?;

        match &host.cluster_name {
            Some(cluster) => {
                hierarchy
                    .groups
                    .clusters
                    .insert((host.datacenter_name.clone(), cluster.clone()));
                hierarchy
                    .groups
                    .cluster_hosts
                    .insert((cluster.clone(), host.name.clone()));
            }
            None => {
                hierarchy
                    .groups
                    .standalone_hosts
                    .insert((host.datacenter_name.clone(), host.name.clone()));
            }
        }
        hierarchy.datacenters.insert(host.datacenter_name.clone());
        hierarchy.hosts.push(host);
    }

    let host_by_ref: HashMap<&MoRef, &HostRecord> = hierarchy
        .hosts
        .iter()
        .map(|host| (&host.opaque_ref, host))
        .collect();

    let mut vms = Vec::with_capacity(inventory.vms.len());
    let mut orphaned = Vec::new();
    for record in &inventory.vms {
        let name = required_name(record)?;
        let host = record
            .get_ref("runtime.host")
            .and_then(|reference| host_by_ref.get(&reference).copied());

        let Some(host) = host else {
            warn!(vm = %name, "Virtual machine has no resolvable host, skipping");
            orphaned.push(name);
            continue;
        };

        let group_key = host
            .cluster_name
            .as_deref()
            .unwrap_or_else(|| short_host_name(&host.name));
        vms.push(VmRecord {
            derived_group_name: derived_group_name(&host.datacenter_name, group_key),
            name,
            host_name: host.name.clone(),
            cluster_name: host.cluster_name.clone(),
            datacenter_name: host.datacenter_name.clone(),
        });
    }
    vms.sort_by(|a, b| a.name.cmp(&b.name));

    for vm in &vms {
        hierarchy.datacenters.insert(vm.datacenter_name.clone());
    }
    hierarchy.vms = vms;
    hierarchy.orphaned_vms = orphaned;

    for record in &inventory.datastores {
        let name = required_name(record)?;
        let parent = record
            .get_ref("parent")
            .ok_or_else(|| HierarchyError::MissingProperty {
                object: name.clone(),
                property: "parent".into(),
            })?;
        let datacenter_name = index.datacenter_of(&parent)?;

        hierarchy
            .groups
            .datastores
            .insert((datacenter_name.clone(), name.clone()));
        hierarchy.datacenters.insert(datacenter_name.clone());
        hierarchy.datastores.push(DatastoreRecord {
            name,
            datacenter_name,
        });
    }
    hierarchy.datastores.sort();
    hierarchy.datastores.dedup();

    for record in &inventory.datacenters {
        hierarchy.datacenters.insert(required_name(record)?);
    }

    Ok(hierarchy)
}
