//! Core data models shared by the setup and check paths
//!
//! Everything here is rebuilt from live queries on every invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Opaque reference to a managed object on the provider side.
///
/// Only used as a correlation key and handed back into query calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl MoRef {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Extract a reference from a property value (`{"type": .., "value": ..}`)
    pub fn from_value(value: &Value) -> Option<Self> {
        let kind = value.get("type")?.as_str()?;
        let id = value.get("value")?.as_str()?;
        Some(Self::new(kind, id))
    }
}

impl fmt::Display for MoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Managed object types traversed by the property fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    VirtualMachine,
    HostSystem,
    ComputeResource,
    ClusterComputeResource,
    Folder,
    Datacenter,
    Datastore,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::VirtualMachine => "VirtualMachine",
            ObjectKind::HostSystem => "HostSystem",
            ObjectKind::ComputeResource => "ComputeResource",
            ObjectKind::ClusterComputeResource => "ClusterComputeResource",
            ObjectKind::Folder => "Folder",
            ObjectKind::Datacenter => "Datacenter",
            ObjectKind::Datastore => "Datastore",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object returned by a property traversal
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedObjectRecord {
    pub kind: String,
    pub name: Option<String>,
    pub opaque_ref: MoRef,
    pub attributes: HashMap<String, Value>,
}

impl ManagedObjectRecord {
    pub fn new(opaque_ref: MoRef, attributes: HashMap<String, Value>) -> Self {
        let name = attributes
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            kind: opaque_ref.kind.clone(),
            name,
            opaque_ref,
            attributes,
        }
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.attributes.get(property)
    }

    pub fn get_str(&self, property: &str) -> Option<&str> {
        self.get(property).and_then(Value::as_str)
    }

    pub fn get_i64(&self, property: &str) -> Option<i64> {
        self.get(property).and_then(Value::as_i64)
    }

    pub fn get_ref(&self, property: &str) -> Option<MoRef> {
        self.get(property).and_then(MoRef::from_value)
    }
}

/// Kind of compute container a host lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentKind {
    StandAlone,
    Cluster,
    Unknown,
}

impl ParentKind {
    /// Classify a host's parent from the provider's declared type name
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "ComputeResource" => ParentKind::StandAlone,
            "ClusterComputeResource" => ParentKind::Cluster,
            _ => ParentKind::Unknown,
        }
    }
}

/// A resolved ESXi host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRecord {
    pub name: String,
    #[serde(skip)]
    pub opaque_ref: MoRef,
    pub parent_kind: ParentKind,
    /// Set iff `parent_kind` is `Cluster`
    pub cluster_name: Option<String>,
    pub datacenter_name: String,
}

impl HostRecord {
    /// Host name without its domain suffix; IP addresses are kept whole
    pub fn short_name(&self) -> &str {
        short_host_name(&self.name)
    }
}

/// Strip the domain part of a host name
pub fn short_host_name(name: &str) -> &str {
    if name.parse::<std::net::IpAddr>().is_ok() {
        return name;
    }
    name.split('.').next().unwrap_or(name)
}

/// A virtual machine placed in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmRecord {
    pub name: String,
    pub host_name: String,
    pub cluster_name: Option<String>,
    pub datacenter_name: String,
    pub derived_group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DatastoreRecord {
    pub name: String,
    pub datacenter_name: String,
}

/// Deduplicated groupings derived from the host classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatacenterGroupSet {
    /// (datacenter, host)
    pub standalone_hosts: BTreeSet<(String, String)>,
    /// (datacenter, cluster)
    pub clusters: BTreeSet<(String, String)>,
    /// (cluster, host)
    pub cluster_hosts: BTreeSet<(String, String)>,
    /// (datacenter, datastore)
    pub datastores: BTreeSet<(String, String)>,
}

/// Monitored entity types accepted by the check path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Vm,
    Host,
    Datastore,
    Cluster,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Vm => "vm",
            EntityKind::Host => "host",
            EntityKind::Datastore => "datastore",
            EntityKind::Cluster => "cluster",
        }
    }

    pub fn object_kind(&self) -> ObjectKind {
        match self {
            EntityKind::Vm => ObjectKind::VirtualMachine,
            EntityKind::Host => ObjectKind::HostSystem,
            EntityKind::Datastore => ObjectKind::Datastore,
            EntityKind::Cluster => ObjectKind::ClusterComputeResource,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported entity type '{0}' (expected vm, host, datastore or cluster)")]
pub struct ParseEntityKindError(String);

impl FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vm" => Ok(EntityKind::Vm),
            "host" => Ok(EntityKind::Host),
            "datastore" => Ok(EntityKind::Datastore),
            "cluster" => Ok(EntityKind::Cluster),
            _ => Err(ParseEntityKindError(s.to_string())),
        }
    }
}

/// Which management endpoint we are talking to
///
/// Counter ids are not stable across the two, so each gets its own cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProviderKind {
    VCenter,
    StandaloneHost,
}

impl ProviderKind {
    pub fn cache_file_name(&self) -> &'static str {
        match self {
            ProviderKind::VCenter => "vcenter_perfdic.txt",
            ProviderKind::StandaloneHost => "host_perfdic.txt",
        }
    }
}

/// Raw samples for one counter over one query window
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub entity_ref: MoRef,
    pub counter_id: i32,
    pub instance_selector: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub raw_values: Vec<i64>,
}

impl MetricSample {
    pub fn is_empty(&self) -> bool {
        self.raw_values.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.raw_values.iter().map(|v| *v as f64).sum()
    }
}
