//! Monitoring configuration emitter
//!
//! Serializes a resolved [`Hierarchy`] into three Icinga 1.x / Nagios object
//! files for one management endpoint:
//!
//! - `vi_commands.cfg`: the `check_vsphere` command definition
//! - `vi_<endpoint>_config.cfg`: hostgroups and services
//! - `vi_<endpoint>_hosts.cfg`: hosts
//!
//! Every monitored host carries a `_vsphere_name` custom variable holding
//! its name on the vSphere side, which the command passes back to the plugin.

mod objects;


pub use objects::ObjectBlock;

use crate::catalog::replace_file;
use crate::check::format_number;
use crate::error::EmitError;
use crate::hierarchy::Hierarchy;
use crate::models::{short_host_name, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;

pub const COMMAND_NAME: &str = "check_vsphere";
pub const COMMANDS_FILE: &str = "vi_commands.cfg";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub warning: f64,
    pub critical: f64,
}

impl ThresholdPair {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }
}

/// Thresholds written into generated service definitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultThresholds {
    pub cpu_ready: ThresholdPair,
    pub cpu_usage: ThresholdPair,
    pub mem_active: ThresholdPair,
    pub mem_shared: ThresholdPair,
    pub mem_balloon: ThresholdPair,
    pub datastore_space: ThresholdPair,
}

impl Default for DefaultThresholds {
    fn default() -> Self {
        Self {
            cpu_ready: ThresholdPair::new(5.0, 10.0),
            cpu_usage: ThresholdPair::new(80.0, 90.0),
            mem_active: ThresholdPair::new(80.0, 90.0),
            mem_shared: ThresholdPair::new(80.0, 90.0),
            mem_balloon: ThresholdPair::new(10.0, 20.0),
            datastore_space: ThresholdPair::new(80.0, 90.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Management endpoint address as given on the command line
    pub entity: String,
    pub port: u16,
    pub plugin_path: String,
    /// Appended to VM names to form their address
    pub domain_suffix: String,
    pub host_template: String,
    pub service_template: String,
    pub thresholds: DefaultThresholds,
}

impl EmitterConfig {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            port: 443,
            plugin_path: "/usr/lib/nagios/plugins/check_vsphere".into(),
            domain_suffix: String::new(),
            host_template: "generic-host".into(),
            service_template: "generic-service".into(),
            thresholds: DefaultThresholds::default(),
        }
    }

    /// Endpoint name used in file names and as the root parent host
    pub fn endpoint_name(&self) -> &str {
        short_host_name(&self.entity)
    }
}

/// One generated file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigArtifact {
    pub file_name: String,
    pub contents: String,
}

/// Host name of a cluster object
///
/// Clusters and datastores share one host namespace, so each kind carries
/// its own suffix.
pub fn cluster_host_name(datacenter: &str, cluster: &str) -> String {
    format!("{}-{}-cluster", datacenter, cluster).to_lowercase()
}

/// Host name of a datastore object
pub fn datastore_host_name(datacenter: &str, datastore: &str) -> String {
    format!("{}-{}-ds", datacenter, datastore).to_lowercase()
}

pub fn cluster_hostgroup(datacenter: &str, cluster: &str) -> String {
    format!("{}-{}-hosts", datacenter, cluster).to_lowercase()
}

pub fn standalone_hostgroup(datacenter: &str) -> String {
    format!("{}-standalone-hosts", datacenter.to_lowercase())
}

pub fn datastore_hostgroup(datacenter: &str) -> String {
    format!("{}-datastores", datacenter.to_lowercase())
}

/// Render all artifacts for `hierarchy`
pub fn emit(hierarchy: &Hierarchy, config: &EmitterConfig) -> Vec<ConfigArtifact> {
    let endpoint = config.endpoint_name();
    vec![
        ConfigArtifact {
            file_name: COMMANDS_FILE.to_string(),
            contents: render_commands(config),
        },
        ConfigArtifact {
            file_name: format!("vi_{}_config.cfg", endpoint),
            contents: render_groups_and_services(hierarchy, config),
        },
        ConfigArtifact {
            file_name: format!("vi_{}_hosts.cfg", endpoint),
            contents: render_hosts(hierarchy, config),
        },
    ]
}

/// Write `artifacts` into `dir`, replacing each file whole
pub fn write_artifacts(dir: &Path, artifacts: &[ConfigArtifact]) -> Result<Vec<PathBuf>, EmitError> {
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(&artifact.file_name);
        replace_file(&path, &artifact.contents).map_err(|source| EmitError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), bytes = artifact.contents.len(), "Wrote config artifact");
        written.push(path);
    }
    Ok(written)
}

fn header(config: &EmitterConfig) -> String {
    format!(
        "# Generated by vinga-setup for {}; changes will be overwritten\n\n",
        config.entity
    )
}

fn render_commands(config: &EmitterConfig) -> String {
    let mut out = header(config);
    ObjectBlock::new("command")
        .comment(format!("'{}' command definition", COMMAND_NAME))
        .field("command_name", COMMAND_NAME)
        .field(
            "command_line",
            format!(
                "{} -s $ARG1$ -o {} -u $USER01$ -p $USER02$ -n $ARG2$ -e '$_HOSTVSPHERE_NAME$' -r $ARG3$ --warning=$ARG4$ --critical=$ARG5$",
                config.plugin_path, config.port
            ),
        )
        .render_into(&mut out);
    out
}

fn check_command(
    config: &EmitterConfig,
    kind: EntityKind,
    counter: &str,
    thresholds: Option<ThresholdPair>,
) -> String {
    let (warning, critical) = thresholds
        .map(|t| (format_number(t.warning), format_number(t.critical)))
        .unwrap_or_default();
    format!(
        "{}!{}!{}!{}!{}!{}",
        COMMAND_NAME, config.entity, kind, counter, warning, critical
    )
}

fn service(
    config: &EmitterConfig,
    description: &str,
    kind: EntityKind,
    counter: &str,
    thresholds: Option<ThresholdPair>,
) -> ObjectBlock {
    ObjectBlock::new("service")
        .comment(format!("Service {}", description))
        .field("use", config.service_template.clone())
        .field("service_description", description)
        .field("check_command", check_command(config, kind, counter, thresholds))
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().cloned().collect::<Vec<_>>().join(",")
}

fn render_groups_and_services(hierarchy: &Hierarchy, config: &EmitterConfig) -> String {
    let groups = &hierarchy.groups;
    let mut out = header(config);

    // Child hostgroups per datacenter, keyed by the datacenter's display name
    let mut members: BTreeMap<&str, BTreeSet<String>> = hierarchy
        .datacenters
        .iter()
        .map(|dc| (dc.as_str(), BTreeSet::new()))
        .collect();
    let mut children: Vec<ObjectBlock> = Vec::new();

    let mut esx_groups = BTreeSet::new();
    for (dc, cluster) in &groups.clusters {
        let name = cluster_hostgroup(dc, cluster);
        children.push(
            ObjectBlock::new("hostgroup")
                .comment(format!("ESXi hosts in cluster {}", cluster))
                .field("hostgroup_name", name.clone())
                .field("alias", format!("{} {} Hosts", dc, cluster)),
        );
        members.entry(dc.as_str()).or_default().insert(name.clone());
        esx_groups.insert(name);
    }

    let standalone_dcs: BTreeSet<&str> = groups
        .standalone_hosts
        .iter()
        .map(|(dc, _)| dc.as_str())
        .collect();
    for dc in standalone_dcs {
        let name = standalone_hostgroup(dc);
        children.push(
            ObjectBlock::new("hostgroup")
                .comment(format!("Stand-alone ESXi hosts in {}", dc))
                .field("hostgroup_name", name.clone())
                .field("alias", format!("{} Stand Alone Hosts", dc)),
        );
        members.entry(dc).or_default().insert(name.clone());
        esx_groups.insert(name);
    }

    let mut vm_groups: BTreeMap<&str, (&str, &str)> = BTreeMap::new();
    for vm in &hierarchy.vms {
        let placement = vm
            .cluster_name
            .as_deref()
            .unwrap_or_else(|| short_host_name(&vm.host_name));
        vm_groups
            .entry(vm.derived_group_name.as_str())
            .or_insert((vm.datacenter_name.as_str(), placement));
    }
    for (name, (dc, placement)) in &vm_groups {
        children.push(
            ObjectBlock::new("hostgroup")
                .comment(format!("Virtual machines on {}", placement))
                .field("hostgroup_name", *name)
                .field("alias", format!("{} {} Virtual Machines", dc, placement)),
        );
        members.entry(*dc).or_default().insert(name.to_string());
    }

    let mut datastore_groups = BTreeSet::new();
    let datastore_dcs: BTreeSet<&str> = groups.datastores.iter().map(|(dc, _)| dc.as_str()).collect();
    for dc in datastore_dcs {
        let name = datastore_hostgroup(dc);
        children.push(
            ObjectBlock::new("hostgroup")
                .comment(format!("Datastores in {}", dc))
                .field("hostgroup_name", name.clone())
                .field("alias", format!("{} Datastores", dc)),
        );
        members.entry(dc).or_default().insert(name.clone());
        datastore_groups.insert(name);
    }

    for (dc, member_groups) in &members {
        ObjectBlock::new("hostgroup")
            .comment(format!("Datacenter {}", dc))
            .field("hostgroup_name", dc.to_lowercase())
            .field("alias", format!("{} Datacenter", dc))
            .optional_field(
                "hostgroup_members",
                (!member_groups.is_empty()).then(|| join(member_groups)),
            )
            .render_into(&mut out);
    }
    for block in &children {
        block.render_into(&mut out);
    }

    let thresholds = &config.thresholds;
    let vm_group_names: BTreeSet<String> = vm_groups.keys().map(|k| k.to_string()).collect();
    if !vm_group_names.is_empty() {
        let vm_services = [
            ("CPU Ready", "cpu.ready", Some(thresholds.cpu_ready)),
            ("Core Information", "core", None),
            ("CPU Usage", "cpu.usage", Some(thresholds.cpu_usage)),
            ("Memory Active", "mem.active", Some(thresholds.mem_active)),
            ("Memory Shared", "mem.shared", Some(thresholds.mem_shared)),
            ("Memory Balloon", "mem.balloon", Some(thresholds.mem_balloon)),
        ];
        for (description, counter, pair) in vm_services {
            service(config, description, EntityKind::Vm, counter, pair)
                .field("hostgroup_name", join(&vm_group_names))
                .render_into(&mut out);
        }
    }

    if !datastore_groups.is_empty() {
        let datastore_services = [
            ("Datastore Space", "space", Some(thresholds.datastore_space)),
            ("Datastore Status", "status", None),
        ];
        for (description, counter, pair) in datastore_services {
            service(config, description, EntityKind::Datastore, counter, pair)
                .field("hostgroup_name", join(&datastore_groups))
                .render_into(&mut out);
        }
    }

    if !esx_groups.is_empty() {
        let host_services = [
            ("Core Information", "core", None),
            ("Host Status", "status", None),
            ("CPU Usage", "cpu.usage", Some(thresholds.cpu_usage)),
        ];
        for (description, counter, pair) in host_services {
            service(config, description, EntityKind::Host, counter, pair)
                .field("hostgroup_name", join(&esx_groups))
                .render_into(&mut out);
        }
    }

    let cluster_hosts: BTreeSet<String> = groups
        .clusters
        .iter()
        .map(|(dc, cluster)| cluster_host_name(dc, cluster))
        .collect();
    if !cluster_hosts.is_empty() {
        service(config, "Cluster Status", EntityKind::Cluster, "status", None)
            .field("host_name", join(&cluster_hosts))
            .render_into(&mut out);
    }

    out
}

fn render_hosts(hierarchy: &Hierarchy, config: &EmitterConfig) -> String {
    let endpoint = config.endpoint_name();
    let mut out = header(config);

    ObjectBlock::new("host")
        .comment(format!("Management endpoint {}", endpoint))
        .field("use", config.host_template.clone())
        .field("host_name", endpoint)
        .field("alias", endpoint)
        .field("address", config.entity.clone())
        .render_into(&mut out);

    for (dc, cluster) in &hierarchy.groups.clusters {
        ObjectBlock::new("host")
            .comment(format!("Cluster {}", cluster))
            .field("use", config.host_template.clone())
            .field("host_name", cluster_host_name(dc, cluster))
            .field("alias", format!("{} Cluster", cluster))
            .field("address", config.entity.clone())
            .field("parents", endpoint)
            .field("_vsphere_name", cluster.clone())
            .field(
                "check_command",
                check_command(config, EntityKind::Cluster, "status", None),
            )
            .render_into(&mut out);
    }

    let mut hosts: Vec<_> = hierarchy.hosts.iter().collect();
    hosts.sort_by(|a, b| a.name.cmp(&b.name));
    hosts.dedup_by(|a, b| a.name == b.name);
    for host in hosts {
        let (parent, group) = match &host.cluster_name {
            Some(cluster) => (
                cluster_host_name(&host.datacenter_name, cluster),
                cluster_hostgroup(&host.datacenter_name, cluster),
            ),
            None => (
                endpoint.to_string(),
                standalone_hostgroup(&host.datacenter_name),
            ),
        };
        ObjectBlock::new("host")
            .comment(format!("ESXi host {}", host.short_name()))
            .field("use", config.host_template.clone())
            .field("host_name", host.name.clone())
            .field("alias", host.short_name())
            .field("address", host.name.clone())
            .field("parents", parent)
            .field("hostgroups", group)
            .field("_vsphere_name", host.name.clone())
            .field(
                "check_command",
                check_command(config, EntityKind::Host, "status", None),
            )
            .render_into(&mut out);
    }

    for vm in &hierarchy.vms {
        ObjectBlock::new("host")
            .comment(format!("Virtual machine {}", vm.name))
            .field("use", config.host_template.clone())
            .field("host_name", vm.name.clone())
            .field("alias", vm.name.clone())
            .field("address", format!("{}{}", vm.name, config.domain_suffix))
            .field("parents", vm.host_name.clone())
            .field("hostgroups", vm.derived_group_name.clone())
            .field("_vsphere_name", vm.name.clone())
            .field(
                "check_command",
                check_command(config, EntityKind::Vm, "status", None),
            )
            .render_into(&mut out);
    }

    for (dc, datastore) in &hierarchy.groups.datastores {
        ObjectBlock::new("host")
            .comment(format!("Datastore {}", datastore))
            .field("use", config.host_template.clone())
            .field("host_name", datastore_host_name(dc, datastore))
            .field("alias", format!("{} Datastore", datastore))
            .field("address", config.entity.clone())
            .field("parents", endpoint)
            .field("hostgroups", datastore_hostgroup(dc))
            .field("_vsphere_name", datastore.clone())
            .field(
                "check_command",
                check_command(config, EntityKind::Datastore, "status", None),
            )
            .render_into(&mut out);
    }

    out
}
