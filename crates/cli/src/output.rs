//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};
use vinga_lib::Hierarchy;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Per-datacenter inventory counts
#[derive(Debug, Clone, Default, PartialEq, Tabled, Serialize)]
pub struct DatacenterRow {
    #[tabled(rename = "Datacenter")]
    pub datacenter: String,
    #[tabled(rename = "Clusters")]
    pub clusters: usize,
    #[tabled(rename = "Hosts")]
    pub hosts: usize,
    #[tabled(rename = "VMs")]
    pub vms: usize,
    #[tabled(rename = "Datastores")]
    pub datastores: usize,
}

/// Summarize `hierarchy` by datacenter, in name order
pub fn datacenter_rows(hierarchy: &Hierarchy) -> Vec<DatacenterRow> {
    let mut rows: BTreeMap<String, DatacenterRow> = hierarchy
        .datacenters
        .iter()
        .map(|dc| {
            let row = DatacenterRow {
                datacenter: dc.clone(),
                ..Default::default()
            };
            (dc.clone(), row)
        })
        .collect();

    for (dc, _) in &hierarchy.groups.clusters {
        if let Some(row) = rows.get_mut(dc.as_str()) {
            row.clusters += 1;
        }
    }
    for host in &hierarchy.hosts {
        if let Some(row) = rows.get_mut(host.datacenter_name.as_str()) {
            row.hosts += 1;
        }
    }
    for vm in &hierarchy.vms {
        if let Some(row) = rows.get_mut(vm.datacenter_name.as_str()) {
            row.vms += 1;
        }
    }
    for datastore in &hierarchy.datastores {
        if let Some(row) = rows.get_mut(datastore.datacenter_name.as_str()) {
            row.datastores += 1;
        }
    }

    rows.into_values().collect()
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}
