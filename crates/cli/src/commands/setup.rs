//! Inventory discovery and config generation

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use vinga_lib::hierarchy;
use vinga_lib::{
    emit, write_artifacts, ConfigArtifact, ConnectParams, EmitterConfig, Hierarchy,
    InfrastructureProvider, Inventory, PropertyFetcher, Session, StructuredLogger,
};

use crate::output::{
    datacenter_rows, print_info, print_success, print_table, print_warning, DatacenterRow,
    OutputFormat,
};

/// Everything one setup run needs, after CLI flags and the config file
/// have been merged
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub connect: ConnectParams,
    pub emitter: EmitterConfig,
    pub output_dir: PathBuf,
    pub dry_run: bool,
}

/// JSON rendering of a setup run
#[derive(Debug, Serialize)]
struct SetupReport<'a> {
    endpoint: &'a str,
    datacenters: Vec<DatacenterRow>,
    orphaned_vms: &'a [String],
    /// Paths written, empty on a dry run
    files: Vec<String>,
    /// Generated contents, only on a dry run
    #[serde(skip_serializing_if = "Option::is_none")]
    artifacts: Option<&'a [ConfigArtifact]>,
}

/// Discover the inventory behind `options.connect` and write the
/// monitoring configuration for it
pub async fn run_setup(options: &SetupOptions, format: OutputFormat) -> Result<()> {
    let host = &options.connect.host;
    if matches!(format, OutputFormat::Table) {
        print_info(&format!("Connecting to {}:{}", host, options.connect.port));
    }

    let session = Session::connect(&options.connect)
        .await
        .with_context(|| format!("Failed to connect to {}", host))?;
    let logger = StructuredLogger::new(host);

    let hierarchy = session
        .scoped(|provider| {
            let logger = &logger;
            async move { discover(provider.as_ref(), logger).await }
        })
        .await?;

    let artifacts = emit(&hierarchy, &options.emitter);

    if options.dry_run {
        report(&hierarchy, &options.emitter, &[], Some(&artifacts), format)?;
        return Ok(());
    }

    let written = write_artifacts(&options.output_dir, &artifacts).with_context(|| {
        format!(
            "Failed to write configuration to {}",
            options.output_dir.display()
        )
    })?;
    logger.log_setup_summary(&hierarchy, &written);

    report(&hierarchy, &options.emitter, &written, None, format)
}

async fn discover(
    provider: &dyn InfrastructureProvider,
    logger: &StructuredLogger,
) -> Result<Hierarchy> {
    let about = provider
        .about()
        .await
        .context("Failed to read endpoint information")?;
    logger.log_connected(&about.full_name, &about.api_version);

    let fetcher = PropertyFetcher::new(provider);
    let inventory = Inventory::collect(&fetcher)
        .await
        .context("Failed to collect inventory")?;
    let hierarchy = hierarchy::resolve(&inventory).context("Failed to resolve inventory")?;

    info!(
        hosts = hierarchy.hosts.len(),
        vms = hierarchy.vms.len(),
        "Resolved hierarchy"
    );
    Ok(hierarchy)
}

fn report(
    hierarchy: &Hierarchy,
    emitter: &EmitterConfig,
    written: &[PathBuf],
    artifacts: Option<&[ConfigArtifact]>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let report = SetupReport {
                endpoint: &emitter.entity,
                datacenters: datacenter_rows(hierarchy),
                orphaned_vms: &hierarchy.orphaned_vms,
                files: written.iter().map(|p| p.display().to_string()).collect(),
                artifacts,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            if let Some(artifacts) = artifacts {
                for artifact in artifacts {
                    println!("{}", format!("# ---- {} ----", artifact.file_name).bold());
                    print!("{}", artifact.contents);
                }
            }

            println!("{}", "Discovered Inventory".bold());
            print_table(&datacenter_rows(hierarchy));

            for path in written {
                print_success(&format!("Wrote {}", display_path(path)));
            }
            if !hierarchy.orphaned_vms.is_empty() {
                print_warning(&format!(
                    "{} virtual machine(s) without a host were skipped: {}",
                    hierarchy.orphaned_vms.len(),
                    hierarchy.orphaned_vms.join(", ")
                ));
            }
        }
    }
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string().cyan().to_string()
}
