//! vinga-setup - monitoring configuration generator for vSphere
//!
//! Connects to a vCenter or stand-alone ESXi host, reconstructs the
//! datacenter / cluster / host / VM hierarchy and writes Icinga/Nagios
//! object definitions that drive the `check_vsphere` plugin.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use commands::setup::{self, SetupOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vinga_lib::{ConnectParams, EmitterConfig};

const DEFAULT_PORT: u16 = 443;

/// vSphere monitoring configuration generator
#[derive(Parser, Debug)]
#[command(name = "vinga-setup")]
#[command(author, version, about = "Generate Icinga/Nagios configuration from a vSphere inventory", long_about = None)]
pub struct Cli {
    /// vCenter or ESXi host to discover
    #[arg(short = 'e', long)]
    pub entity: String,

    /// HTTPS port of the endpoint [default: 443]
    #[arg(short = 'o', long)]
    pub port: Option<u16>,

    /// User name
    #[arg(short = 'u', long, env = "VINGA_USER")]
    pub user: Option<String>,

    /// Password (prompted for when omitted)
    #[arg(short = 'p', long, env = "VINGA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Directory the object files are written to [default: current directory]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Suffix appended to VM names to form their address, e.g. .lab.local
    #[arg(long)]
    pub domain_suffix: Option<String>,

    /// Path of check_vsphere on the monitoring host
    #[arg(long)]
    pub plugin_path: Option<String>,

    /// Accept self-signed endpoint certificates
    #[arg(long)]
    pub insecure: bool,

    /// Print the generated configuration instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Merge command-line flags over the config file
    fn into_options(self, config: config::Config, password: String) -> Result<SetupOptions> {
        let user = self
            .user
            .or(config.user)
            .context("A user name is required (--user or the config file)")?;
        let port = self.port.or(config.port).unwrap_or(DEFAULT_PORT);

        let mut connect = ConnectParams::new(&self.entity, port, user, password);
        connect.insecure = self.insecure || config.insecure.unwrap_or(false);
        if let Some(release) = config.api_release {
            connect.api_release = release;
        }
        connect.timeout = Duration::from_secs(60);

        let mut emitter = EmitterConfig::new(&self.entity);
        emitter.port = port;
        emitter.thresholds = config.thresholds;
        if let Some(suffix) = self.domain_suffix.or(config.domain_suffix) {
            emitter.domain_suffix = suffix;
        }
        if let Some(path) = self.plugin_path.or(config.plugin_path) {
            emitter.plugin_path = path;
        }
        if let Some(template) = config.host_template {
            emitter.host_template = template;
        }
        if let Some(template) = config.service_template {
            emitter.service_template = template;
        }

        Ok(SetupOptions {
            connect,
            emitter,
            output_dir: self
                .output_dir
                .or(config.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            dry_run: self.dry_run,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let format = cli.format;

    let password = match &cli.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let options = cli.into_options(config, password)?;
    setup::run_setup(&options, format).await
}
