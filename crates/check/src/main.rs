//! check_vsphere - Icinga/Nagios plugin for vSphere entities
//!
//! Evaluates one counter for one VM, host, datastore or cluster and reports
//! the result as a status line and plugin exit code. Logs go to stderr so
//! stdout carries only the status line.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vinga_lib::{
    CheckEvaluator, CheckOutcome, CheckRequest, ConnectParams, CounterCatalog, EntityKind,
    FileCacheStore, Session, Severity, StructuredLogger, SystemClock,
};

mod config;

use config::PluginConfig;

/// Icinga/Nagios check plugin for vSphere
#[derive(Parser, Debug)]
#[command(name = "check_vsphere")]
#[command(author, version, about = "Check plugin for vSphere performance counters", long_about = None)]
pub struct Cli {
    /// vCenter or ESXi host to connect to
    #[arg(short = 's', long)]
    pub host: String,

    /// HTTPS port of the endpoint
    #[arg(short = 'o', long, default_value_t = 443)]
    pub port: u16,

    /// User name
    #[arg(short = 'u', long, env = "VINGA_USER")]
    pub user: String,

    /// Password (prompted for when omitted)
    #[arg(short = 'p', long, env = "VINGA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Entity type: vm, host, datastore or cluster
    #[arg(short = 'n', long = "type")]
    pub entity_type: EntityKind,

    /// Entity name as shown in the inventory
    #[arg(short = 'e', long)]
    pub entity: String,

    /// Counter to evaluate, e.g. cpu.ready, mem.active, status, core
    #[arg(short = 'r', long)]
    pub counter: String,

    /// Warning threshold (empty for none)
    #[arg(short = 'w', long, allow_hyphen_values = true)]
    pub warning: Option<String>,

    /// Critical threshold (empty for none)
    #[arg(short = 'c', long, allow_hyphen_values = true)]
    pub critical: Option<String>,
}

impl Cli {
    fn request(&self) -> Result<CheckRequest> {
        Ok(CheckRequest {
            entity_kind: self.entity_type,
            entity_name: self.entity.clone(),
            counter: self.counter.to_lowercase(),
            warning: parse_threshold(self.warning.as_deref()).context("Invalid warning threshold")?,
            critical: parse_threshold(self.critical.as_deref())
                .context("Invalid critical threshold")?,
        })
    }
}

/// Empty or missing thresholds never trigger
fn parse_threshold(raw: Option<&str>) -> Result<Option<f64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .with_context(|| format!("'{}' is not a number", value)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let reason = e.to_string();
            let first_line = reason.lines().next().unwrap_or("invalid arguments");
            report(&CheckOutcome::new(Severity::Unknown, first_line.trim_start_matches("error: ")));
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let outcome = match run(&cli).await {
        Ok(outcome) => outcome,
        Err(e) => CheckOutcome::new(Severity::Unknown, format!("{:#}", e)),
    };
    report(&outcome);
}

fn report(outcome: &CheckOutcome) -> ! {
    println!("{}", outcome.status_line());
    std::process::exit(outcome.exit_code())
}

async fn run(cli: &Cli) -> Result<CheckOutcome> {
    let request = cli.request()?;
    let config = PluginConfig::load()?;
    debug!(cache_dir = %config.cache_dir.display(), "Plugin configured");

    let password = match &cli.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    let mut params = ConnectParams::new(&cli.host, cli.port, &cli.user, password);
    params.api_release = config.api_release.clone();
    params.insecure = config.insecure;
    params.timeout = config.timeout();

    let session = Session::connect(&params)
        .await
        .with_context(|| format!("Cannot connect to {}", cli.host))?;
    let logger = StructuredLogger::new(&cli.host);

    let outcome = session
        .scoped(|provider| async move {
            let about = match provider.about().await {
                Ok(about) => about,
                Err(e) => return CheckOutcome::from_error(&e.into()),
            };
            logger.log_connected(&about.full_name, &about.api_version);

            let catalog = if request.needs_catalog() {
                let store =
                    FileCacheStore::for_provider(&config.cache_dir, about.provider_kind());
                match CounterCatalog::load_or_refresh(provider.as_ref(), &store, &SystemClock).await
                {
                    Ok(catalog) => catalog,
                    Err(e) => return CheckOutcome::from_error(&e.into()),
                }
            } else {
                CounterCatalog::default()
            };

            let outcome = CheckEvaluator::new(provider.as_ref(), &catalog)
                .evaluate(&request)
                .await;
            logger.log_check_result(&request, &outcome);
            outcome
        })
        .await;

    Ok(outcome)
}
