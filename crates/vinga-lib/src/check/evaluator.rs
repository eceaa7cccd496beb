//! Check evaluation against a live provider

use super::output::{CheckOutcome, PerfData};
use super::registry::{self, CounterDefinition, QueryShape, ThresholdShape, Unit};
use super::severity::{classify_status, Severity, Thresholds};
use crate::catalog::CounterCatalog;
use crate::error::CheckError;
use crate::fetcher::PropertyFetcher;
use crate::models::{EntityKind, ManagedObjectRecord, MetricSample};
use crate::provider::{InfrastructureProvider, MetricQuery};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// Samples are read from `[now - 60 s, now - 40 s]` on the provider's clock
pub const WINDOW_START_OFFSET_SECS: i64 = 60;
pub const WINDOW_END_OFFSET_SECS: i64 = 40;
/// Real-time statistics interval
pub const SAMPLE_INTERVAL_SECS: i32 = 20;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

const VM_PROPERTIES: &[&str] = &[
    "name",
    "overallStatus",
    "runtime.powerState",
    "summary.config.annotation",
    "summary.config.guestFullName",
    "summary.config.numCpu",
    "summary.config.memorySizeMB",
];

const HOST_PROPERTIES: &[&str] = &[
    "name",
    "overallStatus",
    "runtime.connectionState",
    "summary.hardware.model",
    "summary.hardware.cpuModel",
    "summary.hardware.numCpuPkgs",
    "summary.hardware.numCpuCores",
    "summary.hardware.numCpuThreads",
    "summary.hardware.memorySize",
];

const DATASTORE_PROPERTIES: &[&str] = &[
    "name",
    "overallStatus",
    "summary.type",
    "summary.capacity",
    "summary.freeSpace",
];

const CLUSTER_PROPERTIES: &[&str] = &["name", "overallStatus"];

/// Properties fetched to identify and evaluate an entity of `kind`
pub fn entity_properties(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Vm => VM_PROPERTIES,
        EntityKind::Host => HOST_PROPERTIES,
        EntityKind::Datastore => DATASTORE_PROPERTIES,
        EntityKind::Cluster => CLUSTER_PROPERTIES,
    }
}

/// One check invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckRequest {
    pub entity_kind: EntityKind,
    pub entity_name: String,
    pub counter: String,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl CheckRequest {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.warning, self.critical)
    }

    /// Only live counters resolve ids through the counter catalog
    pub fn needs_catalog(&self) -> bool {
        registry::lookup(self.entity_kind, &self.counter).is_some_and(CounterDefinition::is_live)
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

pub struct CheckEvaluator<'a> {
    provider: &'a dyn InfrastructureProvider,
    catalog: &'a CounterCatalog,
}

impl<'a> CheckEvaluator<'a> {
    pub fn new(provider: &'a dyn InfrastructureProvider, catalog: &'a CounterCatalog) -> Self {
        Self { provider, catalog }
    }

    /// Evaluate `request`, folding every expected failure into an outcome
    pub async fn evaluate(&self, request: &CheckRequest) -> CheckOutcome {
        match self.try_evaluate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    entity = %request.entity_name,
                    counter = %request.counter,
                    error = %e,
                    "Check could not be evaluated"
                );
                CheckOutcome::from_error(&e)
            }
        }
    }

    pub async fn try_evaluate(&self, request: &CheckRequest) -> Result<CheckOutcome, CheckError> {
        let entity = self.identify(request).await?;

        let definition = registry::lookup(request.entity_kind, &request.counter).ok_or_else(|| {
            CheckError::UnsupportedCounter {
                kind: request.entity_kind,
                counter: request.counter.clone(),
            }
        })?;

        if request.entity_kind == EntityKind::Vm && definition.is_live() {
            if let Some(state @ ("poweredOff" | "suspended")) = entity.get_str("runtime.powerState")
            {
                return Err(CheckError::EntityNotRunning {
                    name: request.entity_name.clone(),
                    state: state.to_string(),
                });
            }
        }

        debug!(
            kind = %request.entity_kind,
            entity = %request.entity_name,
            counter = definition.name,
            "Dispatching check"
        );

        match definition.query {
            QueryShape::Info => core_information(request.entity_kind, &entity),
            QueryShape::Status => status_outcome(definition, request.entity_kind, &entity),
            QueryShape::Single { counter, instance } => {
                let window = self.window().await?;
                let sample = self.sample(&entity, counter, instance, window).await?;
                let value = definition.normalization.apply(sample.sum());
                numeric_outcome(definition, &entity, value, request.thresholds(), None)
            }
            QueryShape::Composite {
                first,
                second,
                instance,
            } => {
                let window = self.window().await?;
                let first = self.sample(&entity, first, instance, window).await?;
                let second = self.sample(&entity, second, instance, window).await?;
                let value = definition
                    .normalization
                    .apply(first.sum() + second.sum());
                numeric_outcome(definition, &entity, value, request.thresholds(), None)
            }
            QueryShape::DatastoreSpace => datastore_space(definition, &entity, request.thresholds()),
        }
    }

    async fn identify(&self, request: &CheckRequest) -> Result<ManagedObjectRecord, CheckError> {
        let fetcher = PropertyFetcher::new(self.provider);
        let records = fetcher
            .fetch(
                request.entity_kind.object_kind(),
                entity_properties(request.entity_kind),
            )
            .await?;

        records
            .into_iter()
            .find(|record| record.name.as_deref() == Some(request.entity_name.as_str()))
            .ok_or_else(|| CheckError::EntityNotFound {
                kind: request.entity_kind,
                name: request.entity_name.clone(),
            })
    }

    async fn window(&self) -> Result<Window, CheckError> {
        let now = self.provider.current_time().await?;
        Ok(Window {
            start: now - Duration::seconds(WINDOW_START_OFFSET_SECS),
            end: now - Duration::seconds(WINDOW_END_OFFSET_SECS),
        })
    }

    /// Query one counter over `window`, summing every returned series
    async fn sample(
        &self,
        entity: &ManagedObjectRecord,
        counter: &str,
        instance: &str,
        window: Window,
    ) -> Result<MetricSample, CheckError> {
        let counter_id = self.catalog.resolve(counter)?;
        let query = MetricQuery {
            entity: entity.opaque_ref.clone(),
            counter_id,
            instance: instance.to_string(),
            start: window.start,
            end: window.end,
            interval_secs: SAMPLE_INTERVAL_SECS,
        };

        let series = self.provider.query_metric(&query).await?;
        let sample = MetricSample {
            entity_ref: query.entity,
            counter_id,
            instance_selector: query.instance,
            window_start: window.start,
            window_end: window.end,
            raw_values: series.into_iter().flat_map(|s| s.values).collect(),
        };

        if sample.is_empty() {
            return Err(CheckError::EmptyMetricWindow {
                counter: counter.to_string(),
                start: window.start.to_rfc3339_opts(SecondsFormat::Secs, true),
                end: window.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            });
        }

        debug!(
            counter = %counter,
            counter_id = counter_id,
            values = sample.raw_values.len(),
            sum = sample.sum(),
            "Collected metric sample"
        );
        Ok(sample)
    }
}

fn missing(entity: &ManagedObjectRecord, property: &str) -> CheckError {
    CheckError::MissingProperty {
        entity: entity
            .name
            .clone()
            .unwrap_or_else(|| entity.opaque_ref.to_string()),
        property: property.to_string(),
    }
}

fn required_i64(entity: &ManagedObjectRecord, property: &str) -> Result<i64, CheckError> {
    entity
        .get_i64(property)
        .ok_or_else(|| missing(entity, property))
}

fn required_str<'r>(entity: &'r ManagedObjectRecord, property: &str) -> Result<&'r str, CheckError> {
    entity
        .get_str(property)
        .ok_or_else(|| missing(entity, property))
}

/// `N GB` when the size is a whole number of gigabytes, `N MB` otherwise
fn format_memory_mb(memory_mb: i64) -> String {
    if memory_mb % 1024 == 0 {
        format!("{} GB", memory_mb / 1024)
    } else {
        format!("{} MB", memory_mb)
    }
}

fn core_information(
    kind: EntityKind,
    entity: &ManagedObjectRecord,
) -> Result<CheckOutcome, CheckError> {
    let message = match kind {
        EntityKind::Vm => format!(
            "{}, {}, {} vCPU(s), {} Memory",
            entity.get_str("summary.config.annotation").unwrap_or_default(),
            entity.get_str("summary.config.guestFullName").unwrap_or_default(),
            required_i64(entity, "summary.config.numCpu")?,
            format_memory_mb(required_i64(entity, "summary.config.memorySizeMB")?)
        ),
        EntityKind::Host => format!(
            "{}, {} x {} CPU(s) ({} Cores, {} Logical), {} GB Memory",
            required_str(entity, "summary.hardware.model")?,
            required_i64(entity, "summary.hardware.numCpuPkgs")?,
            required_str(entity, "summary.hardware.cpuModel")?,
            required_i64(entity, "summary.hardware.numCpuCores")?,
            required_i64(entity, "summary.hardware.numCpuThreads")?,
            required_i64(entity, "summary.hardware.memorySize")? / (1024 * 1024 * 1024)
        ),
        _ => {
            return Err(CheckError::UnsupportedCounter {
                kind,
                counter: "core".into(),
            })
        }
    };
    Ok(CheckOutcome::new(Severity::Ok, message))
}

fn status_outcome(
    definition: &CounterDefinition,
    kind: EntityKind,
    entity: &ManagedObjectRecord,
) -> Result<CheckOutcome, CheckError> {
    let status = required_str(entity, "overallStatus")?;
    let detail = match kind {
        EntityKind::Vm => entity
            .get_str("runtime.powerState")
            .map(|state| format!("(State: {})", state)),
        EntityKind::Host => entity
            .get_str("runtime.connectionState")
            .map(|state| format!("(Connection: {})", state)),
        EntityKind::Datastore => entity
            .get_str("summary.type")
            .map(|fs| format!("(Type: {})", fs)),
        EntityKind::Cluster => None,
    };

    let message = match detail {
        Some(detail) => format!("{} is {} {}", definition.label, status, detail),
        None => format!("{} is {}", definition.label, status),
    };
    Ok(CheckOutcome::new(classify_status(status), message))
}

fn numeric_outcome(
    definition: &CounterDefinition,
    entity: &ManagedObjectRecord,
    value: f64,
    requested: Thresholds,
    detail: Option<String>,
) -> Result<CheckOutcome, CheckError> {
    let (thresholds, max) = match definition.thresholds {
        ThresholdShape::PercentOfMemory => {
            let memory_mb = required_i64(entity, "summary.config.memorySizeMB")? as f64;
            (requested.scaled_to_capacity(memory_mb), Some(memory_mb))
        }
        ThresholdShape::Absolute => (
            requested,
            (definition.unit == Unit::Percent).then_some(100.0),
        ),
        ThresholdShape::None => (Thresholds::default(), None),
    };

    let severity = thresholds.classify(value);
    let mut message = format!(
        "{} is {:.1}{}",
        definition.label,
        value,
        definition.unit.suffix()
    );
    if let Some(detail) = detail {
        message.push(' ');
        message.push_str(&detail);
    }

    Ok(CheckOutcome::new(severity, message).with_perf_data(PerfData {
        label: definition.metric.to_string(),
        value,
        uom: definition.unit.uom(),
        warning: thresholds.warning,
        critical: thresholds.critical,
        min: Some(0.0),
        max,
    }))
}

fn datastore_space(
    definition: &CounterDefinition,
    entity: &ManagedObjectRecord,
    requested: Thresholds,
) -> Result<CheckOutcome, CheckError> {
    let capacity = required_i64(entity, "summary.capacity")?;
    let free = required_i64(entity, "summary.freeSpace")?;
    if capacity <= 0 {
        return Err(missing(entity, "summary.capacity"));
    }

    let used = capacity - free;
    let used_pct = used as f64 * 100.0 / capacity as f64;
    let detail = format!(
        "(Used {:.1} GB of {:.1} GB)",
        used as f64 / BYTES_PER_GIB,
        capacity as f64 / BYTES_PER_GIB
    );

    numeric_outcome(definition, entity, used_pct, requested, Some(detail))
}
