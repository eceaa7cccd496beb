//! Counter registry
//!
//! Every check the plugin can run is one row in [`COUNTERS`]: which entity
//! kind it applies to, how its value is obtained, how raw samples are
//! converted and which threshold shape applies.

use crate::models::EntityKind;

/// Where a check's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Descriptive properties, always OK
    Info,
    /// The entity's `overallStatus` colour
    Status,
    /// One performance counter
    Single {
        counter: &'static str,
        instance: &'static str,
    },
    /// Two performance counters summed
    Composite {
        first: &'static str,
        second: &'static str,
        instance: &'static str,
    },
    /// Used share of a datastore from capacity and free space
    DatastoreSpace,
}

/// Conversion from the summed raw samples to the reported unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Raw,
    /// Milliseconds of ready time within a 20 s summation window
    CpuReadyPercent,
    /// Hundredths of a percent
    HundredthsToPercent,
    KilobytesToMegabytes,
    KilobytesPerSecondToMegabits,
}

impl Normalization {
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            Normalization::Raw => raw,
            Normalization::CpuReadyPercent => raw / 20000.0 * 100.0,
            Normalization::HundredthsToPercent => raw / 100.0,
            Normalization::KilobytesToMegabytes => raw / 1024.0,
            Normalization::KilobytesPerSecondToMegabits => raw * 8.0 / 1024.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdShape {
    None,
    Absolute,
    /// Thresholds are percentages of the VM's configured memory
    PercentOfMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Percent,
    Megabytes,
    Iops,
    Megabits,
}

impl Unit {
    /// Suffix printed after the value in the status line
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::None => "",
            Unit::Percent => "%",
            Unit::Megabytes => " MB",
            Unit::Iops => " IOPS",
            Unit::Megabits => " Mbps",
        }
    }

    /// Unit of measure in performance data
    pub fn uom(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Megabytes => "MB",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDefinition {
    pub entity: EntityKind,
    pub name: &'static str,
    pub label: &'static str,
    /// Label used in performance data
    pub metric: &'static str,
    pub query: QueryShape,
    pub normalization: Normalization,
    pub thresholds: ThresholdShape,
    pub unit: Unit,
}

impl CounterDefinition {
    /// Whether the check needs a running VM
    pub fn is_live(&self) -> bool {
        matches!(
            self.query,
            QueryShape::Single { .. } | QueryShape::Composite { .. }
        )
    }
}

const fn info(entity: EntityKind) -> CounterDefinition {
    CounterDefinition {
        entity,
        name: "core",
        label: "Core Information",
        metric: "core",
        query: QueryShape::Info,
        normalization: Normalization::Raw,
        thresholds: ThresholdShape::None,
        unit: Unit::None,
    }
}

const fn status(entity: EntityKind, label: &'static str) -> CounterDefinition {
    CounterDefinition {
        entity,
        name: "status",
        label,
        metric: "status",
        query: QueryShape::Status,
        normalization: Normalization::Raw,
        thresholds: ThresholdShape::None,
        unit: Unit::None,
    }
}

#[allow(clippy::too_many_arguments)]
const fn single(
    entity: EntityKind,
    name: &'static str,
    label: &'static str,
    metric: &'static str,
    counter: &'static str,
    normalization: Normalization,
    thresholds: ThresholdShape,
    unit: Unit,
) -> CounterDefinition {
    CounterDefinition {
        entity,
        name,
        label,
        metric,
        query: QueryShape::Single {
            counter,
            instance: "",
        },
        normalization,
        thresholds,
        unit,
    }
}

const NETWORK: QueryShape = QueryShape::Composite {
    first: "net.received.average",
    second: "net.transmitted.average",
    instance: "",
};

pub static COUNTERS: &[CounterDefinition] = &[
    info(EntityKind::Vm),
    status(EntityKind::Vm, "Virtual Machine Status"),
    single(
        EntityKind::Vm,
        "cpu.ready",
        "CPU Ready",
        "cpu_ready",
        "cpu.ready.summation",
        Normalization::CpuReadyPercent,
        ThresholdShape::Absolute,
        Unit::Percent,
    ),
    single(
        EntityKind::Vm,
        "cpu.usage",
        "CPU Usage",
        "cpu_usage",
        "cpu.usage.average",
        Normalization::HundredthsToPercent,
        ThresholdShape::Absolute,
        Unit::Percent,
    ),
    single(
        EntityKind::Vm,
        "mem.active",
        "Memory Active",
        "mem_active",
        "mem.active.average",
        Normalization::KilobytesToMegabytes,
        ThresholdShape::PercentOfMemory,
        Unit::Megabytes,
    ),
    single(
        EntityKind::Vm,
        "mem.shared",
        "Memory Shared",
        "mem_shared",
        "mem.shared.average",
        Normalization::KilobytesToMegabytes,
        ThresholdShape::PercentOfMemory,
        Unit::Megabytes,
    ),
    single(
        EntityKind::Vm,
        "mem.balloon",
        "Memory Balloon",
        "mem_balloon",
        "mem.vmmemctl.average",
        Normalization::KilobytesToMegabytes,
        ThresholdShape::PercentOfMemory,
        Unit::Megabytes,
    ),
    CounterDefinition {
        entity: EntityKind::Vm,
        name: "datastore.ioread",
        label: "Datastore Read IOPS",
        metric: "datastore_ioread",
        query: QueryShape::Single {
            counter: "datastore.numberReadAveraged.average",
            instance: "*",
        },
        normalization: Normalization::Raw,
        thresholds: ThresholdShape::Absolute,
        unit: Unit::Iops,
    },
    CounterDefinition {
        entity: EntityKind::Vm,
        name: "datastore.iowrite",
        label: "Datastore Write IOPS",
        metric: "datastore_iowrite",
        query: QueryShape::Single {
            counter: "datastore.numberWriteAveraged.average",
            instance: "*",
        },
        normalization: Normalization::Raw,
        thresholds: ThresholdShape::Absolute,
        unit: Unit::Iops,
    },
    CounterDefinition {
        entity: EntityKind::Vm,
        name: "datastore.io",
        label: "Datastore IOPS",
        metric: "datastore_io",
        query: QueryShape::Composite {
            first: "datastore.numberReadAveraged.average",
            second: "datastore.numberWriteAveraged.average",
            instance: "*",
        },
        normalization: Normalization::Raw,
        thresholds: ThresholdShape::Absolute,
        unit: Unit::Iops,
    },
    CounterDefinition {
        entity: EntityKind::Vm,
        name: "net.usage",
        label: "Network Usage",
        metric: "net_usage",
        query: NETWORK,
        normalization: Normalization::KilobytesPerSecondToMegabits,
        thresholds: ThresholdShape::Absolute,
        unit: Unit::Megabits,
    },
    info(EntityKind::Host),
    status(EntityKind::Host, "Host Status"),
    single(
        EntityKind::Host,
        "cpu.usage",
        "CPU Usage",
        "cpu_usage",
        "cpu.usage.average",
        Normalization::HundredthsToPercent,
        ThresholdShape::Absolute,
        Unit::Percent,
    ),
    CounterDefinition {
        entity: EntityKind::Host,
        name: "net.usage",
        label: "Network Usage",
        metric: "net_usage",
        query: NETWORK,
        normalization: Normalization::KilobytesPerSecondToMegabits,
        thresholds: ThresholdShape::Absolute,
        unit: Unit::Megabits,
    },
    status(EntityKind::Datastore, "Datastore Status"),
    CounterDefinition {
        entity: EntityKind::Datastore,
        name: "space",
        label: "Datastore Used Space",
        metric: "datastore_used",
        query: QueryShape::DatastoreSpace,
        normalization: Normalization::Raw,
        thresholds: ThresholdShape::Absolute,
        unit: Unit::Percent,
    },
    status(EntityKind::Cluster, "Cluster Status"),
];

/// Find the definition of `name` for `entity`
pub fn lookup(entity: EntityKind, name: &str) -> Option<&'static CounterDefinition> {
    COUNTERS
        .iter()
        .find(|definition| definition.entity == entity && definition.name == name)
}
