//! Severity levels and threshold classification

use serde::Serialize;
use std::fmt;

/// Check result severity, ordered by exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Warning and critical bounds; an absent tier never triggers
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thresholds {
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl Thresholds {
    pub fn new(warning: Option<f64>, critical: Option<f64>) -> Self {
        Self { warning, critical }
    }

    /// Treat both bounds as percentages of `capacity` and resolve them to
    /// absolute values
    pub fn scaled_to_capacity(&self, capacity: f64) -> Self {
        Self {
            warning: self.warning.map(|pct| pct * capacity / 100.0),
            critical: self.critical.map(|pct| pct * capacity / 100.0),
        }
    }

    /// Inclusive comparison, critical first
    pub fn classify(&self, value: f64) -> Severity {
        if self.critical.is_some_and(|critical| value >= critical) {
            Severity::Critical
        } else if self.warning.is_some_and(|warning| value >= warning) {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

/// Map a managed entity's `overallStatus` colour to a severity
pub fn classify_status(status: &str) -> Severity {
    match status {
        "red" => Severity::Critical,
        "yellow" => Severity::Warning,
        "gray" => Severity::Unknown,
        _ => Severity::Ok,
    }
}
