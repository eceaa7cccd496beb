//! Status line and performance data rendering

use super::severity::Severity;
use crate::error::CheckError;
use serde::Serialize;
use std::fmt;

/// Plugin performance data: `'label'=value[uom];warn;crit;min;max`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfData {
    pub label: String,
    pub value: f64,
    pub uom: &'static str,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = |v: Option<f64>| v.map(format_number).unwrap_or_default();
        write!(
            f,
            "'{}'={}{};{};{};{};{}",
            self.label,
            format_number(self.value),
            self.uom,
            field(self.warning),
            field(self.critical),
            field(self.min),
            field(self.max)
        )
    }
}

/// Shortest decimal form with at most two fractional digits
pub fn format_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Final result of one check invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub severity: Severity,
    /// Status text without the severity prefix
    pub message: String,
    pub perf_data: Option<PerfData>,
}

impl CheckOutcome {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            perf_data: None,
        }
    }

    pub fn with_perf_data(mut self, perf_data: PerfData) -> Self {
        self.perf_data = Some(perf_data);
        self
    }

    /// Map an evaluation failure onto a severity
    pub fn from_error(error: &CheckError) -> Self {
        let severity = match error {
            CheckError::EmptyMetricWindow { .. } => Severity::Warning,
            _ => Severity::Unknown,
        };
        Self::new(severity, error.to_string())
    }

    /// The single line written to stdout
    ///
    /// Provider text (VM notes, HTTP error pages) may span several lines;
    /// line breaks are folded into single spaces.
    pub fn status_line(&self) -> String {
        let message = single_line(&self.message);
        match &self.perf_data {
            Some(perf) => format!("{} - {} | {}", self.severity, message, perf),
            None => format!("{} - {}", self.severity, message),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.severity.exit_code()
    }
}

fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKind;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(75.0), "75");
        assert_eq!(format_number(3276.8), "3276.8");
        assert_eq!(format_number(0.126), "0.13");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(-0.001), "0");
    }

    #[test]
    fn test_perf_data_rendering() {
        let perf = PerfData {
            label: "cpu_usage".into(),
            value: 75.0,
            uom: "%",
            warning: Some(50.0),
            critical: Some(90.0),
            min: Some(0.0),
            max: Some(100.0),
        };
        assert_eq!(perf.to_string(), "'cpu_usage'=75%;50;90;0;100");

        let sparse = PerfData {
            warning: None,
            max: None,
            ..perf
        };
        assert_eq!(sparse.to_string(), "'cpu_usage'=75%;;90;0;");
    }

    #[test]
    fn test_status_line_without_perf_data() {
        let outcome = CheckOutcome::new(Severity::Ok, "Cluster Status is green");
        assert_eq!(outcome.status_line(), "OK - Cluster Status is green");
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_status_line_folds_line_breaks() {
        let outcome = CheckOutcome::new(
            Severity::Unknown,
            "HttpError (503): <html>\r\n<body>Service Unavailable</body>\n</html>\n",
        );
        assert_eq!(
            outcome.status_line(),
            "UNKNOWN - HttpError (503): <html> <body>Service Unavailable</body> </html>"
        );
    }

    #[test]
    fn test_error_mapping() {
        let empty = CheckError::EmptyMetricWindow {
            counter: "cpu.usage.average".into(),
            start: "a".into(),
            end: "b".into(),
        };
        assert_eq!(CheckOutcome::from_error(&empty).severity, Severity::Warning);

        let missing = CheckError::EntityNotFound {
            kind: EntityKind::Datastore,
            name: "ds09".into(),
        };
        let outcome = CheckOutcome::from_error(&missing);
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(outcome.status_line(), "UNKNOWN - datastore 'ds09' not found");
    }
}
