//! Diagnostics - 診断チェックと health signal
//!
//! 各チェックは重大度（INFO / OK / WARNING / ERROR）と推奨対応を返します。
//! `DiagnosticsService` は全チェックを実行し、最初の ERROR を
//! `HealthSignal` として preflight に渡します。WARNING は処理を止めず、
//! ログに出すだけです。

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::ports::{Diagnosis, HealthSignal};
use crate::purgers::EnabledPurgers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "INFO",
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Result of one diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticReport {
    pub check: &'static str,
    pub title: String,
    pub severity: Severity,
    pub recommendation: String,
}

pub trait DiagnosticCheck: Send + Sync {
    fn id(&self) -> &'static str;

    fn title(&self) -> String;

    /// Severity and recommendation for the current state.
    fn run(&self) -> (Severity, String);
}

/// Fails while no purger is enabled: nothing could ever be invalidated.
pub struct PurgersConfiguredCheck {
    enabled: EnabledPurgers,
}

impl PurgersConfiguredCheck {
    pub fn new(enabled: EnabledPurgers) -> Self {
        Self { enabled }
    }
}

impl DiagnosticCheck for PurgersConfiguredCheck {
    fn id(&self) -> &'static str {
        "purgers"
    }

    fn title(&self) -> String {
        "Purgers".to_string()
    }

    fn run(&self) -> (Severity, String) {
        match self.enabled.get() {
            0 => (
                Severity::Error,
                "There is no purger loaded which means that you need a module enabled to provide a purger plugin to clear your external cache or CDN.".to_string(),
            ),
            n => (Severity::Ok, format!("{n} purger(s) enabled.")),
        }
    }
}

#[derive(Default)]
pub struct DiagnosticsService {
    checks: Vec<Box<dyn DiagnosticCheck>>,
}

impl DiagnosticsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: impl DiagnosticCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn run_all(&self) -> Vec<DiagnosticReport> {
        self.checks
            .iter()
            .map(|check| {
                let (severity, recommendation) = check.run();
                DiagnosticReport {
                    check: check.id(),
                    title: check.title(),
                    severity,
                    recommendation,
                }
            })
            .collect()
    }
}

impl HealthSignal for DiagnosticsService {
    fn is_system_on_fire(&self) -> Option<Diagnosis> {
        for report in self.run_all() {
            match report.severity {
                Severity::Error => return Some(Diagnosis::new(report.recommendation)),
                Severity::Warning => {
                    warn!(check = report.check, recommendation = %report.recommendation, "diagnostic warning");
                }
                Severity::Info | Severity::Ok => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, Severity);

    impl DiagnosticCheck for Fixed {
        fn id(&self) -> &'static str {
            self.0
        }

        fn title(&self) -> String {
            self.0.to_uppercase()
        }

        fn run(&self) -> (Severity, String) {
            (self.1, format!("fix {}", self.0))
        }
    }

    #[test]
    fn warnings_never_block() {
        let service = DiagnosticsService::new()
            .with_check(Fixed("a", Severity::Ok))
            .with_check(Fixed("b", Severity::Warning))
            .with_check(Fixed("c", Severity::Info));
        assert_eq!(service.is_system_on_fire(), None);
    }

    #[test]
    fn first_error_wins() {
        let service = DiagnosticsService::new()
            .with_check(Fixed("a", Severity::Warning))
            .with_check(Fixed("b", Severity::Error))
            .with_check(Fixed("c", Severity::Error));
        assert_eq!(service.is_system_on_fire(), Some(Diagnosis::new("fix b")));
    }

    #[test]
    fn reports_every_check() {
        let service = DiagnosticsService::new()
            .with_check(PurgersConfiguredCheck::new(EnabledPurgers::new(2)))
            .with_check(Fixed("queue", Severity::Info));
        let reports = service.run_all();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].check, "purgers");
        assert_eq!(reports[0].severity, Severity::Ok);
        assert_eq!(reports[1].title, "QUEUE");
    }

    #[test]
    fn no_purgers_is_an_error() {
        let enabled = EnabledPurgers::new(0);
        let service = DiagnosticsService::new().with_check(PurgersConfiguredCheck::new(enabled));
        assert!(service.is_system_on_fire().is_some());
        assert_eq!(Severity::Error.to_string(), "ERROR");
        assert!(Severity::Warning < Severity::Error);
    }
}
