//! Machine-readable summary of one run, written on request.
use crate::config::RunConfig;
use crate::error::HarnessError;
use crate::runner::RunOutcome;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub run: RunConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    pub build_command: Option<String>,
    pub library_source: Option<String>,
    pub staged: Vec<String>,
    pub fixture_args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(run: &RunConfig) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            run: run.clone(),
            workspace: None,
            build_command: None,
            library_source: None,
            staged: Vec::new(),
            fixture_args: Vec::new(),
            exit_code: None,
            elapsed_ms: None,
            success: false,
            error_kind: None,
            error: None,
        }
    }

    pub fn record_outcome(&mut self, outcome: &RunOutcome) {
        self.exit_code = outcome.exit_code;
        self.elapsed_ms = Some(outcome.elapsed_ms);
        self.success = true;
    }

    pub fn record_error(&mut self, err: &HarnessError) {
        self.success = false;
        self.error_kind = Some(err.kind().to_string());
        self.error = Some(err.to_string());
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(report).context("serialize run report")?;
    fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_report_carries_error_kind() {
        let mut report = RunReport::new(&RunConfig::default());
        report.record_error(&HarnessError::Execution {
            detail: "testfixture exit status: 1".to_string(),
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reports/run.json");
        write_report(&path, &report).expect("write report");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(value["success"], false);
        assert_eq!(value["error_kind"], "execution");
        assert_eq!(value["run"]["verbose"], "0");
        assert!(value.get("exit_code").is_none());
    }
}
