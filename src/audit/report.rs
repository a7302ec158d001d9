//! Plain-markdown audit report, also written to `DRIFT.md`.

use serde::Serialize;

use super::{Finding, Severity};

/// Finding totals per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Error => counts.errors += 1,
                Severity::Warning => counts.warnings += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }
}

/// Render findings in the order given. Nothing is re-sorted.
pub fn render(findings: &[Finding]) -> String {
    let counts = SeverityCounts::tally(findings);
    let mut lines = vec![
        "# Project Audit Report\n".to_string(),
        format!(
            "**Errors:** {} | **Warnings:** {} | **Info:** {}\n",
            counts.errors, counts.warnings, counts.info
        ),
    ];

    if findings.is_empty() {
        lines.push("No issues found. Project is clean.\n".to_string());
    } else {
        for finding in findings {
            lines.push(format!("- {} {}", finding.severity.tag(), finding.message));
        }
    }

    lines.join("\n")
}
