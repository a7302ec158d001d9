//! Starter documents written by `pm init` and hub sub-project registration.
//!
//! Every template is deliberately thin: the audit flags a doc as an unfilled
//! template until it has at least three lines of real content.

use chrono::NaiveDate;

pub fn project_doc(name: &str, description: &str, today: NaiveDate) -> String {
    let summary = if description.trim().is_empty() {
        "<!-- What this project does and who it is for. -->".to_string()
    } else {
        description.trim().to_string()
    };
    format!(
        "# {name}\n\n\
{summary}\n\n\
## Architecture\n\n\
<!-- Major components, how data flows between them, key dependencies. -->\n\n\
## Key Decisions\n\n\
<!-- Decisions that shape the codebase, with a short rationale each. -->\n\n\
---\n\
*Last reviewed: {today}*\n\
*Update this file whenever the architecture changes.*\n"
    )
}

pub fn infrastructure_doc(name: &str, today: NaiveDate) -> String {
    format!(
        "# {name} - Infrastructure\n\n\
## Environments\n\n\
<!-- Where the project runs: local, staging, production. -->\n\n\
## Build & Deploy\n\n\
<!-- How artifacts are built and shipped. -->\n\n\
## Dependencies\n\n\
| Service | Purpose | Owner |\n\
|---|---|---|\n\n\
---\n\
*Last reviewed: {today}*\n"
    )
}

pub fn security_doc(name: &str, today: NaiveDate) -> String {
    format!(
        "# {name} - Security\n\n\
## Authentication\n\n\
<!-- How users and services prove who they are. -->\n\n\
## Secrets\n\n\
<!-- Where secrets live and how they rotate. -->\n\n\
## Threat Model\n\n\
<!-- Assets, attackers, mitigations. -->\n\n\
---\n\
*Last reviewed: {today}*\n"
    )
}

pub fn vision_doc(name: &str) -> String {
    format!(
        "# {name} - Vision\n\n\
<!-- Where this group of projects is headed over the next year. -->\n\n\
## Goals\n\n\
<!-- Measurable outcomes. -->\n\n\
## Non-goals\n\n\
<!-- What is explicitly out of scope. -->\n"
    )
}

pub fn hub_architecture_doc(name: &str) -> String {
    format!(
        "# {name} - Architecture\n\n\
<!-- How the registered projects fit together. -->\n\n\
## Projects\n\n\
| Project | Role | Talks to |\n\
|---|---|---|\n\n\
## Shared Infrastructure\n\n\
<!-- Services and libraries used across projects. -->\n"
    )
}

pub fn decisions_doc(name: &str) -> String {
    format!(
        "# {name} - Decisions\n\n\
<!-- Cross-project decisions, newest first. -->\n\n\
| Date | Decision | Rationale |\n\
|---|---|---|\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
    }

    #[test]
    fn test_project_doc_uses_description() {
        let doc = project_doc("demo", "A demo tool.", day());
        assert!(doc.starts_with("# demo\n\nA demo tool.\n"));
        assert!(doc.contains("*Last reviewed: 2026-01-02*"));
    }

    #[test]
    fn test_project_doc_without_description() {
        let doc = project_doc("demo", "  ", day());
        assert!(doc.contains("<!-- What this project does"));
    }

    #[test]
    fn test_hub_docs_carry_name() {
        assert!(vision_doc("hub").starts_with("# hub - Vision"));
        assert!(hub_architecture_doc("hub").contains("| Project |"));
        assert!(decisions_doc("hub").contains("| Date |"));
    }
}
