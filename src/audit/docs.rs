//! Documentation completeness heuristics.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

use crate::Result;

/// A doc must keep at least this many lines of real content.
pub const MIN_CONTENT_LINES: usize = 3;

/// Which set of documents a file belongs to. Project docs tolerate
/// review-footer lines that hub docs do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocSet {
    Project,
    Hub,
}

/// Content and last-modified date of a doc that exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocState {
    pub content: String,
    /// Local date of the last modification, when the filesystem reports one
    pub modified: Option<NaiveDate>,
}

/// One expected doc, present or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocSlot {
    pub name: String,
    pub state: Option<DocState>,
}

impl DocSlot {
    /// Read `dir/name`, recording absence rather than failing.
    pub fn read(dir: &Path, name: &str) -> Result<Self> {
        let path = dir.join(name);
        if !path.is_file() {
            return Ok(Self {
                name: name.to_string(),
                state: None,
            });
        }
        let content = std::fs::read_to_string(&path)?;
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(|t| chrono::DateTime::<chrono::Local>::from(t).date_naive());
        Ok(Self {
            name: name.to_string(),
            state: Some(DocState { content, modified }),
        })
    }
}

fn is_boilerplate(line: &str, set: DocSet) -> bool {
    const MARKERS: [&str; 5] = ["#", "<!--", "-->", "---", "|"];
    const PROJECT_FOOTERS: [&str; 2] = ["*Last reviewed", "*Update this"];

    line.is_empty()
        || MARKERS.iter().any(|m| line.starts_with(m))
        || (set == DocSet::Project && PROJECT_FOOTERS.iter().any(|m| line.starts_with(m)))
}

/// Lines that count as real content: not headings, comments, rules,
/// table rows or (for project docs) review footers.
pub fn content_lines(content: &str, set: DocSet) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !is_boilerplate(line, set))
        .collect()
}

/// A doc with fewer than [`MIN_CONTENT_LINES`] lines of content is still a template.
pub fn is_unfilled(content: &str, set: DocSet) -> bool {
    content_lines(content, set).len() < MIN_CONTENT_LINES
}

/// Days since the doc was modified.
pub fn age_days(state: &DocState, today: NaiveDate) -> Option<i64> {
    state.modified.map(|m| (today - m).num_days())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::templates;
    use tempfile::TempDir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    #[test]
    fn test_boilerplate_is_ignored() {
        let content = "# Title\n\n<!-- fill me -->\n-->\n---\n| a | b |\n|---|---|\n*Last reviewed: x*\n*Update this file*\n";
        assert!(content_lines(content, DocSet::Project).is_empty());
    }

    #[test]
    fn test_footers_count_for_hub_docs() {
        let content = "# Title\n*Last reviewed: x*\n*Update this file*\n";
        assert_eq!(content_lines(content, DocSet::Hub).len(), 2);
        assert!(content_lines(content, DocSet::Project).is_empty());
    }

    #[test]
    fn test_unfilled_threshold() {
        assert!(is_unfilled("# T\n\none\ntwo\n", DocSet::Project));
        assert!(!is_unfilled("# T\n\none\ntwo\nthree\n", DocSet::Project));
    }

    #[test]
    fn test_templates_are_unfilled() {
        assert!(is_unfilled(&templates::project_doc("p", "", day()), DocSet::Project));
        assert!(is_unfilled(&templates::project_doc("p", "Has a summary.", day()), DocSet::Project));
        assert!(is_unfilled(&templates::infrastructure_doc("p", day()), DocSet::Project));
        assert!(is_unfilled(&templates::security_doc("p", day()), DocSet::Project));
        assert!(is_unfilled(&templates::vision_doc("h"), DocSet::Hub));
        assert!(is_unfilled(&templates::hub_architecture_doc("h"), DocSet::Hub));
        assert!(is_unfilled(&templates::decisions_doc("h"), DocSet::Hub));
    }

    #[test]
    fn test_read_missing_and_present() {
        let dir = TempDir::new().unwrap();
        let missing = DocSlot::read(dir.path(), "PROJECT.md").unwrap();
        assert!(missing.state.is_none());

        std::fs::write(dir.path().join("PROJECT.md"), "# P\n").unwrap();
        let present = DocSlot::read(dir.path(), "PROJECT.md").unwrap();
        let state = present.state.unwrap();
        assert_eq!(state.content, "# P\n");
        assert!(state.modified.is_some());
    }

    #[test]
    fn test_age_days() {
        let state = DocState {
            content: String::new(),
            modified: NaiveDate::from_ymd_opt(2026, 2, 20),
        };
        assert_eq!(age_days(&state, day()), Some(40));
    }
}
