//! Case-insensitive keyword search over titles and bodies.

use serde::Serialize;

use crate::models::EntityKind;
use crate::storage::Store;
use crate::{Error, Result};

/// Results returned when no limit is given.
pub const DEFAULT_LIMIT: usize = 10;

/// Characters of context kept on each side of the first match.
const SNIPPET_CONTEXT: usize = 50;

const TITLE_SCORE: f64 = 1.0;
const BODY_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub score: f64,
    pub snippet: String,
}

/// Score one document, or `None` when the query does not occur.
///
/// `query` must already be lowercase.
fn score_document(query: &str, title: &str, body: &str) -> Option<(f64, String)> {
    let combined = format!("{title} {body}").to_lowercase();
    let start = combined.find(query)?;
    let score = if title.to_lowercase().contains(query) {
        TITLE_SCORE
    } else {
        BODY_SCORE
    };
    Some((score, snippet(&combined, start, query.len())))
}

/// Text around `combined[start..start + len]`, widened by up to
/// [`SNIPPET_CONTEXT`] characters each way.
fn snippet(combined: &str, start: usize, len: usize) -> String {
    let end = start + len;
    let from = combined[..start]
        .char_indices()
        .rev()
        .nth(SNIPPET_CONTEXT - 1)
        .map_or(0, |(i, _)| i);
    let to = combined[end..]
        .char_indices()
        .nth(SNIPPET_CONTEXT)
        .map_or(combined.len(), |(i, _)| end + i);
    combined[from..to].trim().to_string()
}

/// Search epics, stories and tasks for `query`.
///
/// Title hits outrank body hits; equal scores keep epic, story, task order.
pub fn keyword_search(store: &Store, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(Error::InvalidInput("Search query must not be empty".to_string()));
    }

    let mut documents: Vec<(String, String, EntityKind, String)> = Vec::new();
    for (epic, body) in store.epics_with_bodies()? {
        documents.push((epic.id, epic.title, EntityKind::Epic, body));
    }
    for (story, body) in store.stories_with_bodies()? {
        documents.push((story.id, story.title, EntityKind::Story, body));
    }
    for (task, body) in store.tasks_with_bodies()? {
        documents.push((task.id, task.title, EntityKind::Task, body));
    }

    let mut results: Vec<SearchResult> = documents
        .into_iter()
        .filter_map(|(id, title, kind, body)| {
            let (score, snippet) = score_document(&query, &title, &body)?;
            Some(SearchResult {
                id,
                title,
                kind,
                score,
                snippet,
            })
        })
        .collect();

    // sort_by is stable
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);

    tracing::debug!(query = %query, hits = results.len(), "keyword search");
    Ok(results)
}
