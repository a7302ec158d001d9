//! Frontmatter codec for entity files.
//!
//! File format:
//!
//! ```text
//! ---
//! <yaml>
//! ---
//!
//! <markdown body>
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

const DELIMITER: &str = "---";

/// Split a document into its raw YAML header and trimmed body.
pub fn split(content: &str) -> Result<(&str, &str)> {
    let rest = content
        .trim_start_matches('\u{feff}')
        .strip_prefix(DELIMITER)
        .ok_or_else(|| Error::InvalidInput("missing frontmatter delimiter".to_string()))?;

    let end = rest
        .find("\n---")
        .ok_or_else(|| Error::InvalidInput("unterminated frontmatter".to_string()))?;

    let header = &rest[..end];
    let after = &rest[end + "\n---".len()..];
    // Drop the remainder of the closing delimiter line
    let body = match after.find('\n') {
        Some(pos) => &after[pos + 1..],
        None => "",
    };
    Ok((header, body.trim()))
}

/// Parse the YAML header into `T` and return it with the body.
pub fn parse<T: DeserializeOwned>(content: &str) -> Result<(T, String)> {
    let (header, body) = split(content)?;
    let meta: T = serde_yaml::from_str(header)?;
    Ok((meta, body.to_string()))
}

/// Render metadata and body back into the file format.
pub fn render<T: Serialize>(meta: &T, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(meta)?;
    let mut out = String::with_capacity(yaml.len() + body.len() + 16);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push_str("\n\n");
    out.push_str(body.trim());
    out.push('\n');
    Ok(out)
}
