//! Frontmatter parsing from markdown documents.

use super::types::{Frontmatter, ParsedDocument};
use thiserror::Error;

/// Errors that can occur during frontmatter parsing.
#[derive(Debug, Error)]
pub enum FrontmatterParseError {
    #[error("invalid YAML frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
}

/// Parse frontmatter from markdown content.
///
/// Frontmatter is delimited by `---` at the start of the document:
/// ```markdown
/// ---
/// key: value
/// ---
/// # Document content
/// ```
pub fn parse(content: &str) -> Result<ParsedDocument, FrontmatterParseError> {
    let Some((yaml, body)) = split(content) else {
        return Ok(ParsedDocument { frontmatter: None, body: content.to_string() });
    };

    let frontmatter: Frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml.trim())?
    };

    Ok(ParsedDocument { frontmatter: Some(frontmatter), body: body.to_string() })
}

/// Parse frontmatter, degrading to "no frontmatter" on malformed YAML.
///
/// The malformed block is still stripped from the body so it is not
/// indexed as text. Returns the parse warning message, if any.
pub fn parse_lenient(content: &str) -> (ParsedDocument, Option<String>) {
    match parse(content) {
        Ok(parsed) => (parsed, None),
        Err(e) => {
            let body = split(content)
                .map_or_else(|| content.to_string(), |(_, body)| body.to_string());
            (ParsedDocument { frontmatter: None, body }, Some(e.to_string()))
        }
    }
}

/// Split content into the raw YAML block and the body.
/// Returns `None` when there is no well-delimited frontmatter block.
fn split(content: &str) -> Option<(&str, &str)> {
    let trimmed = content.trim_start();

    if !trimmed.starts_with("---") {
        return None;
    }

    let after_first = &trimmed[3..];
    let after_newline = after_first
        .strip_prefix('\n')
        .or_else(|| after_first.strip_prefix("\r\n"))
        .unwrap_or(after_first);

    let end_pos = find_closing_delimiter(after_newline)?;
    let yaml = &after_newline[..end_pos];

    // Skip closing --- and the following newline
    let after_closing = &after_newline[end_pos..];
    let after_closing = after_closing
        .lines()
        .next()
        .map_or(after_closing, |l| &after_closing[l.len()..]);
    let body = after_closing
        .strip_prefix("\r\n")
        .or_else(|| after_closing.strip_prefix('\n'))
        .unwrap_or(after_closing);

    Some((yaml, body))
}

/// Find the byte position of the closing `---` delimiter line.
fn find_closing_delimiter(content: &str) -> Option<usize> {
    let mut pos = 0;
    for line in content.lines() {
        if line.trim() == "---" {
            return Some(pos);
        }
        pos += line.len() + 1; // +1 for newline
    }
    None
}
