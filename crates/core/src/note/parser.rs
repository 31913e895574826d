//! Document parsing: frontmatter, wikilinks, tags.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::types::{Document, ReferenceEdge, stem_of};
use crate::frontmatter;
use crate::vault::content_hash_str;

// Matches [[target]], [[target|alias]], [[target#section]],
// [[target#section|alias]]; a leading ! marks an embed.
static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[\[([^\[\]#|]+)(?:#([^\]|]*))?(?:\|([^\]]*))?\]\]").unwrap()
});

// Inline #tag tokens. The leading char class stands in for a lookbehind:
// rejects ##heading and word#fragment forms.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[^#\w])#([A-Za-z][A-Za-z0-9_/-]*)").unwrap()
});

/// Parse a document from raw file content.
///
/// `path` is the vault-relative path. Output is deterministic for a given
/// input; malformed frontmatter degrades to a recorded warning instead of
/// failing the document.
pub fn parse_document(path: &str, raw: &str, modified: DateTime<Utc>) -> Document {
    let path = normalize_path(path);
    let mut warnings = Vec::new();

    let (parsed, fm_warning) = frontmatter::parse_lenient(raw);
    if let Some(w) = fm_warning {
        warnings.push(w);
    }

    // Fenced blocks and inline code spans are blanked before link and tag
    // extraction so code never contributes references or tags.
    let masked = mask_code_regions(&parsed.body);

    let links = extract_links(&masked);
    let tags = extract_tags(&masked, parsed.frontmatter.as_ref());
    let title = extract_title(parsed.frontmatter.as_ref(), &masked, &path);

    Document {
        title,
        raw: raw.to_string(),
        body: parsed.body,
        frontmatter: parsed.frontmatter,
        links,
        tags,
        content_hash: content_hash_str(raw),
        modified,
        warnings,
        path,
    }
}

/// Normalize a vault-relative path: forward slashes only.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Normalize a link target: trim, forward slashes, strip `.md`.
pub fn normalize_target(target: &str) -> String {
    let target = target.trim().replace('\\', "/");
    target.strip_suffix(".md").unwrap_or(&target).to_string()
}

fn extract_links(masked_body: &str) -> Vec<ReferenceEdge> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for cap in WIKILINK_RE.captures_iter(masked_body) {
        let embed = !cap[1].is_empty();
        let target = normalize_target(&cap[2]);
        if target.is_empty() {
            continue;
        }

        let section = cap
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        let alias = cap
            .get(4)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        let edge = ReferenceEdge { target, alias, section, embed };
        if seen.insert(edge.clone()) {
            links.push(edge);
        }
    }

    links
}

fn extract_tags(
    masked_body: &str,
    fm: Option<&frontmatter::Frontmatter>,
) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    if let Some(fm) = fm {
        for tag in fm.tags() {
            let tag = tag.trim().trim_start_matches('#');
            if !tag.is_empty() {
                tags.insert(tag.to_string());
            }
        }
    }

    for cap in TAG_RE.captures_iter(masked_body) {
        tags.insert(cap[1].to_string());
    }

    tags
}

fn extract_title(
    fm: Option<&frontmatter::Frontmatter>,
    masked_body: &str,
    path: &str,
) -> String {
    if let Some(title) = fm.and_then(frontmatter::Frontmatter::title) {
        return title.to_string();
    }

    // First level-1 heading
    for line in masked_body.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix('#')
            && !rest.starts_with('#')
        {
            let heading = rest.trim();
            if !heading.is_empty() {
                return heading.to_string();
            }
        }
    }

    stem_of(path).to_string()
}

/// Replace fenced code blocks and inline code spans with spaces.
///
/// Fences are lines whose first non-whitespace characters are ``` or ~~~;
/// inline spans are matched backtick runs of equal length on one line.
/// Unterminated spans are left as plain text.
fn mask_code_regions(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_fence = false;
    let mut fence_marker = "";

    for (i, line) in body.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }

        let trimmed = line.trim_start();
        if in_fence {
            if trimmed.starts_with(fence_marker) {
                in_fence = false;
            }
            blank_into(&mut out, line);
        } else if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = true;
            fence_marker = if trimmed.starts_with("```") { "```" } else { "~~~" };
            blank_into(&mut out, line);
        } else {
            mask_inline_spans(&mut out, line);
        }
    }

    out
}

fn blank_into(out: &mut String, line: &str) {
    out.extend(line.chars().map(|_| ' '));
}

fn mask_inline_spans(out: &mut String, line: &str) {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '`' {
            let mut run = 1;
            while i + run < chars.len() && chars[i + run] == '`' {
                run += 1;
            }
            if let Some(close) = find_closing_run(&chars, i + run, run) {
                // Blank the whole span including delimiters
                for _ in i..close + run {
                    out.push(' ');
                }
                i = close + run;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
}

/// Find the start of a backtick run of exactly `len` backticks at or after
/// `from`.
fn find_closing_run(chars: &[char], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '`' {
            let mut run = 1;
            while i + run < chars.len() && chars[i + run] == '`' {
                run += 1;
            }
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}
