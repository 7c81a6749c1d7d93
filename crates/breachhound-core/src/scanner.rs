//! Corpus scanner — substring search with context extraction and
//! related-term expansion.
//!
//! The scan is a linear, case-insensitive pass over every eligible file.
//! There is no index and no parallelism across files; a large corpus blocks
//! the calling task for the full scan.

use tracing::warn;

use crate::corpus::Corpus;

/// Lines of context captured on each side of a matched line.
pub const CONTEXT_WINDOW: usize = 2;

/// Seed terms and the literal substrings they expand to.
///
/// A related term is searched for independently of the seed, so a file that
/// contains only `@gmail.com` still shows up for a search of `email`.
const RELATED_TERMS: &[(&str, &[&str])] = &[
    ("email", &["@gmail.com", "@hotmail.com", "@yahoo.com"]),
    ("password", &["Password:", "🔑Password:"]),
    ("card", &["visa", "mastercard", "american express"]),
];

/// The trimmed block of lines surrounding one matched line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBlock {
    /// The matched line, trimmed.
    pub matched_line: String,
    /// The surrounding window, joined and trimmed.
    pub block: String,
}

/// All matches found in a single corpus file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// File name relative to the corpus root.
    pub file_name: String,
    /// Related terms found in this file, in table order.
    pub related_terms: Vec<String>,
    /// Context blocks in file order: primary-term hits first, then each
    /// related term's hits.
    pub contexts: Vec<ContextBlock>,
}

/// Look up the related substrings for a seed term (lowercased).
pub fn related_terms_for(term: &str) -> &'static [&'static str] {
    let term = term.to_lowercase();
    RELATED_TERMS
        .iter()
        .find(|(seed, _)| *seed == term)
        .map(|(_, related)| *related)
        .unwrap_or(&[])
}

/// Scan the corpus for `term`, returning one result per file with at least
/// one hit of the term or of any related term.
///
/// Unreadable files are logged and skipped; only enumerating the corpus
/// itself can fail.
pub fn scan(corpus: &Corpus, term: &str) -> std::io::Result<Vec<SearchResult>> {
    let related = related_terms_for(term);
    let mut results = Vec::new();

    for path in corpus.files()? {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable corpus file");
                continue;
            }
        };

        let term_matched = contains_ignore_case(&content, term);
        let mut contexts = if term_matched {
            extract_contexts(&content, term)
        } else {
            Vec::new()
        };

        let mut related_terms = Vec::new();
        for candidate in related {
            if contains_ignore_case(&content, candidate) {
                related_terms.push(candidate.to_string());
                contexts.extend(extract_contexts(&content, candidate));
            }
        }

        if term_matched || !related_terms.is_empty() {
            let file_name = path
                .strip_prefix(corpus.root())
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            results.push(SearchResult {
                file_name,
                related_terms,
                contexts,
            });
        }
    }

    Ok(results)
}

/// Extract a ±[`CONTEXT_WINDOW`]-line block for every line containing
/// `term`, case-insensitively, in file order. Overlapping windows from
/// nearby hits are kept as-is.
pub fn extract_contexts(content: &str, term: &str) -> Vec<ContextBlock> {
    let lines: Vec<&str> = content.lines().collect();
    let mut contexts = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !contains_ignore_case(line, term) {
            continue;
        }
        let start = i.saturating_sub(CONTEXT_WINDOW);
        let end = (i + CONTEXT_WINDOW + 1).min(lines.len());
        contexts.push(ContextBlock {
            matched_line: line.trim().to_string(),
            block: lines[start..end].join("\n").trim().to_string(),
        });
    }

    contexts
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
