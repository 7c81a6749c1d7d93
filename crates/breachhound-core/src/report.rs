//! Result aggregation — the durable report artifact and the size-bounded
//! interactive summary.
//!
//! Each search writes its artifact under a per-request unique name, so
//! concurrent searches (and repeated searches for the same term) never
//! clobber one another's artifact.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::info;

use crate::error::BotError;
use crate::scanner::{ContextBlock, SearchResult};

/// Character budget for a single outbound message.
pub const MESSAGE_CHAR_BUDGET: usize = 1900;

/// Results shown in detail in the interactive summary.
const TOP_RESULTS: usize = 3;

/// Context blocks shown per result in the interactive summary.
const CONTEXTS_PER_RESULT: usize = 2;

/// Character cap for a single context block in the summary.
const CONTEXT_TRUNCATE: usize = 200;

/// Total context-block count beyond which the summary leads with an
/// overview line.
const PREVIEW_THRESHOLD: usize = 10;

/// Delimiter between results in the report artifact.
const ARTIFACT_DELIMITER: &str =
    "--------------------------------------------------";

/// Writes report artifacts under a configured directory.
pub struct ReportWriter {
    reports_dir: PathBuf,
}

impl ReportWriter {
    /// Create a writer targeting `reports_dir`. The directory is created on
    /// first write.
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Write the full results of one search to a per-request artifact and
    /// return its path. Artifacts from earlier requests are left in place.
    pub fn write(&self, term: &str, results: &[SearchResult]) -> Result<PathBuf, BotError> {
        let file_name = format!("search-{}-{}.txt", sanitize(term), next_request_id());
        let path = self.reports_dir.join(file_name);

        std::fs::create_dir_all(&self.reports_dir)?;
        std::fs::write(&path, render_artifact(term, results))?;

        info!(artifact = %path.display(), results = results.len(), "report artifact written");
        Ok(path)
    }

    /// Directory artifacts are written to.
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }
}

/// Render the artifact body: every file, its related terms, and every
/// context block, delimited per result.
fn render_artifact(term: &str, results: &[SearchResult]) -> String {
    let mut out = format!("Complete search results for '{term}':\n\n");
    for result in results {
        out.push_str(&format!("File: {}\n", result.file_name));
        if !result.related_terms.is_empty() {
            out.push_str(&format!(
                "Related findings: {}\n",
                result.related_terms.join(", ")
            ));
        }
        for ctx in &result.contexts {
            out.push_str(&format!("Context:\n{}\n\n", ctx.block));
        }
        out.push_str(ARTIFACT_DELIMITER);
        out.push('\n');
    }
    out
}

/// Build the interactive summary as a sequence of messages, each within
/// [`MESSAGE_CHAR_BUDGET`], split only at result and context-block
/// boundaries.
pub fn build_summary(term: &str, results: &[SearchResult]) -> Vec<String> {
    let total_contexts: usize = results.iter().map(|r| r.contexts.len()).sum();

    let mut units = vec![format!("🔍 Search results for '{term}'")];
    if total_contexts > PREVIEW_THRESHOLD {
        units.push(format!(
            "📊 Found {} total matches in {} files",
            total_contexts,
            results.len()
        ));
    }

    for result in ranked(term, results).into_iter().take(TOP_RESULTS) {
        let mut header = format!("📄 {}", result.file_name);
        if !result.related_terms.is_empty() {
            header.push_str(&format!(
                " (related: {})",
                result.related_terms.join(", ")
            ));
        }
        units.push(header);

        for ctx in preview_contexts(term, result) {
            units.push(truncate(&ctx.block));
        }
    }

    chunk(&units)
}

/// Rank results by the count of context blocks containing the literal term,
/// descending; ties keep scan order.
fn ranked<'a>(term: &str, results: &'a [SearchResult]) -> Vec<&'a SearchResult> {
    let mut ranked: Vec<&SearchResult> = results.iter().collect();
    ranked.sort_by_key(|r| std::cmp::Reverse(relevance(term, r)));
    ranked
}

fn relevance(term: &str, result: &SearchResult) -> usize {
    let term = term.to_lowercase();
    result
        .contexts
        .iter()
        .filter(|c| c.block.to_lowercase().contains(&term))
        .count()
}

/// Pick the context blocks shown for one result: blocks containing the term
/// first, falling back to file order when none do.
fn preview_contexts<'a>(term: &str, result: &'a SearchResult) -> Vec<&'a ContextBlock> {
    let lowered = term.to_lowercase();
    let exact: Vec<&ContextBlock> = result
        .contexts
        .iter()
        .filter(|c| c.block.to_lowercase().contains(&lowered))
        .take(CONTEXTS_PER_RESULT)
        .collect();

    if !exact.is_empty() {
        return exact;
    }
    result.contexts.iter().take(CONTEXTS_PER_RESULT).collect()
}

fn truncate(block: &str) -> String {
    if block.chars().count() <= CONTEXT_TRUNCATE {
        return block.to_string();
    }
    let cut: String = block.chars().take(CONTEXT_TRUNCATE).collect();
    format!("{cut}...")
}

/// Pack units into messages without splitting any unit and without
/// dropping content. A unit larger than the budget becomes its own message.
fn chunk(units: &[String]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = String::new();

    for unit in units {
        let needed = if current.is_empty() {
            unit.len()
        } else {
            current.len() + 1 + unit.len()
        };

        if needed > MESSAGE_CHAR_BUDGET && !current.is_empty() {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(unit);
    }

    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

fn sanitize(term: &str) -> String {
    term.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn next_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}-{seq:04}", Utc::now().format("%Y%m%d%H%M%S"))
}
