//! Literal matching of query terms inside document bodies.
//!
//! A batch spawns one worker per document. Workers pop keys from a shared
//! queue and push `(key, match)` pairs onto one channel. Every worker is
//! joined before the channel is drained, so no late result can be lost.

use crate::document::MatchingText;
use crate::error::SearchError;
use crate::text_store::TextStore;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct MatchExtractor {
    store: Arc<dyn TextStore>,
    snippet_len: usize,
}

impl MatchExtractor {
    pub fn new(store: Arc<dyn TextStore>, snippet_len: usize) -> Self {
        Self { store, snippet_len }
    }

    /// Match details for a single document.
    pub async fn get_matching(&self, gloss_file: &str, terms: &[String]) -> Result<MatchingText, SearchError> {
        let body = self
            .store
            .fetch(gloss_file)
            .await
            .map_err(|err| SearchError::TextUnavailable { key: gloss_file.to_string(), source: err.into() })?;
        Ok(get_match(&body, terms, self.snippet_len))
    }

    /// Match details for many documents, fetched concurrently.
    ///
    /// Every key is present in the result. A document that cannot be read is
    /// logged and mapped to an empty match.
    pub async fn get_matches(&self, keys: &[String], terms: &[String]) -> HashMap<String, MatchingText> {
        let queue = Arc::new(Mutex::new(keys.iter().cloned().collect::<VecDeque<String>>()));
        let terms: Arc<[String]> = terms.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, MatchingText)>();

        let mut workers = Vec::with_capacity(keys.len());
        for _ in 0..keys.len() {
            let queue = queue.clone();
            let terms = terms.clone();
            let tx = tx.clone();
            let store = self.store.clone();
            let snippet_len = self.snippet_len;
            workers.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().pop_front();
                    let Some(key) = next else { break };
                    let matching = match store.fetch(&key).await {
                        Ok(body) => get_match(&body, &terms, snippet_len),
                        Err(err) => {
                            tracing::warn!(gloss_file = %key, error = %err, "could not read document body");
                            MatchingText::default()
                        }
                    };
                    if tx.send((key, matching)).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        for worker in workers {
            if let Err(err) = worker.await {
                tracing::error!(%err, "match worker failed");
            }
        }
        let mut results = HashMap::with_capacity(keys.len());
        while let Some((key, matching)) = rx.recv().await {
            results.insert(key, matching);
        }
        for key in keys {
            results.entry(key.clone()).or_default();
        }
        results
    }
}

/// Best literal match of the query terms in `body`.
///
/// The joined terms are tried first. Failing that, the longest run that keeps
/// the last term and the longest run that keeps the first term are found, and
/// the one with more terms wins.
pub fn get_match(body: &str, terms: &[String], snippet_len: usize) -> MatchingText {
    let terms: Vec<&str> = terms.iter().map(String::as_str).filter(|t| !t.is_empty()).collect();
    if terms.is_empty() || body.is_empty() {
        return MatchingText::default();
    }
    let joined = terms.concat();
    if let Some(pos) = body.find(&joined) {
        return MatchingText { snippet: snippet_around(body, pos, snippet_len), longest_match: joined, exact_match: true };
    }

    let n = terms.len();
    let suffix = (1..n).find_map(|i| located(body, &terms[i..]));
    let prefix = (1..n).rev().find_map(|j| located(body, &terms[..j]));
    let best = match (suffix, prefix) {
        (Some(s), Some(p)) => {
            if (p.terms, p.text.chars().count()) >= (s.terms, s.text.chars().count()) { Some(p) } else { Some(s) }
        }
        (s, p) => s.or(p),
    };
    match best {
        Some(m) => MatchingText { snippet: snippet_around(body, m.pos, snippet_len), longest_match: m.text, exact_match: false },
        None => MatchingText::default(),
    }
}

struct Located {
    terms: usize,
    text: String,
    pos: usize,
}

fn located(body: &str, run: &[&str]) -> Option<Located> {
    let text = run.concat();
    body.find(&text).map(|pos| Located { terms: run.len(), text, pos })
}

/// Up to `width` characters of `body` centred on the byte offset `pos`.
fn snippet_around(body: &str, pos: usize, width: usize) -> String {
    let start = body[..pos].char_indices().rev().take(width / 2).last().map_or(pos, |(i, _)| i);
    let before = body[start..pos].chars().count();
    let end = body[pos..].char_indices().nth(width.saturating_sub(before)).map_or(body.len(), |(i, _)| pos + i);
    body[start..end].to_string()
}
