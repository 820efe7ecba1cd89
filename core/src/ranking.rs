use crate::calibration::{BM25_B, BM25_K, INTERCEPT, MIN_SIMILARITY, TITLE_EXACT, TITLE_PARTIAL, WEIGHTS};
use crate::document::Document;
use crate::index::{DocMeta, NGram, TermFrequencyStore};
use std::collections::{BTreeSet, HashMap};

/// BM25 scores of every document containing at least one of `terms`.
///
/// Word queries also carry the bit-vector signal: how many distinct terms
/// the document contains. Store failures and malformed postings are
/// logged and skipped.
pub fn bm25_documents(
    store: &dyn TermFrequencyStore,
    kind: NGram,
    terms: &[String],
    collection: Option<&str>,
    avg_doc_len: f64,
) -> Vec<Document> {
    let distinct: BTreeSet<&str> = terms.iter().map(String::as_str).collect();
    let mut scores: HashMap<String, (f64, Vec<&str>)> = HashMap::new();
    for &term in &distinct {
        let postings = match store.postings(kind, term, collection) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(term, ?kind, error = %err, "term frequency lookup failed");
                continue;
            }
        };
        for p in postings {
            if p.is_malformed() {
                tracing::warn!(term, gloss_file = %p.gloss_file, doc_len = p.doc_len, idf = p.idf, "skipping malformed posting");
                continue;
            }
            let entry = scores.entry(p.gloss_file).or_insert_with(|| (0.0, Vec::new()));
            entry.0 += bm25(p.freq as f64, p.idf, p.doc_len as f64, avg_doc_len);
            entry.1.push(term);
        }
    }
    scores
        .into_iter()
        .map(|(gloss_file, (score, contains))| {
            let mut doc = Document::new(&gloss_file);
            match kind {
                NGram::Word => {
                    doc.sim_words = score;
                    doc.sim_bit_vector = contains.len() as f64;
                    doc.contains_words = contains.join(",");
                }
                NGram::Bigram => {
                    doc.sim_bigram = score;
                    doc.contains_bigrams = contains.join(",");
                }
            }
            doc
        })
        .collect()
}

/// One posting's contribution to a document's BM25 score.
pub fn bm25(freq: f64, idf: f64, doc_len: f64, avg_doc_len: f64) -> f64 {
    (BM25_K + 1.0) * freq * idf / (freq + BM25_K * (1.0 - BM25_B + BM25_B * (doc_len / avg_doc_len)))
}

/// Title-match documents: exact title or collection title scores higher than containment.
pub fn title_documents(query: &str, found: Vec<DocMeta>) -> Vec<Document> {
    found
        .into_iter()
        .map(|meta| {
            let exact = meta.title == query || meta.collection_title == query;
            let mut doc = Document::new(&meta.gloss_file).with_meta(&meta);
            doc.sim_title = if exact { TITLE_EXACT } else { TITLE_PARTIAL };
            doc
        })
        .collect()
}

/// Fold partial result sets into one map keyed by gloss file.
///
/// New keys take their metadata from `lookup`; a missing entry is logged and
/// the document kept with blank metadata.
pub fn merge_partials<F>(partials: Vec<Vec<Document>>, lookup: F) -> HashMap<String, Document>
where
    F: Fn(&str) -> Option<DocMeta>,
{
    let mut merged: HashMap<String, Document> = HashMap::new();
    for doc in partials.into_iter().flatten() {
        if let Some(existing) = merged.get_mut(&doc.gloss_file) {
            existing.merge(doc);
            continue;
        }
        let doc = if doc.title.is_empty() {
            match lookup(&doc.gloss_file) {
                Some(meta) => doc.with_meta(&meta),
                None => {
                    tracing::warn!(gloss_file = %doc.gloss_file, "document missing from metadata cache");
                    doc
                }
            }
        } else {
            doc
        };
        merged.insert(doc.gloss_file.clone(), doc);
    }
    merged
}

/// Combined similarity of one document given the set-wide maxima.
pub fn combined_similarity(doc: &Document, max_words: f64, max_bigram: f64) -> f64 {
    if max_words == 0.0 || max_bigram == 0.0 {
        return MIN_SIMILARITY;
    }
    INTERCEPT
        + WEIGHTS[0] * doc.sim_words / max_words
        + WEIGHTS[1] * doc.sim_bigram / max_bigram
        + WEIGHTS[2] * doc.sim_bit_vector
}

/// Score, drop documents below the floor, and keep the best `limit`.
pub fn rank(merged: HashMap<String, Document>, limit: usize) -> Vec<Document> {
    let max_words = merged.values().map(|d| d.sim_words).fold(0.0, f64::max);
    let max_bigram = merged.values().map(|d| d.sim_bigram).fold(0.0, f64::max);
    let mut docs: Vec<Document> = merged
        .into_values()
        .map(|mut d| {
            d.similarity = combined_similarity(&d, max_words, max_bigram);
            d
        })
        .filter(|d| d.similarity >= MIN_SIMILARITY)
        .collect();
    docs.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.gloss_file.cmp(&b.gloss_file))
    });
    docs.truncate(limit);
    docs
}

/// Ordered trace of which query pieces a document contains, preferring bigrams.
pub fn contains_terms(doc: &Document, terms: &[String]) -> Vec<String> {
    let words: BTreeSet<&str> = split_list(&doc.contains_words);
    let bigrams: BTreeSet<&str> = split_list(&doc.contains_bigrams);
    let mut out: Vec<String> = Vec::new();
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            let bigram = format!("{}{}", terms[i - 1], term);
            if bigrams.contains(bigram.as_str()) {
                if out.last() == Some(&terms[i - 1]) {
                    out.pop();
                }
                out.push(bigram);
                continue;
            }
        }
        if words.contains(term.as_str()) {
            out.push(term.clone());
        }
    }
    out
}

fn split_list(list: &str) -> BTreeSet<&str> {
    list.split(',').filter(|s| !s.is_empty()).collect()
}

/// Final order: longest literal match first, then combined similarity.
pub fn sort_by_match(docs: &mut [Document]) {
    docs.sort_by(|a, b| {
        let la = a.matching.longest_match.chars().count();
        let lb = b.matching.longest_match.chars().count();
        lb.cmp(&la).then_with(|| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal))
    });
}
