//! Approximate phrase matching for translators.
//!
//! Candidates come from two places: terms that sound the same as the query
//! (pinyin through the reverse index) and terms that share characters with it
//! (a unigram index). Each candidate is scored with overlap and Hamming
//! distance and kept or dropped by a fixed classifier.

use crate::calibration::{
    TM_MAX_HAMMING_RATIO, TM_MAX_RESULTS, TM_MAX_RESULTS_SUBSTRINGS, TM_MIN_UNIGRAM_RATIO, TM_QUERY_CHARS,
    TM_STRICT_MAX_HAMMING, TM_STRICT_MIN_UNIGRAM,
};
use crate::dictionary::{normalize_pinyin, Dictionary, Word};
use crate::error::SearchError;
use crate::reverse::ReverseIndex;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// A term found by a shared-character lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct UnigramHit {
    pub term: String,
    pub ch: char,
}

/// Lookup of candidate terms by shared character.
pub trait TmIndex: Send + Sync {
    /// Terms containing any of `chars`, optionally restricted to one domain.
    fn find_by_unigram(&self, chars: &[char], domain: Option<&str>) -> Result<Vec<UnigramHit>>;
}

/// Unigram index over the multi-character forms of a dictionary.
pub struct MemoryTmIndex {
    by_char: HashMap<char, Vec<(String, BTreeSet<String>)>>,
}

impl MemoryTmIndex {
    pub fn build(dict: &Dictionary) -> Self {
        let mut by_char: HashMap<char, Vec<(String, BTreeSet<String>)>> = HashMap::new();
        for word in dict.words() {
            let domains: BTreeSet<String> = word.senses.iter().map(|s| s.domain.clone()).filter(|d| !d.is_empty()).collect();
            for form in word.forms() {
                if form.chars().count() < 2 {
                    continue;
                }
                let distinct: BTreeSet<char> = form.chars().collect();
                for ch in distinct {
                    by_char.entry(ch).or_default().push((form.to_string(), domains.clone()));
                }
            }
        }
        Self { by_char }
    }
}

impl TmIndex for MemoryTmIndex {
    fn find_by_unigram(&self, chars: &[char], domain: Option<&str>) -> Result<Vec<UnigramHit>> {
        let distinct: BTreeSet<char> = chars.iter().copied().collect();
        let mut hits = Vec::new();
        for ch in distinct {
            for (term, domains) in self.by_char.get(&ch).into_iter().flatten() {
                if domain.map_or(true, |d| domains.contains(d)) {
                    hits.push(UnigramHit { term: term.clone(), ch });
                }
            }
        }
        Ok(hits)
    }
}

/// Scoring features of one candidate term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TmResult {
    pub term: String,
    pub unigram_count: usize,
    pub hamming: usize,
    pub pinyin_match: bool,
    pub notes_match: bool,
    pub substring: bool,
    pub relevant: bool,
}

pub struct TranslationMemorySearcher {
    dict: Arc<Dictionary>,
    reverse: Arc<ReverseIndex>,
    index: Arc<dyn TmIndex>,
}

impl TranslationMemorySearcher {
    pub fn new(dict: Arc<Dictionary>, reverse: Arc<ReverseIndex>, index: Arc<dyn TmIndex>) -> Self {
        Self { dict, reverse, index }
    }

    /// Dictionary words similar to `query`, at most one per headword.
    pub fn search(&self, query: &str, domain: Option<&str>, include_substrings: bool) -> Result<Vec<Arc<Word>>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let domain = domain.map(str::trim).filter(|d| !d.is_empty());

        let mut candidates: BTreeMap<String, TmResult> = BTreeMap::new();
        for term in self.phonetic_candidates(query, domain) {
            let entry = candidates.entry(term.clone()).or_insert_with(|| TmResult { term: term.clone(), ..TmResult::default() });
            entry.pinyin_match = true;
            entry.unigram_count = entry.unigram_count.max(shared_chars(query, &term));
        }
        for (term, count) in self.unigram_candidates(query, domain) {
            let entry = candidates.entry(term.clone()).or_insert_with(|| TmResult { term, ..TmResult::default() });
            entry.unigram_count = entry.unigram_count.max(count);
        }

        let mut scored: Vec<(TmResult, Arc<Word>)> = Vec::new();
        for (term, mut result) in candidates {
            if !include_substrings && term != query && query.contains(term.as_str()) {
                continue;
            }
            let Some(word) = self.dict.get(&term) else {
                tracing::debug!(%term, "candidate not in dictionary");
                continue;
            };
            result.hamming = hamming(query, &term);
            result.substring = is_substring(query, &term);
            result.notes_match = word.senses.iter().any(|s| s.notes.contains(query));
            result.relevant = classify(&result, query.chars().count(), include_substrings);
            if result.relevant {
                scored.push((result, Arc::clone(word)));
            }
        }
        scored.sort_by(|(a, _), (b, _)| {
            b.unigram_count.cmp(&a.unigram_count).then(a.hamming.cmp(&b.hamming)).then_with(|| a.term.cmp(&b.term))
        });

        let cap = if include_substrings { TM_MAX_RESULTS_SUBSTRINGS } else { TM_MAX_RESULTS };
        let mut seen = HashSet::new();
        let words: Vec<Arc<Word>> = scored
            .into_iter()
            .filter(|(_, w)| seen.insert(w.headword_id))
            .map(|(_, w)| w)
            .take(cap)
            .collect();
        tracing::debug!(query, results = words.len(), "translation memory search");
        Ok(words)
    }

    /// Forms of every word pronounced like the query.
    fn phonetic_candidates(&self, query: &str, domain: Option<&str>) -> Vec<String> {
        let Some(pinyin) = self.query_pinyin(query) else {
            return Vec::new();
        };
        let mut terms = Vec::new();
        for sense in self.reverse.lookup_pinyin(&pinyin) {
            if domain.map_or(false, |d| sense.domain != d) {
                continue;
            }
            terms.push(sense.simplified.clone());
            terms.extend(sense.traditional.clone());
        }
        terms
    }

    /// Concatenated toneless pinyin of each query character, if all are known.
    fn query_pinyin(&self, query: &str) -> Option<String> {
        let mut pinyin = String::new();
        for ch in query.chars() {
            let word = self.dict.get(ch.encode_utf8(&mut [0; 4]))?;
            pinyin.push_str(&normalize_pinyin(&word.pinyin));
        }
        Some(pinyin).filter(|p| !p.is_empty())
    }

    /// Distinct shared-character counts for terms sharing characters with the query.
    fn unigram_candidates(&self, query: &str, domain: Option<&str>) -> HashMap<String, usize> {
        let mut chars: Vec<char> = query.chars().take(TM_QUERY_CHARS).collect();
        if let Some(&last) = chars.last() {
            chars.resize(TM_QUERY_CHARS, last);
        }
        let hits = match self.index.find_by_unigram(&chars, domain) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(query, error = %err, "unigram lookup failed");
                return HashMap::new();
            }
        };
        let mut per_term: HashMap<String, HashSet<char>> = HashMap::new();
        for hit in hits {
            per_term.entry(hit.term).or_default().insert(hit.ch);
        }
        per_term.into_iter().map(|(term, chars)| (term, chars.len())).collect()
    }
}

/// Number of distinct query characters present in `term`.
fn shared_chars(query: &str, term: &str) -> usize {
    let q: HashSet<char> = query.chars().collect();
    term.chars().collect::<HashSet<char>>().intersection(&q).count()
}

/// Position-wise character mismatches plus the difference in length.
pub fn hamming(a: &str, b: &str) -> usize {
    let (la, lb) = (a.chars().count(), b.chars().count());
    let mismatches = a.chars().zip(b.chars()).filter(|(x, y)| x != y).count();
    mismatches + la.abs_diff(lb)
}

/// Either string contains the other; single characters never count.
pub fn is_substring(a: &str, b: &str) -> bool {
    if a.chars().count() < 2 || b.chars().count() < 2 {
        return false;
    }
    a.contains(b) || b.contains(a)
}

/// The relevance classifier.
pub fn classify(r: &TmResult, query_len: usize, include_substrings: bool) -> bool {
    if r.substring || r.notes_match || (r.unigram_count >= 1 && r.pinyin_match) {
        return true;
    }
    if include_substrings {
        let len = query_len.max(1) as f64;
        r.unigram_count as f64 / len >= TM_MIN_UNIGRAM_RATIO && r.hamming as f64 / len <= TM_MAX_HAMMING_RATIO
    } else {
        r.unigram_count >= TM_STRICT_MIN_UNIGRAM && r.hamming <= TM_STRICT_MAX_HAMMING
    }
}
