use crate::dictionary::{normalize_pinyin, Dictionary, HeadwordId, WordSense};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"(?u)\p{Latin}[\p{Latin}\p{N}']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","an","and","are","as","at","be","by","for","from","has","in","into","is","it","its",
            "of","on","or","sb","sth","that","the","their","this","to","was","were","which","with",
        ];
        words.iter().copied().collect()
    };
}

/// (headword, index into its senses)
type SenseRef = (HeadwordId, usize);

/// English and pinyin lookup of dictionary senses.
pub struct ReverseIndex {
    dict: Arc<Dictionary>,
    pinyin: HashMap<String, BTreeSet<SenseRef>>,
    english: HashMap<String, BTreeSet<SenseRef>>,
}

impl ReverseIndex {
    pub fn build(dict: Arc<Dictionary>) -> Self {
        let mut pinyin: HashMap<String, BTreeSet<SenseRef>> = HashMap::new();
        let mut english: HashMap<String, BTreeSet<SenseRef>> = HashMap::new();
        for word in dict.words() {
            for (i, sense) in word.senses.iter().enumerate() {
                let key = normalize_pinyin(&sense.pinyin);
                if !key.is_empty() {
                    pinyin.entry(key).or_default().insert((word.headword_id, i));
                }
                for term in english_terms(&sense.english) {
                    english.entry(term).or_default().insert((word.headword_id, i));
                }
            }
        }
        tracing::debug!(pinyin_keys = pinyin.len(), english_keys = english.len(), "reverse index built");
        Self { dict, pinyin, english }
    }

    /// Senses whose pinyin matches the query, else senses whose gloss has every English term of it.
    pub fn lookup(&self, query: &str) -> Vec<WordSense> {
        let by_pinyin = self.lookup_pinyin(&normalize_pinyin(query));
        if !by_pinyin.is_empty() {
            return by_pinyin;
        }
        let terms = english_terms(query);
        let mut sets = terms.iter().map(|t| self.english.get(t));
        let mut acc: BTreeSet<SenseRef> = match sets.next() {
            Some(Some(first)) => first.clone(),
            _ => return Vec::new(),
        };
        for set in sets {
            match set {
                Some(set) => acc = acc.intersection(set).copied().collect(),
                None => return Vec::new(),
            }
        }
        self.resolve(&acc)
    }

    /// Senses whose normalized pinyin equals `key` exactly.
    pub fn lookup_pinyin(&self, key: &str) -> Vec<WordSense> {
        match self.pinyin.get(key) {
            Some(refs) => self.resolve(refs),
            None => Vec::new(),
        }
    }

    fn resolve(&self, refs: &BTreeSet<SenseRef>) -> Vec<WordSense> {
        refs.iter()
            .filter_map(|&(hw, i)| self.dict.by_headword(hw).and_then(|w| w.senses.get(i)).cloned())
            .collect()
    }
}

/// Normalized English terms of a gloss: NFKC, lowercase, stopwords removed, stemmed.
pub fn english_terms(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD_RE
        .find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|w| !STOPWORDS.contains(w))
        .map(|w| STEMMER.stem(w).to_string())
        .collect()
}
