use crate::index::DocMeta;
use crate::query::TextSegment;
use serde::{Deserialize, Serialize};

/// A named group of documents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Collection {
    pub gloss_file: String,
    pub title: String,
}

/// Literal match of the query inside a document body.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MatchingText {
    pub snippet: String,
    pub longest_match: String,
    pub exact_match: bool,
}

/// A ranked document, keyed by its gloss file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Document {
    pub gloss_file: String,
    pub title: String,
    pub collection_file: String,
    pub collection_title: String,
    /// Comma-joined query terms found in the body.
    pub contains_words: String,
    /// Comma-joined query bigrams found in the body.
    pub contains_bigrams: String,
    pub sim_title: f64,
    pub sim_words: f64,
    pub sim_bigram: f64,
    pub sim_bit_vector: f64,
    pub similarity: f64,
    pub contains_terms: Vec<String>,
    pub matching: MatchingText,
}

impl Document {
    pub fn new(gloss_file: &str) -> Self {
        Self { gloss_file: gloss_file.to_string(), ..Self::default() }
    }

    /// Fill title and collection fields from cached metadata.
    pub fn with_meta(mut self, meta: &DocMeta) -> Self {
        self.title = meta.title.clone();
        self.collection_file = meta.collection_file.clone();
        self.collection_title = meta.collection_title.clone();
        self
    }

    /// Fold another partial result for the same document into this one.
    pub fn merge(&mut self, other: Document) {
        self.sim_title += other.sim_title;
        self.sim_words += other.sim_words;
        self.sim_bigram += other.sim_bigram;
        self.sim_bit_vector += other.sim_bit_vector;
        join_list(&mut self.contains_words, &other.contains_words);
        join_list(&mut self.contains_bigrams, &other.contains_bigrams);
        if self.title.is_empty() {
            self.title = other.title;
            self.collection_file = other.collection_file;
            self.collection_title = other.collection_title;
        }
    }
}

fn join_list(acc: &mut String, more: &str) {
    if more.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push(',');
    }
    acc.push_str(more);
}

/// Everything returned for one document query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResults {
    pub query: String,
    pub collection_file: Option<String>,
    pub num_collections: usize,
    pub num_documents: usize,
    pub collections: Vec<Collection>,
    pub documents: Vec<Document>,
    pub terms: Vec<TextSegment>,
}
