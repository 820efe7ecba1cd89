use crate::document::Collection;
use crate::persist::{load_index, IndexPaths};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocMeta {
    pub gloss_file: String,
    pub title: String,
    pub collection_file: String,
    pub collection_title: String,
}

/// Frequency of one term or bigram in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreqPosting {
    pub gloss_file: String,
    pub collection_file: String,
    pub freq: u32,
    pub idf: f64,
    /// Document length in tokens.
    pub doc_len: u32,
}

impl FreqPosting {
    /// Rows that would poison a BM25 sum.
    pub fn is_malformed(&self) -> bool {
        self.doc_len == 0 || !self.idf.is_finite()
    }
}

/// Which postings table a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NGram {
    Word,
    Bigram,
}

/// Document and collection titles, used to warm the metadata cache.
#[derive(Debug, Clone, Default)]
pub struct TitleListing {
    pub docs: Vec<DocMeta>,
    pub collections: Vec<Collection>,
}

/// Title and term-frequency lookups, implemented by each storage backend.
pub trait TermFrequencyStore: Send + Sync {
    /// Documents whose title contains `query`.
    fn find_by_title(&self, query: &str, collection: Option<&str>) -> Result<Vec<DocMeta>>;

    /// Postings of one term or bigram.
    fn postings(&self, kind: NGram, term: &str, collection: Option<&str>) -> Result<Vec<FreqPosting>>;

    fn titles(&self) -> Result<TitleListing>;
}

/// Complete contents of an index as written by the indexer.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    pub docs: HashMap<String, DocMeta>,
    pub collections: Vec<Collection>,
    pub words: HashMap<String, Vec<FreqPosting>>,
    pub bigrams: HashMap<String, Vec<FreqPosting>>,
}

/// Term-frequency store held entirely in memory.
pub struct MemoryStore {
    snapshot: IndexSnapshot,
}

impl MemoryStore {
    pub fn new(snapshot: IndexSnapshot) -> Self {
        Self { snapshot }
    }

    /// Load the file index written by the indexer.
    pub fn load(paths: &IndexPaths) -> Result<Self> {
        let snapshot = load_index(paths)?;
        tracing::info!(docs = snapshot.docs.len(), words = snapshot.words.len(), bigrams = snapshot.bigrams.len(), "index loaded");
        Ok(Self::new(snapshot))
    }
}

impl TermFrequencyStore for MemoryStore {
    fn find_by_title(&self, query: &str, collection: Option<&str>) -> Result<Vec<DocMeta>> {
        let mut found: Vec<DocMeta> = self
            .snapshot
            .docs
            .values()
            .filter(|d| in_collection(&d.collection_file, collection) && d.title.contains(query))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.gloss_file.cmp(&b.gloss_file));
        Ok(found)
    }

    fn postings(&self, kind: NGram, term: &str, collection: Option<&str>) -> Result<Vec<FreqPosting>> {
        let table = match kind {
            NGram::Word => &self.snapshot.words,
            NGram::Bigram => &self.snapshot.bigrams,
        };
        Ok(table
            .get(term)
            .map(|plist| plist.iter().filter(|p| in_collection(&p.collection_file, collection)).cloned().collect())
            .unwrap_or_default())
    }

    fn titles(&self) -> Result<TitleListing> {
        Ok(TitleListing {
            docs: self.snapshot.docs.values().cloned().collect(),
            collections: self.snapshot.collections.clone(),
        })
    }
}

pub(crate) fn in_collection(collection_file: &str, scope: Option<&str>) -> bool {
    scope.map_or(true, |c| c == collection_file)
}
