use crate::document::Collection;
use crate::index::{in_collection, DocMeta, FreqPosting, IndexSnapshot, NGram, TermFrequencyStore, TitleListing};
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Term-frequency store backed by a sled database.
///
/// Trees: `docs` and `collections` keyed by gloss file, `words` and `bigrams`
/// keyed by term. Values are bincode.
pub struct SledStore {
    db: sled::Db,
    docs: sled::Tree,
    collections: sled::Tree,
    words: sled::Tree,
    bigrams: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            docs: db.open_tree("docs")?,
            collections: db.open_tree("collections")?,
            words: db.open_tree("words")?,
            bigrams: db.open_tree("bigrams")?,
            db,
        })
    }

    /// Replace the database contents with `snapshot`.
    pub fn import(&self, snapshot: &IndexSnapshot) -> Result<()> {
        for tree in [&self.docs, &self.collections, &self.words, &self.bigrams] {
            tree.clear()?;
        }
        for (key, meta) in &snapshot.docs {
            self.docs.insert(key.as_bytes(), bincode::serialize(meta)?)?;
        }
        for col in &snapshot.collections {
            self.collections.insert(col.gloss_file.as_bytes(), bincode::serialize(col)?)?;
        }
        for (term, plist) in &snapshot.words {
            self.words.insert(term.as_bytes(), bincode::serialize(plist)?)?;
        }
        for (bigram, plist) in &snapshot.bigrams {
            self.bigrams.insert(bigram.as_bytes(), bincode::serialize(plist)?)?;
        }
        self.db.flush()?;
        tracing::info!(docs = snapshot.docs.len(), words = snapshot.words.len(), "sled index imported");
        Ok(())
    }

    fn table(&self, kind: NGram) -> &sled::Tree {
        match kind {
            NGram::Word => &self.words,
            NGram::Bigram => &self.bigrams,
        }
    }
}

/// Decode every value of a tree, skipping rows that fail to decode.
fn scan<T: DeserializeOwned>(tree: &sled::Tree, name: &str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for entry in tree.iter() {
        let (key, value) = entry?;
        match bincode::deserialize(&value) {
            Ok(v) => out.push(v),
            Err(err) => tracing::warn!(tree = name, key = %String::from_utf8_lossy(&key), %err, "skipping undecodable row"),
        }
    }
    Ok(out)
}

impl TermFrequencyStore for SledStore {
    fn find_by_title(&self, query: &str, collection: Option<&str>) -> Result<Vec<DocMeta>> {
        let docs: Vec<DocMeta> = scan(&self.docs, "docs")?;
        Ok(docs
            .into_iter()
            .filter(|d| in_collection(&d.collection_file, collection) && d.title.contains(query))
            .collect())
    }

    fn postings(&self, kind: NGram, term: &str, collection: Option<&str>) -> Result<Vec<FreqPosting>> {
        let value = match self.table(kind).get(term.as_bytes())? {
            Some(v) => v,
            None => return Ok(Vec::new()),
        };
        match bincode::deserialize::<Vec<FreqPosting>>(&value) {
            Ok(plist) => Ok(plist.into_iter().filter(|p| in_collection(&p.collection_file, collection)).collect()),
            Err(err) => {
                tracing::warn!(term, %err, "skipping undecodable postings");
                Ok(Vec::new())
            }
        }
    }

    fn titles(&self) -> Result<TitleListing> {
        let docs = scan(&self.docs, "docs")?;
        let collections: Vec<Collection> = scan(&self.collections, "collections")?;
        Ok(TitleListing { docs, collections })
    }
}
