use crate::document::Collection;
use crate::index::{DocMeta, FreqPosting, IndexSnapshot, NGram};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub avg_doc_len: f64,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn collections(&self) -> PathBuf { self.root.join("collections.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn postings(&self, kind: NGram) -> PathBuf {
        match kind {
            NGram::Word => self.root.join("words.bin"),
            NGram::Bigram => self.root.join("bigrams.bin"),
        }
    }
    /// Directory holding the plain-text document bodies.
    pub fn texts(&self) -> PathBuf { self.root.join("texts") }
}

fn save_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let value = bincode::deserialize(&buf).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

pub fn save_docs(paths: &IndexPaths, docs: &HashMap<String, DocMeta>) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.docs(), docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<HashMap<String, DocMeta>> {
    load_bin(&paths.docs())
}

pub fn save_collections(paths: &IndexPaths, collections: &Vec<Collection>) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.collections(), collections)
}

pub fn load_collections(paths: &IndexPaths) -> Result<Vec<Collection>> {
    load_bin(&paths.collections())
}

pub fn save_postings(paths: &IndexPaths, kind: NGram, postings: &HashMap<String, Vec<FreqPosting>>) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.postings(kind), postings)
}

pub fn load_postings(paths: &IndexPaths, kind: NGram) -> Result<HashMap<String, Vec<FreqPosting>>> {
    load_bin(&paths.postings(kind))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_index(paths: &IndexPaths, snapshot: &IndexSnapshot) -> Result<()> {
    save_docs(paths, &snapshot.docs)?;
    save_collections(paths, &snapshot.collections)?;
    save_postings(paths, NGram::Word, &snapshot.words)?;
    save_postings(paths, NGram::Bigram, &snapshot.bigrams)?;
    Ok(())
}

/// Load every table of the index. A version mismatch in `meta.json` is an error.
pub fn load_index(paths: &IndexPaths) -> Result<IndexSnapshot> {
    let meta = load_meta(paths)?;
    anyhow::ensure!(meta.version == INDEX_VERSION, "index version {} is not supported (expected {})", meta.version, INDEX_VERSION);
    Ok(IndexSnapshot {
        docs: load_docs(paths)?,
        collections: load_collections(paths)?,
        words: load_postings(paths, NGram::Word)?,
        bigrams: load_postings(paths, NGram::Bigram)?,
    })
}
