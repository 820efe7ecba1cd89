use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;
use zhsearch::persist::{save_index, save_meta, IndexPaths, MetaFile, INDEX_VERSION};
use zhsearch::text_store::text_path;
use zhsearch::{han_runs, Collection, Dictionary, DocMeta, FreqPosting, IndexSnapshot, SledStore, Tokenizer};

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct InputDoc {
    gloss_file: String,
    title: String,
    #[serde(default)]
    collection_file: String,
    #[serde(default)]
    collection_title: String,
    body: String,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the word and bigram frequency index for a Chinese corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Dictionary file used for segmentation
        #[arg(long)]
        dict: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Also export the index into a sled database at this path
        #[arg(long)]
        sled: Option<String>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, dict, output, sled } => {
            let dict = Arc::new(Dictionary::load(&dict)?);
            build_index(Path::new(&input), Tokenizer::new(dict), &output, sled.as_deref())
        }
    }
}

/// Raw counts gathered while reading documents.
#[derive(Default)]
struct Accumulator {
    docs: Vec<DocMeta>,
    doc_lens: Vec<u32>,
    words: HashMap<String, Vec<(usize, u32)>>,
    bigrams: HashMap<String, Vec<(usize, u32)>>,
}

fn build_index(input: &Path, tokenizer: Tokenizer, output: &str, sled_path: Option<&str>) -> Result<()> {
    let out_paths = IndexPaths::new(output);
    fs::create_dir_all(out_paths.texts())?;

    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }

    let mut acc = Accumulator::default();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&file, &tokenizer, &mut acc, &out_paths)?;
        } else {
            index_json(&file, &tokenizer, &mut acc, &out_paths)?;
        }
    }

    let snapshot = finish(acc);
    let num_docs = snapshot.docs.len() as u32;
    let total: u64 = snapshot.words.values().flatten().map(|p| p.freq as u64).sum();
    let avg_doc_len = if num_docs > 0 { total as f64 / num_docs as f64 } else { 0.0 };
    tracing::info!(num_docs, words = snapshot.words.len(), bigrams = snapshot.bigrams.len(), avg_doc_len, "ingested documents");

    save_index(&out_paths, &snapshot)?;
    let meta = MetaFile {
        num_docs,
        avg_doc_len,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: INDEX_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    if let Some(path) = sled_path {
        SledStore::open(path)?.import(&snapshot)?;
    }
    tracing::info!(output, "index build complete; set AVG_DOC_LEN={avg_doc_len:.0} to rank against this corpus");
    Ok(())
}

fn index_jsonl(file: &Path, tokenizer: &Tokenizer, acc: &mut Accumulator, out_paths: &IndexPaths) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        match serde_json::from_str::<InputDoc>(&line) {
            Ok(doc) => ingest_doc(doc, tokenizer, acc, out_paths)?,
            Err(err) => tracing::warn!(file = %file.display(), line = lineno + 1, %err, "skipping malformed document"),
        }
    }
    Ok(())
}

fn index_json(file: &Path, tokenizer: &Tokenizer, acc: &mut Accumulator, out_paths: &IndexPaths) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let values = match json {
        serde_json::Value::Array(arr) => arr,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => Vec::new(),
    };
    for v in values {
        match serde_json::from_value::<InputDoc>(v) {
            Ok(doc) => ingest_doc(doc, tokenizer, acc, out_paths)?,
            Err(err) => tracing::warn!(file = %file.display(), %err, "skipping malformed document"),
        }
    }
    Ok(())
}

fn ingest_doc(doc: InputDoc, tokenizer: &Tokenizer, acc: &mut Accumulator, out_paths: &IndexPaths) -> Result<()> {
    let Some(text_abs) = text_path(&out_paths.texts(), &doc.gloss_file) else {
        tracing::warn!(gloss_file = %doc.gloss_file, "skipping document whose key leaves the text directory");
        return Ok(());
    };
    let idx = acc.docs.len();
    let (word_counts, bigram_counts, doc_len) = count_terms(&doc.body, tokenizer);
    for (term, freq) in word_counts {
        acc.words.entry(term).or_default().push((idx, freq));
    }
    for (bigram, freq) in bigram_counts {
        acc.bigrams.entry(bigram).or_default().push((idx, freq));
    }
    acc.doc_lens.push(doc_len);

    // Write text for match extraction
    if let Some(parent) = text_abs.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&text_abs, &doc.body)?;

    acc.docs.push(DocMeta {
        gloss_file: doc.gloss_file,
        title: doc.title,
        collection_file: doc.collection_file,
        collection_title: doc.collection_title,
    });
    Ok(())
}

/// Token and adjacent-token bigram frequencies of a body, plus its token count.
fn count_terms(body: &str, tokenizer: &Tokenizer) -> (BTreeMap<String, u32>, BTreeMap<String, u32>, u32) {
    let mut words: BTreeMap<String, u32> = BTreeMap::new();
    let mut bigrams: BTreeMap<String, u32> = BTreeMap::new();
    let mut len = 0u32;
    for run in han_runs(body) {
        let tokens = tokenizer.tokenize(run);
        for pair in tokens.windows(2) {
            *bigrams.entry(format!("{}{}", pair[0].token, pair[1].token)).or_insert(0) += 1;
        }
        for t in tokens {
            *words.entry(t.token).or_insert(0) += 1;
            len += 1;
        }
    }
    (words, bigrams, len)
}

/// Turn raw counts into postings with idf and document lengths.
fn finish(acc: Accumulator) -> IndexSnapshot {
    let n = acc.docs.len() as f64;
    let to_postings = |table: HashMap<String, Vec<(usize, u32)>>| -> HashMap<String, Vec<FreqPosting>> {
        table
            .into_iter()
            .map(|(term, plist)| {
                let df = plist.len() as f64;
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                let postings = plist
                    .into_iter()
                    .map(|(idx, freq)| FreqPosting {
                        gloss_file: acc.docs[idx].gloss_file.clone(),
                        collection_file: acc.docs[idx].collection_file.clone(),
                        freq,
                        idf,
                        doc_len: acc.doc_lens[idx],
                    })
                    .collect();
                (term, postings)
            })
            .collect()
    };
    let words = to_postings(acc.words);
    let bigrams = to_postings(acc.bigrams);

    let mut collections: BTreeMap<String, String> = BTreeMap::new();
    for d in &acc.docs {
        if !d.collection_file.is_empty() {
            collections.entry(d.collection_file.clone()).or_insert_with(|| d.collection_title.clone());
        }
    }
    IndexSnapshot {
        docs: acc.docs.iter().map(|d| (d.gloss_file.clone(), d.clone())).collect(),
        collections: collections.into_iter().map(|(gloss_file, title)| Collection { gloss_file, title }).collect(),
        words,
        bigrams,
    }
}
