use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use zhsearch::{
    Collection, Dictionary, DocMeta, DocumentFinder, FreqPosting, IndexSnapshot, MatchExtractor, MemoryStore, NGram,
    QueryParser, ReverseIndex, SearchConfig, SearchError, TermFrequencyStore, TextStore, TitleListing, Word,
};

struct MapStore(HashMap<String, String>);

#[async_trait]
impl TextStore for MapStore {
    async fn fetch(&self, gloss_file: &str) -> Result<String> {
        self.0.get(gloss_file).cloned().ok_or_else(|| anyhow!("no body for {gloss_file}"))
    }
}

/// A store whose every lookup fails.
struct BrokenStore;

impl TermFrequencyStore for BrokenStore {
    fn find_by_title(&self, _: &str, _: Option<&str>) -> Result<Vec<DocMeta>> {
        Err(anyhow!("connection refused"))
    }
    fn postings(&self, _: NGram, _: &str, _: Option<&str>) -> Result<Vec<FreqPosting>> {
        Err(anyhow!("connection refused"))
    }
    fn titles(&self) -> Result<TitleListing> {
        Err(anyhow!("connection refused"))
    }
}

fn dictionary() -> Arc<Dictionary> {
    Arc::new(Dictionary::from_words(vec![
        Word::new(1, "学而", Some("學而"), "xué ér", "Xue Er chapter"),
        Word::new(2, "时习", Some("時習"), "shí xí", "to review regularly"),
        Word::new(3, "你好", None, "nǐ hǎo", "hello"),
        Word::new(4, "梁惠王", None, "Liáng Huì Wáng", "King Hui of Liang"),
    ]))
}

fn meta(doc: &str, title: &str, col: &str, col_title: &str) -> DocMeta {
    DocMeta { gloss_file: doc.into(), title: title.into(), collection_file: col.into(), collection_title: col_title.into() }
}

fn posting(doc: &str, col: &str, freq: u32) -> FreqPosting {
    FreqPosting { gloss_file: doc.into(), collection_file: col.into(), freq, idf: 1.1, doc_len: 100 }
}

fn snapshot() -> IndexSnapshot {
    let mut s = IndexSnapshot::default();
    for m in [
        meta("lunyu/a.html", "學而第一", "lunyu.html", "論語"),
        meta("lunyu/b.html", "為政第二", "lunyu.html", "論語"),
        meta("mengzi/c.html", "梁惠王", "mengzi.html", "孟子"),
        meta("misc/t.html", "學而時習篇", "misc.html", "雜錄"),
    ] {
        s.docs.insert(m.gloss_file.clone(), m);
    }
    s.collections = vec![
        Collection { gloss_file: "lunyu.html".into(), title: "論語".into() },
        Collection { gloss_file: "mengzi.html".into(), title: "孟子".into() },
    ];
    s.words.insert("學而".into(), vec![posting("lunyu/a.html", "lunyu.html", 2), posting("lunyu/b.html", "lunyu.html", 1)]);
    s.words.insert("時習".into(), vec![posting("lunyu/a.html", "lunyu.html", 2), posting("mengzi/c.html", "mengzi.html", 1)]);
    s.bigrams.insert("學而時習".into(), vec![posting("lunyu/a.html", "lunyu.html", 1)]);
    s
}

fn bodies() -> MapStore {
    MapStore(
        [
            ("lunyu/a.html", "子曰學而時習之不亦說乎"),
            ("lunyu/b.html", "學而不思則罔"),
            ("mengzi/c.html", "時習之"),
            ("misc/t.html", "無關"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
    )
}

fn finder(store: Option<Arc<dyn TermFrequencyStore>>) -> DocumentFinder {
    let dict = dictionary();
    let reverse = Arc::new(ReverseIndex::build(dict.clone()));
    let extractor = MatchExtractor::new(Arc::new(bodies()), 200);
    DocumentFinder::new(QueryParser::new(dict), reverse, store, extractor, SearchConfig::default())
}

fn memory_finder() -> DocumentFinder {
    finder(Some(Arc::new(MemoryStore::new(snapshot()))))
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let err = memory_finder().find_documents("  ", true).await.unwrap_err();
    assert!(matches!(err, SearchError::EmptyQuery));
}

#[tokio::test]
async fn full_text_query_ranks_by_longest_match() {
    let results = memory_finder().find_documents("學而時習", true).await.unwrap();
    let keys: Vec<&str> = results.documents.iter().map(|d| d.gloss_file.as_str()).collect();
    assert_eq!(keys.len(), 4);
    assert_eq!(keys[0], "lunyu/a.html");
    assert_eq!(keys[3], "misc/t.html");

    let top = &results.documents[0];
    assert!(top.matching.exact_match);
    assert_eq!(top.matching.longest_match, "學而時習");
    assert_eq!(top.contains_terms, vec!["學而時習"]);
    assert_eq!(top.title, "學而第一");
    assert_eq!(top.sim_bit_vector, 2.0);

    let title_only = &results.documents[3];
    assert_eq!(title_only.sim_title, 0.5);
    assert!(title_only.matching.longest_match.is_empty());
    assert_eq!(results.num_documents, 4);
    assert_eq!(results.terms.len(), 2);
}

#[tokio::test]
async fn documents_never_fall_below_floor() {
    let results = memory_finder().find_documents("學而時習", true).await.unwrap();
    assert!(results.documents.iter().all(|d| d.similarity >= zhsearch::calibration::MIN_SIMILARITY));
}

#[tokio::test]
async fn collection_scope_filters_documents() {
    let results = memory_finder().find_documents_in_col("學而時習", "lunyu.html", true).await.unwrap();
    let keys: Vec<&str> = results.documents.iter().map(|d| d.gloss_file.as_str()).collect();
    assert_eq!(keys, vec!["lunyu/a.html", "lunyu/b.html"]);
    assert!(results.collections.is_empty());
    assert_eq!(results.collection_file.as_deref(), Some("lunyu.html"));
}

#[tokio::test]
async fn global_search_lists_matching_collections() {
    let results = memory_finder().find_documents("論語", false).await.unwrap();
    assert_eq!(results.num_collections, 1);
    assert_eq!(results.collections[0].gloss_file, "lunyu.html");
}

#[tokio::test]
async fn title_search_alone_without_full_text() {
    let results = memory_finder().find_documents("梁惠王", false).await.unwrap();
    assert_eq!(results.documents.len(), 1);
    let doc = &results.documents[0];
    assert_eq!(doc.gloss_file, "mengzi/c.html");
    assert_eq!(doc.sim_title, 1.0);
    assert_eq!(doc.sim_words, 0.0);
    assert!(doc.matching.snippet.is_empty());
}

#[tokio::test]
async fn missing_store_returns_annotated_terms() {
    let results = finder(None).find_documents("hello", true).await.unwrap();
    assert!(results.documents.is_empty());
    assert_eq!(results.terms.len(), 1);
    assert_eq!(results.terms[0].senses[0].simplified, "你好");
}

#[tokio::test]
async fn failing_store_degrades_to_no_documents() {
    let results = finder(Some(Arc::new(BrokenStore))).find_documents("學而時習", true).await.unwrap();
    assert!(results.documents.is_empty());
    assert_eq!(results.terms.len(), 2);
}
