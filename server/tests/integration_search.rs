use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use server::{build_app, AppConfig, Backend};
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use tower::ServiceExt;
use url::form_urlencoded;
use zhsearch::persist::{save_index, save_meta, IndexPaths, MetaFile, INDEX_VERSION};
use zhsearch::text_store::text_path;
use zhsearch::{Collection, DocMeta, FreqPosting, IndexSnapshot};

fn sense(id: u32, simp: &str, trad: &str, pinyin: &str, english: &str, domain: &str) -> String {
    let cols = [
        id.to_string(),
        simp.into(),
        trad.into(),
        pinyin.into(),
        english.into(),
        "\\N".into(),
        "\\N".into(),
        "\\N".into(),
        "\\N".into(),
        domain.into(),
        "\\N".into(),
        "\\N".into(),
        "\\N".into(),
        "\\N".into(),
        "\\N".into(),
        id.to_string(),
    ];
    cols.join("\t")
}

fn write_dictionary(path: &Path) {
    let lines = [
        "# id\tsimplified\ttraditional\t...".to_string(),
        sense(1, "学而", "學而", "xué ér", "Xue Er chapter", "Literature"),
        sense(2, "时习", "時習", "shí xí", "to review regularly", "\\N"),
        sense(3, "你好", "\\N", "nǐ hǎo", "hello", "\\N"),
        sense(4, "结实", "結實", "jiēshi", "sturdy", "Botany"),
        sense(5, "开花结实", "開花結實", "kāihuā jiēshí", "to blossom and bear fruit", "Botany"),
    ];
    fs::write(path, lines.join("\n")).unwrap();
}

fn posting(doc: &str, freq: u32) -> FreqPosting {
    FreqPosting { gloss_file: doc.into(), collection_file: "lunyu.html".into(), freq, idf: 1.1, doc_len: 100 }
}

fn build_tiny_index(dir: &Path) {
    let paths = IndexPaths::new(dir);
    let mut snapshot = IndexSnapshot::default();
    for (doc, title) in [("lunyu/a.html", "學而第一"), ("lunyu/b.html", "為政第二")] {
        let meta = DocMeta {
            gloss_file: doc.into(),
            title: title.into(),
            collection_file: "lunyu.html".into(),
            collection_title: "論語".into(),
        };
        snapshot.docs.insert(doc.into(), meta);
    }
    snapshot.collections.push(Collection { gloss_file: "lunyu.html".into(), title: "論語".into() });
    snapshot.words.insert("學而".into(), vec![posting("lunyu/a.html", 2), posting("lunyu/b.html", 1)]);
    snapshot.words.insert("時習".into(), vec![posting("lunyu/a.html", 2)]);
    snapshot.bigrams.insert("學而時習".into(), vec![posting("lunyu/a.html", 1)]);
    save_index(&paths, &snapshot).unwrap();
    save_meta(&paths, &MetaFile { num_docs: 2, avg_doc_len: 100.0, created_at: "2024-01-01T00:00:00Z".into(), version: INDEX_VERSION }).unwrap();

    for (doc, body) in [("lunyu/a.html", "子曰學而時習之不亦說乎"), ("lunyu/b.html", "學而不思則罔")] {
        let path = text_path(&paths.texts(), doc).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }
}

fn app_for(dir: &Path, index: &Path) -> Router {
    let dict = dir.join("words.txt");
    write_dictionary(&dict);
    build_app(AppConfig {
        index: index.to_string_lossy().to_string(),
        dict: dict.to_string_lossy().to_string(),
        texts: None,
        text_url: None,
        backend: Backend::Memory,
    })
    .unwrap()
}

fn tiny_app(dir: &Path) -> Router {
    let index = dir.join("index");
    build_tiny_index(&index);
    app_for(dir, &index)
}

fn enc(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let dir = tempdir().unwrap();
    let (status, body) = call(tiny_app(dir.path()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn find_returns_ranked_documents_with_matches() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path());

    let (status, body) = call(app, &format!("/find?query={}&fulltext=true", enc("學而時習"))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let docs = json["documents"].as_array().unwrap();
    assert!(!docs.is_empty());
    assert_eq!(docs[0]["gloss_file"], "lunyu/a.html");
    assert_eq!(docs[0]["matching"]["exact_match"], true);
    assert_eq!(docs[0]["matching"]["longest_match"], "學而時習");
    assert_eq!(json["terms"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn find_in_collection_skips_collection_listing() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path());

    let (status, body) = call(app, &format!("/find?query={}&collection=lunyu.html", enc("論語"))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["collection_file"], "lunyu.html");
    assert_eq!(json["num_collections"], 0);
}

#[tokio::test]
async fn empty_query_is_a_bad_request() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path());

    for uri in ["/find?query=%20", "/findtm?query=", "/parse"] {
        let (status, body) = call(app.clone(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "query string is empty");
    }
}

#[tokio::test]
async fn parse_segments_query() {
    let dir = tempdir().unwrap();
    let (status, body) = call(tiny_app(dir.path()), &format!("/parse?query={}", enc("你好小王"))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let texts: Vec<&str> = json.as_array().unwrap().iter().map(|s| s["text"].as_str().unwrap()).collect();
    assert_eq!(texts, vec!["你好", "小", "王"]);
    assert_eq!(json[0]["word"]["simplified"], "你好");
    assert!(json[1]["word"].is_null());
}

#[tokio::test]
async fn findtm_returns_similar_phrases() {
    let dir = tempdir().unwrap();
    let app = tiny_app(dir.path());

    let (status, body) = call(app.clone(), &format!("/findtm?query={}", enc("結實"))).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let found: Vec<&str> = json.as_array().unwrap().iter().map(|w| w["simplified"].as_str().unwrap()).collect();
    assert_eq!(found, vec!["结实", "开花结实"]);

    let (_, body) = call(app, &format!("/findtm?query={}&domain=Literature", enc("結實"))).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_index_serves_terms_only() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path(), &dir.path().join("no-such-index"));

    let (status, body) = call(app, "/find?query=hello").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["documents"].as_array().unwrap().is_empty());
    assert_eq!(json["terms"][0]["senses"][0]["simplified"], "你好");
}
