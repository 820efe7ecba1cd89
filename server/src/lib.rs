use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use zhsearch::persist::IndexPaths;
use zhsearch::{
    Dictionary, DocumentFinder, FileTextStore, HttpTextStore, MatchExtractor, MemoryStore, MemoryTmIndex, QueryParser,
    QueryResults, ReverseIndex, SearchConfig, SearchError, SledStore, TermFrequencyStore, TextSegment, TextStore,
    TranslationMemorySearcher, Word,
};

/// Which term-frequency backend the server reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// Bincode files written by `indexer build`
    #[default]
    Memory,
    /// A sled database exported with `indexer build --sled`
    Sled,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Index directory, or the sled database path for [`Backend::Sled`].
    pub index: String,
    /// Dictionary TSV file.
    pub dict: String,
    /// Root of the plain-text bodies; defaults to `<index>/texts`.
    pub texts: Option<String>,
    /// Base URL of the bodies; takes precedence over `texts`.
    pub text_url: Option<String>,
    pub backend: Backend,
}

#[derive(Deserialize)]
pub struct ParseParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Deserialize)]
pub struct FindParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub fulltext: bool,
    pub collection: Option<String>,
}

#[derive(Deserialize)]
pub struct FindTmParams {
    #[serde(default)]
    pub query: String,
    pub domain: Option<String>,
    #[serde(default = "default_substrings")]
    pub substrings: bool,
}
fn default_substrings() -> bool { true }

#[derive(Clone)]
pub struct AppState {
    pub parser: QueryParser,
    pub finder: Arc<DocumentFinder>,
    pub tm: Arc<TranslationMemorySearcher>,
}

/// Error body returned by every handler.
pub struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            SearchError::EmptyQuery => StatusCode::BAD_REQUEST,
            SearchError::TextUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let dict = Arc::new(Dictionary::load(&config.dict)?);
    let reverse = Arc::new(ReverseIndex::build(dict.clone()));
    let parser = QueryParser::new(dict.clone());

    let store = open_store(config);
    let texts: Arc<dyn TextStore> = match &config.text_url {
        Some(url) => Arc::new(HttpTextStore::new(url)?),
        None => {
            let root: PathBuf = match &config.texts {
                Some(root) => root.into(),
                None => IndexPaths::new(&config.index).texts(),
            };
            Arc::new(FileTextStore::new(root))
        }
    };

    let search_config = SearchConfig::from_env();
    let extractor = MatchExtractor::new(texts, search_config.snippet_len);
    let finder = DocumentFinder::new(parser.clone(), reverse.clone(), store, extractor, search_config);
    let tm = TranslationMemorySearcher::new(dict.clone(), reverse, Arc::new(MemoryTmIndex::build(&dict)));

    Ok(AppState { parser, finder: Arc::new(finder), tm: Arc::new(tm) })
}

/// The configured term-frequency store, or none if it cannot be opened.
fn open_store(config: &AppConfig) -> Option<Arc<dyn TermFrequencyStore>> {
    let opened: Result<Arc<dyn TermFrequencyStore>> = match config.backend {
        Backend::Memory => MemoryStore::load(&IndexPaths::new(&config.index)).map(|s| Arc::new(s) as _),
        Backend::Sled => SledStore::open(&config.index).map(|s| Arc::new(s) as _),
    };
    match opened {
        Ok(store) => Some(store),
        Err(err) => {
            tracing::warn!(index = %config.index, backend = ?config.backend, error = %err, "index unavailable, serving dictionary lookups only");
            None
        }
    }
}

pub fn build_app(config: AppConfig) -> Result<Router> {
    let state = build_state(&config)?;

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/parse", get(parse_handler))
        .route("/find", get(find_handler))
        .route("/findtm", get(findtm_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn parse_handler(
    State(state): State<AppState>,
    Query(params): Query<ParseParams>,
) -> Result<Json<Vec<TextSegment>>, ApiError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(SearchError::EmptyQuery.into());
    }
    Ok(Json(state.parser.parse_query(query)))
}

pub async fn find_handler(
    State(state): State<AppState>,
    Query(params): Query<FindParams>,
) -> Result<Json<QueryResults>, ApiError> {
    let start = std::time::Instant::now();
    let collection = params.collection.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let results = match collection {
        Some(col) => state.finder.find_documents_in_col(&params.query, col, params.fulltext).await?,
        None => state.finder.find_documents(&params.query, params.fulltext).await?,
    };
    tracing::info!(query = %results.query, documents = results.num_documents, took_s = start.elapsed().as_secs_f64(), "find");
    Ok(Json(results))
}

pub async fn findtm_handler(
    State(state): State<AppState>,
    Query(params): Query<FindTmParams>,
) -> Result<Json<Vec<Arc<Word>>>, ApiError> {
    let words = state.tm.search(&params.query, params.domain.as_deref(), params.substrings)?;
    Ok(Json(words))
}
