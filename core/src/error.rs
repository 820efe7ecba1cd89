use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported to callers of the search entry points.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The query was empty or only whitespace.
    #[error("query string is empty")]
    EmptyQuery,

    /// The body of a document could not be fetched.
    #[error("text of document {key:?} unavailable: {source}")]
    TextUnavailable { key: String, source: BoxError },
}
