//! Empirically tuned constants for ranking and translation-memory matching.
//!
//! The values are fitted against judged result sets; keep them exact so that
//! rankings stay comparable between releases.

/// BM25 term-frequency saturation.
pub const BM25_K: f64 = 1.5;
/// BM25 document-length normalization.
pub const BM25_B: f64 = 0.65;
/// Average document length in tokens, used when `AVG_DOC_LEN` is not set.
pub const DEFAULT_AVG_DOC_LEN: f64 = 4497.0;

/// Weights for word BM25, bigram BM25 and the bit-vector signal.
pub const WEIGHTS: [f64; 3] = [0.080, 2.327, 3.040];
pub const INTERCEPT: f64 = -4.75;
/// Similarity given when a signal cannot be normalized; also the relevance floor.
pub const MIN_SIMILARITY: f64 = -4.75;

/// Title similarity for an exact title or collection-title match.
pub const TITLE_EXACT: f64 = 1.0;
/// Title similarity for a title that contains the query.
pub const TITLE_PARTIAL: f64 = 0.5;

pub const MAX_DOCS_RETURNED: usize = 50;
/// Upper bound on terms (or bigrams) sent to a term-frequency store.
pub const MAX_QUERY_TERMS: usize = 6;
pub const DEFAULT_SNIPPET_LEN: usize = 200;

/// Number of query characters used for the shared-character search.
pub const TM_QUERY_CHARS: usize = 8;
pub const TM_MIN_UNIGRAM_RATIO: f64 = 0.37;
pub const TM_MAX_HAMMING_RATIO: f64 = 0.59;
pub const TM_STRICT_MIN_UNIGRAM: usize = 3;
pub const TM_STRICT_MAX_HAMMING: usize = 8;
pub const TM_MAX_RESULTS_SUBSTRINGS: usize = 10;
pub const TM_MAX_RESULTS: usize = 3;
