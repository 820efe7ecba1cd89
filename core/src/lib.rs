//! Lexical search over an unsegmented Chinese corpus: dictionary
//! segmentation, BM25 rank fusion, literal match extraction and
//! translation-memory lookup.

pub mod calibration;
pub mod config;
pub mod dictionary;
pub mod document;
pub mod error;
pub mod find;
pub mod index;
pub mod matching;
pub mod persist;
pub mod query;
pub mod ranking;
pub mod reverse;
pub mod sled_store;
pub mod text_store;
pub mod tm;
pub mod tokenizer;

pub use config::SearchConfig;
pub use dictionary::{Dictionary, HeadwordId, Word, WordSense};
pub use document::{Collection, Document, MatchingText, QueryResults};
pub use error::SearchError;
pub use find::{DocumentCache, DocumentFinder};
pub use index::{DocMeta, FreqPosting, IndexSnapshot, MemoryStore, NGram, TermFrequencyStore, TitleListing};
pub use matching::MatchExtractor;
pub use query::{han_runs, QueryParser, TextSegment};
pub use reverse::ReverseIndex;
pub use sled_store::SledStore;
pub use text_store::{FileTextStore, HttpTextStore, TextStore};
pub use tm::{MemoryTmIndex, TmIndex, TranslationMemorySearcher};
pub use tokenizer::{TextToken, Tokenizer};
