use crate::calibration::MAX_QUERY_TERMS;
use crate::config::SearchConfig;
use crate::document::{Collection, QueryResults};
use crate::error::SearchError;
use crate::index::{DocMeta, NGram, TermFrequencyStore};
use crate::matching::MatchExtractor;
use crate::query::{QueryParser, TextSegment};
use crate::ranking::{bm25_documents, contains_terms, merge_partials, rank, sort_by_match, title_documents};
use crate::reverse::ReverseIndex;
use std::collections::HashMap;
use std::sync::Arc;

/// Document and collection titles cached at startup.
#[derive(Debug, Default)]
pub struct DocumentCache {
    docs: HashMap<String, DocMeta>,
    collections: Vec<Collection>,
}

impl DocumentCache {
    /// Warm the cache from a store; a failing store leaves it empty.
    pub fn warm(store: &dyn TermFrequencyStore) -> Self {
        match store.titles() {
            Ok(listing) => {
                tracing::info!(docs = listing.docs.len(), collections = listing.collections.len(), "document cache warmed");
                Self {
                    docs: listing.docs.into_iter().map(|d| (d.gloss_file.clone(), d)).collect(),
                    collections: listing.collections,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not list document titles, cache left empty");
                Self::default()
            }
        }
    }

    pub fn doc(&self, gloss_file: &str) -> Option<&DocMeta> {
        self.docs.get(gloss_file)
    }

    /// Collections whose title contains `query`, in title order.
    pub fn collections_matching(&self, query: &str) -> Vec<Collection> {
        let mut found: Vec<Collection> = self.collections.iter().filter(|c| c.title.contains(query)).cloned().collect();
        found.sort_by(|a, b| a.title.cmp(&b.title));
        found
    }
}

/// Runs document queries: title lookup, word and bigram BM25, rank fusion and match extraction.
pub struct DocumentFinder {
    parser: QueryParser,
    reverse: Arc<ReverseIndex>,
    store: Option<Arc<dyn TermFrequencyStore>>,
    cache: Arc<DocumentCache>,
    extractor: MatchExtractor,
    config: SearchConfig,
}

impl DocumentFinder {
    /// Without a store, queries return annotated terms and no documents.
    pub fn new(
        parser: QueryParser,
        reverse: Arc<ReverseIndex>,
        store: Option<Arc<dyn TermFrequencyStore>>,
        extractor: MatchExtractor,
        config: SearchConfig,
    ) -> Self {
        let cache = match &store {
            Some(store) => DocumentCache::warm(store.as_ref()),
            None => DocumentCache::default(),
        };
        Self { parser, reverse, store, cache: Arc::new(cache), extractor, config }
    }

    pub async fn find_documents(&self, query: &str, full_text: bool) -> Result<QueryResults, SearchError> {
        self.find(query, None, full_text).await
    }

    /// Like [`find_documents`](Self::find_documents), scoped to one collection.
    pub async fn find_documents_in_col(&self, query: &str, collection: &str, full_text: bool) -> Result<QueryResults, SearchError> {
        self.find(query, Some(collection), full_text).await
    }

    async fn find(&self, query: &str, collection: Option<&str>, full_text: bool) -> Result<QueryResults, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let terms = self.annotated_terms(query);
        let mut results = QueryResults {
            query: query.to_string(),
            collection_file: collection.map(str::to_string),
            ..QueryResults::default()
        };
        if collection.is_none() {
            results.collections = self.cache.collections_matching(query);
            results.num_collections = results.collections.len();
        }

        let Some(store) = &self.store else {
            tracing::debug!(query, "no term frequency store, returning dictionary terms only");
            results.terms = terms;
            return Ok(results);
        };

        let query_terms: Vec<String> =
            terms.iter().map(|s| s.text.trim()).filter(|t| !t.is_empty()).map(str::to_string).collect();
        let search_body = full_text || query_terms.len() > 1;

        let mut partials = Vec::with_capacity(3);
        match store.find_by_title(query, collection) {
            Ok(found) => partials.push(title_documents(query, found)),
            Err(err) => tracing::warn!(query, error = %err, "title search failed"),
        }
        if search_body {
            let words = capped(query_terms.clone(), "terms");
            partials.push(bm25_documents(store.as_ref(), NGram::Word, &words, collection, self.config.avg_doc_len));
            if query_terms.len() > 1 {
                let bigrams = capped(query_terms.windows(2).map(|w| format!("{}{}", w[0], w[1])).collect(), "bigrams");
                partials.push(bm25_documents(store.as_ref(), NGram::Bigram, &bigrams, collection, self.config.avg_doc_len));
            }
        }

        let merged = merge_partials(partials, |key| self.cache.doc(key).cloned());
        let mut docs = rank(merged, self.config.max_documents);

        if search_body && !docs.is_empty() {
            let keys: Vec<String> = docs.iter().map(|d| d.gloss_file.clone()).collect();
            let mut matches = self.extractor.get_matches(&keys, &query_terms).await;
            for doc in docs.iter_mut() {
                doc.contains_terms = contains_terms(doc, &query_terms);
                doc.matching = matches.remove(&doc.gloss_file).unwrap_or_default();
            }
            sort_by_match(&mut docs);
        }

        tracing::debug!(query, documents = docs.len(), collections = results.num_collections, "documents found");
        results.num_documents = docs.len();
        results.documents = docs;
        results.terms = terms;
        Ok(results)
    }

    /// Parse the query; a lone segment without a dictionary word gets reverse-lookup senses.
    fn annotated_terms(&self, query: &str) -> Vec<TextSegment> {
        let mut terms = self.parser.parse_query(query);
        if let [only] = terms.as_mut_slice() {
            if only.word.is_none() {
                only.senses = self.reverse.lookup(&only.text);
            }
        }
        terms
    }
}

fn capped(mut list: Vec<String>, what: &str) -> Vec<String> {
    if list.len() > MAX_QUERY_TERMS {
        tracing::debug!(what, count = list.len(), max = MAX_QUERY_TERMS, "truncating query");
        list.truncate(MAX_QUERY_TERMS);
    }
    list
}
