use crate::dictionary::{Dictionary, Word, WordSense};
use crate::tokenizer::Tokenizer;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

lazy_static! {
    static ref HAN_RUN: Regex = Regex::new(r"\p{Han}+").expect("valid regex");
}

/// Maximal runs of Han characters in `text`.
pub fn han_runs(text: &str) -> impl Iterator<Item = &str> {
    HAN_RUN.find_iter(text).map(|m| m.as_str())
}

/// One piece of a parsed query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSegment {
    pub text: String,
    pub word: Option<Arc<Word>>,
    /// Reverse-lookup senses, filled only when there is no direct dictionary hit.
    pub senses: Vec<WordSense>,
}

impl TextSegment {
    fn plain(text: &str) -> Self {
        Self { text: text.to_string(), word: None, senses: Vec::new() }
    }
}

/// Splits a query into Han and non-Han runs and segments the Han runs.
#[derive(Clone)]
pub struct QueryParser {
    tokenizer: Tokenizer,
}

impl QueryParser {
    pub fn new(dict: Arc<Dictionary>) -> Self {
        Self { tokenizer: Tokenizer::new(dict) }
    }

    /// Segments in input order; every character of the query is covered exactly once.
    pub fn parse_query(&self, query: &str) -> Vec<TextSegment> {
        let mut segments = Vec::new();
        let mut last = 0;
        for run in HAN_RUN.find_iter(query) {
            if run.start() > last {
                segments.push(TextSegment::plain(&query[last..run.start()]));
            }
            segments.extend(self.tokenizer.tokenize(run.as_str()).into_iter().map(|t| TextSegment {
                text: t.token,
                word: t.word,
                senses: Vec::new(),
            }));
            last = run.end();
        }
        if last < query.len() {
            segments.push(TextSegment::plain(&query[last..]));
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(forms: &[&str]) -> QueryParser {
        let words = forms.iter().enumerate().map(|(i, f)| Word::new(i as u32 + 1, f, None, "", ""));
        QueryParser::new(Arc::new(Dictionary::from_words(words)))
    }

    fn texts(segments: &[TextSegment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn splits_unknown_characters() {
        let segments = parser(&["你好"]).parse_query("你好小王");
        assert_eq!(texts(&segments), vec!["你好", "小", "王"]);
        assert!(segments[0].word.is_some());
        assert!(segments[1].word.is_none());
    }

    #[test]
    fn non_han_runs_pass_through() {
        let segments = parser(&["你好"]).parse_query("say 你好, 2 times！");
        assert_eq!(texts(&segments), vec!["say ", "你好", ", 2 times！"]);
        assert_eq!(segments.iter().map(|s| s.text.as_str()).collect::<String>(), "say 你好, 2 times！");
    }

    #[test]
    fn punctuation_breaks_han_runs() {
        let segments = parser(&["學而"]).parse_query("學而。時習");
        assert_eq!(texts(&segments), vec!["學而", "。", "時", "習"]);
    }

    #[test]
    fn han_runs_skip_everything_else() {
        let runs: Vec<&str> = han_runs("子曰：學而時習之，不亦說乎? ok").collect();
        assert_eq!(runs, vec!["子曰", "學而時習之", "不亦說乎"]);
    }

    #[test]
    fn empty_query_has_no_segments() {
        assert!(parser(&[]).parse_query("").is_empty());
    }
}
