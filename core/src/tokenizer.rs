use crate::dictionary::{Dictionary, Word};
use serde::Serialize;
use std::sync::Arc;

/// A segment of a Chinese run and the dictionary entry it matched, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextToken {
    pub token: String,
    pub word: Option<Arc<Word>>,
}

/// Dictionary-driven segmenter for runs of Chinese characters.
///
/// Two greedy longest-match passes are made, one from each end of the text.
/// The backward pass wins only when it yields strictly fewer tokens. Characters
/// missing from the dictionary always become single-character tokens.
#[derive(Clone)]
pub struct Tokenizer {
    dict: Arc<Dictionary>,
}

impl Tokenizer {
    pub fn new(dict: Arc<Dictionary>) -> Self {
        Self { dict }
    }

    pub fn tokenize(&self, text: &str) -> Vec<TextToken> {
        if text.is_empty() {
            return Vec::new();
        }
        let bounds = char_bounds(text);
        let forward = self.greedy_forward(text, &bounds);
        let backward = self.greedy_backward(text, &bounds);
        if backward.len() < forward.len() {
            backward
        } else {
            forward
        }
    }

    fn greedy_forward(&self, text: &str, bounds: &[usize]) -> Vec<TextToken> {
        let n = bounds.len() - 1;
        let window = self.window();
        let mut tokens = Vec::new();
        let mut i = 0;
        while i < n {
            let mut j = (i + window).min(n);
            while j > i + 1 && !self.dict.contains(&text[bounds[i]..bounds[j]]) {
                j -= 1;
            }
            tokens.push(self.token(&text[bounds[i]..bounds[j]]));
            i = j;
        }
        tokens
    }

    fn greedy_backward(&self, text: &str, bounds: &[usize]) -> Vec<TextToken> {
        let window = self.window();
        let mut tokens = Vec::new();
        let mut j = bounds.len() - 1;
        while j > 0 {
            let mut i = j.saturating_sub(window);
            while i < j - 1 && !self.dict.contains(&text[bounds[i]..bounds[j]]) {
                i += 1;
            }
            tokens.push(self.token(&text[bounds[i]..bounds[j]]));
            j = i;
        }
        tokens.reverse();
        tokens
    }

    fn window(&self) -> usize {
        self.dict.max_word_chars().max(1)
    }

    fn token(&self, s: &str) -> TextToken {
        TextToken { token: s.to_string(), word: self.dict.get(s).cloned() }
    }
}

/// Byte offsets of every character start, plus the end of the text.
fn char_bounds(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}
