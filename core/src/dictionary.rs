use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

pub type HeadwordId = u32;

/// Marker for an empty column in the dictionary file.
const NULL_FIELD: &str = "\\N";
const NUM_COLUMNS: usize = 16;

/// One meaning of a headword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSense {
    pub id: u32,
    pub headword_id: HeadwordId,
    pub simplified: String,
    pub traditional: Option<String>,
    pub pinyin: String,
    pub english: String,
    pub grammar: String,
    pub domain: String,
    pub notes: String,
}

/// A headword with all of its senses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub headword_id: HeadwordId,
    pub simplified: String,
    pub traditional: Option<String>,
    pub pinyin: String,
    pub senses: Vec<WordSense>,
}

impl Word {
    /// A word with a single sense and no grammar, domain or notes.
    pub fn new(headword_id: HeadwordId, simplified: &str, traditional: Option<&str>, pinyin: &str, english: &str) -> Self {
        let sense = WordSense {
            id: headword_id,
            headword_id,
            simplified: simplified.to_string(),
            traditional: traditional.map(str::to_string),
            pinyin: pinyin.to_string(),
            english: english.to_string(),
            grammar: String::new(),
            domain: String::new(),
            notes: String::new(),
        };
        Self {
            headword_id,
            simplified: sense.simplified.clone(),
            traditional: sense.traditional.clone(),
            pinyin: sense.pinyin.clone(),
            senses: vec![sense],
        }
    }

    /// Simplified form followed by the traditional form, if it differs.
    pub fn forms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.simplified.as_str()).chain(self.traditional.as_deref())
    }
}

/// Read-only snapshot of the dictionary, shared by every query.
#[derive(Debug, Default)]
pub struct Dictionary {
    by_form: HashMap<String, Arc<Word>>,
    by_headword: BTreeMap<HeadwordId, Arc<Word>>,
    max_word_chars: usize,
}

impl Dictionary {
    pub fn from_words<I: IntoIterator<Item = Word>>(words: I) -> Self {
        let mut dict = Self::default();
        for word in words {
            let word = Arc::new(word);
            for form in word.forms() {
                dict.max_word_chars = dict.max_word_chars.max(form.chars().count());
                dict.by_form.insert(form.to_string(), Arc::clone(&word));
            }
            dict.by_headword.insert(word.headword_id, word);
        }
        dict
    }

    /// Load the tab-separated dictionary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("opening dictionary {}", path.display()))?;
        let dict = Self::parse(BufReader::new(f))?;
        tracing::info!(path = %path.display(), headwords = dict.len(), "dictionary loaded");
        Ok(dict)
    }

    /// Parse dictionary lines; malformed lines are logged and skipped.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut words: BTreeMap<HeadwordId, Word> = BTreeMap::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let sense = match parse_sense(&line) {
                Some(sense) => sense,
                None => {
                    tracing::warn!(line = lineno + 1, "skipping malformed dictionary line");
                    continue;
                }
            };
            words
                .entry(sense.headword_id)
                .or_insert_with(|| Word {
                    headword_id: sense.headword_id,
                    simplified: sense.simplified.clone(),
                    traditional: sense.traditional.clone(),
                    pinyin: sense.pinyin.clone(),
                    senses: Vec::new(),
                })
                .senses
                .push(sense);
        }
        Ok(Self::from_words(words.into_values()))
    }

    pub fn get(&self, form: &str) -> Option<&Arc<Word>> {
        self.by_form.get(form)
    }

    pub fn contains(&self, form: &str) -> bool {
        self.by_form.contains_key(form)
    }

    pub fn by_headword(&self, id: HeadwordId) -> Option<&Arc<Word>> {
        self.by_headword.get(&id)
    }

    /// Headwords in id order.
    pub fn words(&self) -> impl Iterator<Item = &Arc<Word>> {
        self.by_headword.values()
    }

    /// Length in characters of the longest form; bounds the segmenter's window.
    pub fn max_word_chars(&self) -> usize {
        self.max_word_chars
    }

    pub fn len(&self) -> usize {
        self.by_headword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_headword.is_empty()
    }
}

fn parse_sense(line: &str) -> Option<WordSense> {
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < NUM_COLUMNS {
        return None;
    }
    let field = |i: usize| {
        let v = cols[i].trim();
        if v == NULL_FIELD { String::new() } else { v.to_string() }
    };
    let simplified = field(1);
    if simplified.is_empty() {
        return None;
    }
    let traditional = Some(field(2)).filter(|t| !t.is_empty() && *t != simplified);
    Some(WordSense {
        id: cols[0].trim().parse().ok()?,
        headword_id: cols[15].trim().parse().ok()?,
        simplified,
        traditional,
        pinyin: field(3),
        english: field(4),
        grammar: field(5),
        domain: field(9),
        notes: field(14),
    })
}

/// Toneless, lower-case pinyin with spaces, apostrophes and tone digits removed.
pub fn normalize_pinyin(pinyin: &str) -> String {
    pinyin
        .nfd()
        .filter(|c| c.is_ascii_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# id\tsimplified\ttraditional\tpinyin\tenglish\tgrammar\tconcept_cn\tconcept_en\tdomain_cn\tdomain_en\tsubdomain_cn\tsubdomain_en\timage\tmp3\tnotes\theadword
2\t结实\t結實\tjiēshi\tsturdy\tadjective\t\\N\t\\N\t现代汉语\tModern Chinese\t\\N\t\\N\t\\N\t\\N\t\\N\t2
3\t结实\t結實\tjiēshí\tto bear fruit\tverb\t\\N\t\\N\t植物\tBotany\t\\N\t\\N\t\\N\t\\N\tAlso 开花结实\t2
4\t你好\t\\N\tnǐ hǎo\thello\tphrase\t\\N\t\\N\t\\N\t\\N\t\\N\t\\N\t\\N\t\\N\t\\N\t4
bad line
";

    #[test]
    fn groups_senses_by_headword() {
        let dict = Dictionary::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dict.len(), 2);
        let word = dict.get("結實").unwrap();
        assert_eq!(word.headword_id, 2);
        assert_eq!(word.senses.len(), 2);
        assert_eq!(word.senses[1].domain, "Botany");
        assert_eq!(word.senses[1].notes, "Also 开花结实");
        assert!(Arc::ptr_eq(word, dict.get("结实").unwrap()));
    }

    #[test]
    fn null_traditional_means_same_form() {
        let dict = Dictionary::parse(SAMPLE.as_bytes()).unwrap();
        let word = dict.get("你好").unwrap();
        assert_eq!(word.traditional, None);
        assert_eq!(dict.max_word_chars(), 2);
    }

    #[test]
    fn strips_tones() {
        assert_eq!(normalize_pinyin("jiēshi"), "jieshi");
        assert_eq!(normalize_pinyin("Nǐ hǎo"), "nihao");
        assert_eq!(normalize_pinyin("lǜ"), "lu");
        assert_eq!(normalize_pinyin("xi'an3"), "xian");
    }
}
