use crate::calibration::{DEFAULT_AVG_DOC_LEN, DEFAULT_SNIPPET_LEN, MAX_DOCS_RETURNED};
use std::str::FromStr;

/// Runtime knobs for ranking and snippet extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub avg_doc_len: f64,
    pub snippet_len: usize,
    pub max_documents: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { avg_doc_len: DEFAULT_AVG_DOC_LEN, snippet_len: DEFAULT_SNIPPET_LEN, max_documents: MAX_DOCS_RETURNED }
    }
}

impl SearchConfig {
    /// Defaults overridden by `AVG_DOC_LEN` and `SNIPPET_LEN` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut config = Self::default();
        if let Some(v) = parse_var::<f64, _>(&lookup, "AVG_DOC_LEN") {
            if v > 0.0 {
                config.avg_doc_len = v;
            } else {
                tracing::warn!(value = v, "AVG_DOC_LEN must be positive, keeping default");
            }
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "SNIPPET_LEN") {
            config.snippet_len = v;
        }
        config
    }
}

fn parse_var<T: FromStr, F: Fn(&str) -> Option<String>>(lookup: &F, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(name, value = %raw, "ignoring unparsable environment value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let config = SearchConfig::from_lookup(|name| match name {
            "AVG_DOC_LEN" => Some("1200.5".into()),
            "SNIPPET_LEN" => Some("80".into()),
            _ => None,
        });
        assert_eq!(config.avg_doc_len, 1200.5);
        assert_eq!(config.snippet_len, 80);
        assert_eq!(config.max_documents, MAX_DOCS_RETURNED);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let config = SearchConfig::from_lookup(|name| match name {
            "AVG_DOC_LEN" => Some("-3".into()),
            "SNIPPET_LEN" => Some("wide".into()),
            _ => None,
        });
        assert_eq!(config, SearchConfig::default());
    }
}
