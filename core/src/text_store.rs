use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Source of full plain-text document bodies.
#[async_trait]
pub trait TextStore: Send + Sync {
    async fn fetch(&self, gloss_file: &str) -> Result<String>;
}

/// Bodies on local disk: `<root>/<gloss_file>` with a `.txt` extension.
pub struct FileTextStore {
    root: PathBuf,
}

impl FileTextStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    pub fn path_for(&self, gloss_file: &str) -> Option<PathBuf> {
        text_path(&self.root, gloss_file)
    }
}

/// Where the body of `gloss_file` lives under `root`.
///
/// `None` for keys that are empty or would step outside `root` through `..`.
pub fn text_path(root: &Path, gloss_file: &str) -> Option<PathBuf> {
    relative_key(gloss_file).map(|rel| root.join(rel).with_extension("txt"))
}

fn relative_key(gloss_file: &str) -> Option<&Path> {
    let rel = Path::new(gloss_file.trim_start_matches('/'));
    let plain = rel.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (plain && !rel.as_os_str().is_empty()).then_some(rel)
}

#[async_trait]
impl TextStore for FileTextStore {
    async fn fetch(&self, gloss_file: &str) -> Result<String> {
        let path = self.path_for(gloss_file).with_context(|| format!("document key {gloss_file:?} leaves the text root"))?;
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}

/// Bodies served over HTTP from an object store, relative to a base URL.
pub struct HttpTextStore {
    client: reqwest::Client,
    base: Url,
}

impl HttpTextStore {
    pub fn new(base: &str) -> Result<Self> {
        let mut base = Url::parse(base).with_context(|| format!("invalid text store url {base:?}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { client: reqwest::Client::new(), base })
    }

    pub fn url_for(&self, gloss_file: &str) -> Result<Url> {
        let rel = relative_key(gloss_file)
            .with_context(|| format!("document key {gloss_file:?} leaves the base url"))?
            .with_extension("txt");
        Ok(self.base.join(&rel.to_string_lossy())?)
    }
}

#[async_trait]
impl TextStore for HttpTextStore {
    async fn fetch(&self, gloss_file: &str) -> Result<String> {
        let url = self.url_for(gloss_file)?;
        let resp = self.client.get(url.clone()).send().await?.error_for_status()?;
        resp.text().await.with_context(|| format!("reading body of {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gloss_files_map_to_txt() {
        let store = FileTextStore::new("/corpus");
        assert_eq!(store.path_for("lunyu/lunyu001.html"), Some(PathBuf::from("/corpus/lunyu/lunyu001.txt")));
        assert_eq!(store.path_for("/a.html"), Some(PathBuf::from("/corpus/a.txt")));
    }

    #[test]
    fn keys_cannot_leave_the_root() {
        let store = FileTextStore::new("/corpus");
        assert_eq!(store.path_for("../../x.html"), None);
        assert_eq!(store.path_for("lunyu/../../x.html"), None);
        assert_eq!(store.path_for(""), None);
        let http = HttpTextStore::new("https://bucket.example.com/corpus").unwrap();
        assert!(http.url_for("../x.html").is_err());
    }

    #[test]
    fn urls_resolve_under_base_path() {
        let store = HttpTextStore::new("https://bucket.example.com/corpus").unwrap();
        assert_eq!(store.url_for("lunyu/lunyu001.html").unwrap().as_str(), "https://bucket.example.com/corpus/lunyu/lunyu001.txt");
    }

    #[tokio::test]
    async fn reads_bodies_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("lunyu")).unwrap();
        std::fs::write(dir.path().join("lunyu/a.txt"), "子曰學而時習之").unwrap();
        let store = FileTextStore::new(dir.path());
        assert_eq!(store.fetch("lunyu/a.html").await.unwrap(), "子曰學而時習之");
        assert!(store.fetch("lunyu/missing.html").await.is_err());
        assert!(store.fetch("../lunyu/a.html").await.is_err());
    }
}
