use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A gist as returned by `GET /gists/{id}`. Only the file map is materialized.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Gist {
    #[serde(default)]
    pub files: HashMap<String, GistFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GistFile {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Set by GitHub when `content` was cut short; the full text lives at `raw_url`.
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub raw_url: Option<String>,
}

impl Gist {
    /// Content of one file, empty when the file or its content is absent.
    pub fn file_content(&self, filename: &str) -> &str {
        self.files
            .get(filename)
            .and_then(|f| f.content.as_deref())
            .unwrap_or("")
    }
}

/// Partial-update body touching exactly one file.
#[derive(Debug, Serialize)]
pub struct GistUpdate<'a> {
    pub files: HashMap<&'a str, FileUpdate<'a>>,
}

#[derive(Debug, Serialize)]
pub struct FileUpdate<'a> {
    pub filename: &'a str,
    pub content: &'a str,
}

impl<'a> GistUpdate<'a> {
    pub fn single(filename: &'a str, content: &'a str) -> Self {
        let mut files = HashMap::with_capacity(1);
        files.insert(filename, FileUpdate { filename, content });
        Self { files }
    }
}
