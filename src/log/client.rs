use std::fmt;
use std::sync::Arc;

use crate::config::GistLogConfig;
use crate::errors::GistLogResult;
use crate::log::codec::{self, Row};
use crate::store::backend::DocumentStore;
use crate::store::github::GitHubGistStore;

/// Handle bound to one gist and one credential.
///
/// Cloning is cheap and every operation runs its own fetch/update exchange; nothing is cached
/// between calls. Concurrent appends to the same file race: each fetches independently and
/// the later update overwrites the earlier one.
#[derive(Clone)]
pub struct GistLog {
    gist_id: String,
    token: String,
    store: Arc<dyn DocumentStore>,
}

impl GistLog {
    /// Handle against api.github.com. `token` is called once, here.
    pub fn new(gist_id: impl Into<String>, token: impl FnOnce() -> String) -> GistLogResult<Self> {
        Self::from_config(GistLogConfig::default(), gist_id, token)
    }

    pub fn from_config(
        config: GistLogConfig,
        gist_id: impl Into<String>,
        token: impl FnOnce() -> String,
    ) -> GistLogResult<Self> {
        let store = GitHubGistStore::new(config)?;
        Ok(Self::with_store(Arc::new(store), gist_id, token))
    }

    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        gist_id: impl Into<String>,
        token: impl FnOnce() -> String,
    ) -> Self {
        Self {
            gist_id: gist_id.into(),
            token: token(),
            store,
        }
    }

    pub fn gist_id(&self) -> &str {
        &self.gist_id
    }

    /// Appends `row` as one CSV line to `filename`, creating the file if needed.
    ///
    /// A rejected fetch returns before anything is pushed. A rejected push is not retried.
    pub async fn append<S: AsRef<str>>(&self, filename: &str, row: &[S]) -> GistLogResult<()> {
        let previous = self
            .store
            .fetch_file(&self.gist_id, &self.token, filename)
            .await?;
        let line = codec::encode_row(row)?;
        let content = codec::splice(&previous, &line);
        self.store
            .push_file(&self.gist_id, &self.token, filename, &content)
            .await?;

        tracing::info!(
            store = self.store.name(),
            gist = %self.gist_id,
            file = %filename,
            bytes = content.len(),
            "row appended"
        );
        Ok(())
    }

    /// Fire-and-forget `append`. Returns at once; the outcome, error or not, is dropped.
    ///
    /// Runs on the current tokio runtime when there is one, otherwise on a fresh thread.
    pub fn append_detached<S: AsRef<str>>(&self, filename: &str, row: &[S]) {
        let log = self.clone();
        let filename = filename.to_string();
        let row: Row = row.iter().map(|f| f.as_ref().to_string()).collect();
        let task = async move {
            let _ = log.append(&filename, &row).await;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                std::thread::spawn(move || {
                    if let Ok(rt) = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        rt.block_on(task);
                    }
                });
            }
        }
    }

    /// All rows of `filename` in file order. A missing file reads as no rows.
    pub async fn read_all(&self, filename: &str) -> GistLogResult<Vec<Row>> {
        let content = self
            .store
            .fetch_file(&self.gist_id, &self.token, filename)
            .await?;
        let rows = codec::parse_rows(&content)?;
        tracing::info!(gist = %self.gist_id, file = %filename, rows = rows.len(), "rows read");
        Ok(rows)
    }
}

impl fmt::Debug for GistLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GistLog")
            .field("gist_id", &self.gist_id)
            .field("token", &"<redacted>")
            .field("store", &self.store.name())
            .finish()
    }
}
