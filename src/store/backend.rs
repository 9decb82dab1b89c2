use async_trait::async_trait;

use crate::errors::GistLogResult;

/// Remote document store holding named files inside a gist.
///
/// Implementations perform exactly one logical exchange per call and never retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short identifier used in log output.
    fn name(&self) -> &str;

    /// Current content of `filename`, or an empty string when the gist has no such file.
    async fn fetch_file(&self, gist_id: &str, token: &str, filename: &str) -> GistLogResult<String>;

    /// Replaces the content of `filename` in full, leaving other files untouched.
    async fn push_file(
        &self,
        gist_id: &str,
        token: &str,
        filename: &str,
        content: &str,
    ) -> GistLogResult<()>;
}
