//! Append-only CSV logging into a single file of a GitHub gist.
//!
//! ```no_run
//! # async fn demo() -> gistlog::GistLogResult<()> {
//! let log = gistlog::GistLog::new("<gist id>", gistlog::config::env_token)?;
//! log.append("events.csv", &["started", "ok"]).await?;
//! log.append_detached("events.csv", &["best", "effort"]);
//! let rows = log.read_all("events.csv").await?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod errors;
pub mod log;
pub mod store;

pub use crate::config::GistLogConfig;
pub use crate::errors::{GistLogError, GistLogResult};
pub use crate::log::client::GistLog;
pub use crate::log::codec::Row;
pub use crate::store::backend::DocumentStore;
pub use crate::store::github::GitHubGistStore;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
