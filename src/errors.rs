use thiserror::Error;

#[derive(Debug, Error)]
pub enum GistLogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request build error: {0}")]
    RequestBuild(String),

    #[error("HTTP error: {0}")]
    Transport(reqwest::Error),

    /// The gist API answered with a status >= 400.
    #[error("HTTP Status: {status}, {body}")]
    Store { status: u16, body: String },

    #[error("CSV encode error: {0}")]
    Encode(String),

    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl From<reqwest::Error> for GistLogError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            GistLogError::RequestBuild(e.to_string())
        } else {
            GistLogError::Transport(e)
        }
    }
}

impl GistLogError {
    /// HTTP status carried by a store rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GistLogError::Store { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type GistLogResult<T> = Result<T, GistLogError>;
