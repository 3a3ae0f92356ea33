use thiserror::Error;

/// A single REST call that did not produce a usable result.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Request returned non-success status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

impl RequestError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::Transport(e) => e.status().map(|s| s.as_u16()),
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Decode(_) => None,
        }
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        RequestError::Decode(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {message}")]
    Read { path: String, message: String },
    #[error("Failed to parse TOML from config file at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("Failed to load config from environment: {0}")]
    Environment(String),
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Errors that abort a whole run rather than a single row.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to fetch {collection}: {source}")]
    Fetch {
        collection: &'static str,
        #[source]
        source: RequestError,
    },
}
