use thiserror::Error;

/// Failure to retrieve the raw contact batch from the CRM.
///
/// The display strings are the messages surfaced to map users, so each
/// variant reads as an actionable hint rather than a debug dump.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Authentication failed. Check your HubSpot token.")]
    Unauthorized,

    #[error("No response received from API. Check your network connection.")]
    Transport(String),

    #[error("Failed to load contacts: Status {status}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response format from HubSpot API: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Stable machine-readable tag, used for metrics labels and JSON payloads
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unauthorized => "unauthorized",
            FetchError::Transport(_) => "transport",
            FetchError::Upstream { .. } => "upstream",
            FetchError::InvalidResponse(_) => "invalid_response",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, FetchError::Unauthorized)
    }
}

/// Failure of a single address lookup. Never escapes the coordinate resolver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Transport(String),

    #[error("geocoding service returned status {0}")]
    Status(u16),

    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ContactMapError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, ContactMapError>;
