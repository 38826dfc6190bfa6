//! Error types for BioScoop Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Source errors
    #[error("Invalid media source: {0}")]
    InvalidSource(String),

    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Streaming client destroyed")]
    ClientDestroyed,

    // Playback errors
    #[error("Autoplay was blocked by the media element")]
    AutoplayBlocked,

    #[error("Media element error: {0}")]
    MediaElement(String),

    #[error("Fatal stream error ({kind}): {details}")]
    StreamFatal { kind: String, details: String },

    // Download errors
    #[error("Download already in progress")]
    DownloadInProgress,

    #[error("File save failed for {filename}: {reason}")]
    FileSave { filename: String, reason: String },

    // Store errors
    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Error::Store(msg.into())
    }

    /// Returns true if this error leaves the player usable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::AutoplayBlocked
                | Error::DownloadInProgress
                | Error::FileSave { .. }
                | Error::ManifestFetch(_)
                | Error::Network(_)
        )
    }

    /// Returns the error code for logs and JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::ClientDestroyed => "CLIENT_DESTROYED",
            Error::AutoplayBlocked => "AUTOPLAY_BLOCKED",
            Error::MediaElement(_) => "MEDIA_ELEMENT",
            Error::StreamFatal { .. } => "STREAM_FATAL",
            Error::DownloadInProgress => "DOWNLOAD_IN_PROGRESS",
            Error::FileSave { .. } => "FILE_SAVE",
            Error::ContentNotFound(_) => "CONTENT_NOT_FOUND",
            Error::Store(_) => "STORE",
            Error::Serialization(_) => "SERIALIZATION",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::UnknownLanguage(_) => "UNKNOWN_LANGUAGE",
            Error::Network(_) => "NETWORK",
            Error::Url(_) => "URL",
            Error::Io(_) => "IO",
        }
    }
}
