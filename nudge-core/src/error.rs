//! Error types for nudge-core

use thiserror::Error;

/// Top-level error type for nudge-core
#[derive(Error, Debug)]
pub enum NudgeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Renderer load error: {0}")]
    Load(#[from] LoadError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Display creation for survey {survey_id} returned no id")]
    MalformedDisplay { survey_id: String },
}

/// Errors from the remote collection endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid API host: {0}")]
    InvalidHost(String),
}

impl TransportError {
    /// Whether the server answered successfully but without the data we need
    pub fn is_malformed(&self) -> bool {
        matches!(self, TransportError::Malformed(_))
    }
}

/// Errors from delivery session transitions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Display id already set to {existing}, refusing {attempted}")]
    DisplayIdConflict { existing: String, attempted: String },

    #[error("Response id already set to {existing}, refusing {attempted}")]
    ResponseIdConflict { existing: String, attempted: String },

    #[error("Session belongs to survey {expected}, got {actual}")]
    SurveyMismatch { expected: String, actual: String },
}

/// Errors loading the rendering module
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to load renderer from {url}: {message}")]
    Fetch { url: String, message: String },
}

/// Errors reading or writing a persisted client state
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
