/// Engine-level errors
///
/// `NoCandidates` is the expected "nothing matched" outcome and callers are
/// meant to branch on it (widen the radius, relax filters). Upstream failures
/// are usually absorbed before they get here; see `PlaceAggregator`.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("No recommendation found: {0}")]
    NoCandidates(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for the recoverable "empty result" failure
    pub fn is_no_candidates(&self) -> bool {
        matches!(self, AppError::NoCandidates(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
