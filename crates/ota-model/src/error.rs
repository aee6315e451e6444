use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("malformed relay message: {0}")]
    Json(#[from] serde_json::Error),
}
