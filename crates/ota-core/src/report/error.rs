use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report name must end in .yaml: {0:?}")]
    InvalidName(String),

    #[error("detail path component must be a plain name: {0:?}")]
    InvalidComponent(String),

    #[error("report io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode report: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
