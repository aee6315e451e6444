use thiserror::Error;

pub use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("invalid relay endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid authorization header: {0}")]
    InvalidHeader(String),

    #[error("failed to connect to relay: {0}")]
    Handshake(#[source] Box<WsError>),

    #[error("failed to send message: {0}")]
    Send(#[source] Box<WsError>),

    #[error("failed to receive message: {0}")]
    Receive(#[source] Box<WsError>),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<WsError> for RelayError {
    fn from(err: WsError) -> Self {
        RelayError::Handshake(Box::new(err))
    }
}
