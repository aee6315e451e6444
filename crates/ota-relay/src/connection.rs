use async_trait::async_trait;
use serde_json::Value;

use crate::{config::Target, errors::RelayError};

/// One full-duplex, message-framed conversation with the relay.
///
/// A connection is owned by exactly one worker and never shared.
#[async_trait]
pub trait Connection: Send {
    /// Sends one JSON message as a text frame.
    async fn send(&mut self, message: &Value) -> Result<(), RelayError>;

    /// Waits for the next data frame.
    ///
    /// Returns `Ok(None)` once the relay closed the connection cleanly.
    async fn recv(&mut self) -> Result<Option<String>, RelayError>;

    async fn close(&mut self) -> Result<(), RelayError>;
}

/// Opens authenticated connections to relay endpoints.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Connection>, RelayError>;
}
