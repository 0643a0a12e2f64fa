use futures::future::BoxFuture;
use thiserror::Error;

use crate::EditRequest;

/// Status, content type and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Media type without parameters, lowercased.
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|raw| {
            raw.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// The request never produced a response.
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Sends one edit request to the service. Implementations must not retry.
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, request: &'a EditRequest)
        -> BoxFuture<'a, Result<RawResponse, TransportError>>;
}
