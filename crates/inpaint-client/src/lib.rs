//! Client side of the inpainting round trip.
//!
//! [`Orchestrator::submit_edit`] sends one request through a [`Transport`],
//! interprets the reply and publishes the returned image into a
//! [`ResourceStore`], handing back an owned [`EditResult`].

pub mod http;
pub mod orchestrator;
pub mod request;
pub mod resource;
pub mod response;
pub mod transport;

pub use http::HttpTransport;
pub use orchestrator::Orchestrator;
pub use request::{EditRequest, Payload, EDIT_PROMPT};
pub use resource::{EditResult, MemoryStore, ResourceRef, ResourceStore, TempDirStore};
pub use response::{ErrorBody, ServiceImage};
pub use transport::{RawResponse, Transport, TransportError};

use thiserror::Error;

/// Shown when a failed response carries no readable message.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred. Please try again.";
/// Shown when the request never produced a response.
pub const TRANSPORT_FAILURE: &str = "Something went wrong";

#[derive(Debug, Error)]
pub enum EditError {
    /// Transport failure or a non-success status.
    #[error("{message}")]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// The exchange succeeded but the service did not return a usable image.
    #[error("{0}")]
    Service(String),

    #[error("Failed to store result: {0}")]
    Resource(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EditError>;

impl EditError {
    /// Single human-readable line for the notification collaborator.
    pub fn user_message(&self) -> String {
        match self {
            EditError::Network { message, .. } => message.clone(),
            EditError::Service(message) => message.clone(),
            EditError::Resource(_) => TRANSPORT_FAILURE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EditError::Network { status, .. } => *status,
            _ => None,
        }
    }
}
