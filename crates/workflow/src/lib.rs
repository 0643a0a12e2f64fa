//! Edit session state machine and the async driver around it.
//!
//! [`Session`] is the authoritative, synchronous state: which image is
//! loaded, the mask, the quota, the current result. [`Editor`] wires it to
//! the image engine and the request orchestrator, enforcing single-flight
//! submission and abandoning in-flight requests on reset.

mod editor;
mod session;
mod view;

pub use editor::{Editor, EditorCallbacks, SubmitOutcome};
pub use session::{Completion, PendingSubmit, Phase, Session, Ticket};
pub use view::ViewState;

pub use core_types::MAX_REQUESTS;

use engine::EngineError;
use thiserror::Error;

/// Notice text shown next to the submit control.
pub const QUOTA_NOTICE: &str = "You can send up to 5 edit requests.";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("The selected file is not a supported image: {0}")]
    Decode(String),

    #[error("Display geometry is not available yet")]
    LayoutNotReady,

    #[error("Select an image first")]
    NoImage,

    #[error("An edit request is already in progress")]
    Busy,

    #[error("You can send up to {limit} edit requests. Clear the image to start over.")]
    QuotaExceeded { limit: u32 },

    #[error("Could not prepare the mask: {0}")]
    MaskExport(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl From<EngineError> for WorkflowError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::LayoutNotReady => WorkflowError::LayoutNotReady,
            EngineError::Encode(msg) => WorkflowError::MaskExport(msg),
            EngineError::Decode(msg) => WorkflowError::Decode(msg),
            EngineError::EmptyImage => WorkflowError::Decode(EngineError::EmptyImage.to_string()),
            EngineError::Io(e) => WorkflowError::Decode(e.to_string()),
        }
    }
}
