use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod geometry;

pub use geometry::{BitmapPoint, Dimensions, DisplayRect};

/// Maximum number of edit submissions allowed per session.
pub const MAX_REQUESTS: u32 = 5;

/// Identifier of a published result resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

/// Wire encoding used to talk to the inpainting service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// `multipart/form-data` with `image`, `mask` and `prompt` parts.
    #[default]
    Multipart,
    /// JSON body carrying base64 data URLs.
    JsonBase64,
}

bitflags::bitflags! {
    /// Observable changes produced by a session transition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Signals: u8 {
        const PHASE_CHANGED    = 0b0000_0001;
        const MASK_CHANGED     = 0b0000_0010;
        const RESULT_READY     = 0b0000_0100;
        const RESULT_RELEASED  = 0b0000_1000;
        const GEOMETRY_CHANGED = 0b0001_0000;
        const NOTICE           = 0b0010_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Error,
    Quota,
    Info,
}

/// A message for the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn error(description: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, description)
    }

    pub fn quota(description: impl Into<String>) -> Self {
        Self::new(NoticeKind::Quota, description)
    }

    pub fn info(description: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, description)
    }

    fn new(kind: NoticeKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            title: "Notification".to_string(),
            description: description.into(),
            raised_at: Utc::now(),
        }
    }
}
