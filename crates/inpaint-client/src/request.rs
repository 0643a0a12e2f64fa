use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use engine::{MaskEncoding, SourceImage};
use serde_json::{json, Value};

/// Fixed instruction sent with every edit.
pub const EDIT_PROMPT: &str = "Remove unwanted object and fill background naturally";

/// One binary part of an outbound request.
#[derive(Debug, Clone)]
pub struct Payload {
    pub bytes: Arc<[u8]>,
    pub file_name: String,
    pub mime: String,
}

impl Payload {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Everything the service needs for one edit.
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub image: Payload,
    pub mask: Payload,
    pub prompt: String,
}

impl EditRequest {
    /// Pair the untouched original with a mask snapshot.
    pub fn new(source: &SourceImage, mask: MaskEncoding) -> Self {
        Self {
            image: Payload {
                bytes: source.bytes(),
                file_name: source.file_name().to_string(),
                mime: source.mime().to_string(),
            },
            mask: Payload {
                bytes: Arc::from(mask.bytes),
                file_name: MaskEncoding::FILE_NAME.to_string(),
                mime: MaskEncoding::MIME.to_string(),
            },
            prompt: EDIT_PROMPT.to_string(),
        }
    }

    /// Body for services that take base64 data URLs instead of multipart.
    pub fn json_body(&self) -> Value {
        json!({
            "image": self.image.data_url(),
            "mask_image": self.mask.data_url(),
            "prompt": self.prompt,
        })
    }
}
