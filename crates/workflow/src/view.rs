use core_types::{Dimensions, DisplayRect};
use inpaint_client::ResourceRef;

use crate::Phase;

/// Snapshot of everything a view needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    /// Shows the loading overlay and locks the canvas.
    pub processing: bool,
    pub result_ready: bool,
    pub result: Option<ResourceRef>,
    pub drawing: bool,
    /// Native size of the loaded image.
    pub image: Option<Dimensions>,
    pub display: Option<DisplayRect>,
    pub request_count: u32,
    pub remaining_requests: u32,
    pub submit_label: &'static str,
    pub can_submit: bool,
    pub can_clear: bool,
    pub message: Option<String>,
}

impl ViewState {
    /// Text for the request counter, e.g. `2 / 5`.
    pub fn counter_label(&self) -> String {
        format!(
            "{} / {}",
            self.request_count,
            self.request_count + self.remaining_requests
        )
    }
}
