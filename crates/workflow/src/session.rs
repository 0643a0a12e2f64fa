//! Edit session state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Any        -> Selected    (select_image)
//! Selected   -> Submitting  (begin_submit)
//! Ready      -> Submitting  (begin_submit, regenerate)
//! Error      -> Submitting  (begin_submit, retry)
//! Submitting -> Ready       (complete_submit with a result)
//! Submitting -> Error       (complete_submit with a failure)
//! Any        -> Empty       (clear)
//! ```
//!
//! Drawing is a flag on the loaded canvas rather than a state of its own.
//! Each variant carries exactly the data that is valid in it, so a `Ready`
//! session always has a result and a `Selected` one always has a mask.
//! Rejected events return an error and leave the session untouched.

use core_types::{Dimensions, DisplayRect, Notice, Signals, MAX_REQUESTS};
use engine::{map_to_bitmap, MaskBuffer, SourceImage, BRUSH_RADIUS};
use inpaint_client::{EditError, EditRequest, EditResult};

use crate::view::ViewState;
use crate::{Result, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Selected,
    Submitting,
    Ready,
    Error,
}

/// Identifies one submission. Stale tickets are discarded on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    serial: u32,
}

/// Image and mask of the active session. The mask always matches the image.
#[derive(Debug)]
struct Canvas {
    source: SourceImage,
    mask: MaskBuffer,
    drawing: bool,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Empty,
    Selected {
        canvas: Canvas,
    },
    Submitting {
        canvas: Canvas,
        ticket: Ticket,
        previous: Option<EditResult>,
    },
    Ready {
        canvas: Canvas,
        result: EditResult,
    },
    Failed {
        canvas: Canvas,
        message: String,
        previous: Option<EditResult>,
    },
}

impl SessionState {
    fn phase(&self) -> Phase {
        match self {
            SessionState::Empty => Phase::Empty,
            SessionState::Selected { .. } => Phase::Selected,
            SessionState::Submitting { .. } => Phase::Submitting,
            SessionState::Ready { .. } => Phase::Ready,
            SessionState::Failed { .. } => Phase::Error,
        }
    }

    fn canvas(&self) -> Option<&Canvas> {
        match self {
            SessionState::Empty => None,
            SessionState::Selected { canvas }
            | SessionState::Submitting { canvas, .. }
            | SessionState::Ready { canvas, .. }
            | SessionState::Failed { canvas, .. } => Some(canvas),
        }
    }

    fn canvas_mut(&mut self) -> Option<&mut Canvas> {
        match self {
            SessionState::Empty => None,
            SessionState::Selected { canvas }
            | SessionState::Submitting { canvas, .. }
            | SessionState::Ready { canvas, .. }
            | SessionState::Failed { canvas, .. } => Some(canvas),
        }
    }

    fn result(&self) -> Option<&EditResult> {
        match self {
            SessionState::Ready { result, .. } => Some(result),
            SessionState::Submitting { previous, .. } | SessionState::Failed { previous, .. } => {
                previous.as_ref()
            }
            _ => None,
        }
    }

    /// Split into the canvas and the displayable result, if any.
    fn into_parts(self) -> (Option<Canvas>, Option<EditResult>) {
        match self {
            SessionState::Empty => (None, None),
            SessionState::Selected { canvas } => (Some(canvas), None),
            SessionState::Ready { canvas, result } => (Some(canvas), Some(result)),
            SessionState::Submitting {
                canvas, previous, ..
            }
            | SessionState::Failed {
                canvas, previous, ..
            } => (Some(canvas), previous),
        }
    }
}

/// A submission that has been admitted and must now be sent.
#[derive(Debug)]
pub struct PendingSubmit {
    pub ticket: Ticket,
    pub request: EditRequest,
    pub signals: Signals,
}

/// What happened to a finished submission.
#[derive(Debug)]
pub enum Completion {
    Applied {
        signals: Signals,
        notice: Option<Notice>,
    },
    /// The session moved on; the outcome was dropped and any result released.
    Discarded,
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    request_count: u32,
    generation: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_processing(&self) -> bool {
        self.phase() == Phase::Submitting
    }

    pub fn request_count(&self) -> u32 {
        self.request_count
    }

    pub fn remaining_requests(&self) -> u32 {
        MAX_REQUESTS.saturating_sub(self.request_count)
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.state.canvas().map(|canvas| &canvas.source)
    }

    pub fn mask(&self) -> Option<&MaskBuffer> {
        self.state.canvas().map(|canvas| &canvas.mask)
    }

    /// Native size of the loaded image, for callers that lay it out.
    pub fn image_dimensions(&self) -> Option<Dimensions> {
        self.source().map(SourceImage::dimensions)
    }

    pub fn is_drawing(&self) -> bool {
        self.state.canvas().is_some_and(|canvas| canvas.drawing)
    }

    /// The result currently on display, including the previous one while a
    /// regeneration is running or after it failed.
    pub fn result(&self) -> Option<&EditResult> {
        self.state.result()
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn submit_label(&self) -> &'static str {
        if self.result().is_some() {
            "Regenerate"
        } else {
            "Edit"
        }
    }

    pub fn view(&self) -> ViewState {
        let canvas = self.state.canvas();
        let phase = self.phase();
        ViewState {
            phase,
            processing: phase == Phase::Submitting,
            result_ready: self.result().is_some(),
            result: self.result().map(|result| result.resource().clone()),
            drawing: self.is_drawing(),
            image: canvas.map(|c| c.source.dimensions()),
            display: canvas.and_then(|c| c.source.display()),
            request_count: self.request_count,
            remaining_requests: self.remaining_requests(),
            submit_label: self.submit_label(),
            can_submit: canvas.is_some()
                && phase != Phase::Submitting
                && self.request_count < MAX_REQUESTS,
            can_clear: phase != Phase::Empty,
            message: self.last_error().map(str::to_string),
        }
    }

    /// Make `source` the active image with a blank mask.
    ///
    /// Any result is released and an in-flight submission becomes stale. The
    /// request count is kept; only [`Session::clear`] resets the quota.
    pub fn select_image(&mut self, source: SourceImage) -> Result<Signals> {
        let mask = MaskBuffer::new(source.dimensions())?;
        debug_assert_eq!(mask.dimensions(), source.dimensions());

        let mut signals = Signals::PHASE_CHANGED | Signals::MASK_CHANGED;
        if source.display().is_some() {
            signals |= Signals::GEOMETRY_CHANGED;
        }
        if self.reset_state() {
            signals |= Signals::RESULT_RELEASED;
        }

        tracing::info!(
            file = %source.file_name(),
            width = source.width(),
            height = source.height(),
            "image selected"
        );
        self.state = SessionState::Selected {
            canvas: Canvas {
                source,
                mask,
                drawing: false,
            },
        };
        Ok(signals)
    }

    /// Record the on-screen box of the image.
    pub fn set_display(&mut self, rect: DisplayRect) -> Signals {
        let Some(canvas) = self.state.canvas_mut() else {
            return Signals::empty();
        };
        if canvas.source.set_display(rect) {
            Signals::GEOMETRY_CHANGED
        } else {
            Signals::empty()
        }
    }

    /// Pointer pressed over the image.
    pub fn begin_stroke(&mut self) -> Result<()> {
        match &mut self.state {
            SessionState::Empty => Ok(()),
            SessionState::Submitting { .. } => Err(WorkflowError::Busy),
            SessionState::Selected { canvas }
            | SessionState::Ready { canvas, .. }
            | SessionState::Failed { canvas, .. } => {
                canvas.drawing = true;
                Ok(())
            }
        }
    }

    /// Pointer released. Always allowed.
    pub fn end_stroke(&mut self) {
        if let Some(canvas) = self.state.canvas_mut() {
            canvas.drawing = false;
        }
    }

    /// Paint under the pointer if a stroke is active.
    ///
    /// Fails with [`WorkflowError::LayoutNotReady`] while no usable display box
    /// is known; the event should be dropped.
    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) -> Result<Signals> {
        let Some(canvas) = self.state.canvas_mut() else {
            return Ok(Signals::empty());
        };
        if !canvas.drawing {
            return Ok(Signals::empty());
        }

        let rect = canvas.source.display().ok_or(WorkflowError::LayoutNotReady)?;
        let point = map_to_bitmap(canvas.source.dimensions(), rect, client_x, client_y)?;

        if canvas.mask.paint_stroke(point, BRUSH_RADIUS) {
            Ok(Signals::MASK_CHANGED)
        } else {
            Ok(Signals::empty())
        }
    }

    /// Admit a submission: check the guards, snapshot the mask and move to
    /// `Submitting`. The caller must send the request and report back through
    /// [`Session::complete_submit`].
    pub fn begin_submit(&mut self) -> Result<PendingSubmit> {
        match &self.state {
            SessionState::Empty => return Err(WorkflowError::NoImage),
            SessionState::Submitting { .. } => return Err(WorkflowError::Busy),
            _ => {}
        }
        if self.request_count >= MAX_REQUESTS {
            tracing::warn!(count = self.request_count, "edit quota exhausted");
            return Err(WorkflowError::QuotaExceeded {
                limit: MAX_REQUESTS,
            });
        }

        let request = {
            let Some(canvas) = self.state.canvas() else {
                return Err(WorkflowError::NoImage);
            };
            let encoding = canvas.mask.export()?;
            EditRequest::new(&canvas.source, encoding)
        };

        self.request_count += 1;
        let ticket = Ticket {
            generation: self.generation,
            serial: self.request_count,
        };

        let (canvas, previous) = std::mem::take(&mut self.state).into_parts();
        let Some(mut canvas) = canvas else {
            return Err(WorkflowError::NoImage);
        };
        canvas.drawing = false;
        self.state = SessionState::Submitting {
            canvas,
            ticket,
            previous,
        };

        tracing::info!(count = self.request_count, "submitting edit");
        Ok(PendingSubmit {
            ticket,
            request,
            signals: Signals::PHASE_CHANGED,
        })
    }

    /// Apply the outcome of the submission identified by `ticket`.
    pub fn complete_submit(
        &mut self,
        ticket: Ticket,
        outcome: std::result::Result<EditResult, EditError>,
    ) -> Completion {
        let current = matches!(
            &self.state,
            SessionState::Submitting { ticket: active, .. } if *active == ticket
        );
        if !current {
            tracing::info!(?ticket, "discarding outcome of abandoned submission");
            if let Ok(result) = outcome {
                result.release();
            }
            return Completion::Discarded;
        }

        let (canvas, previous) = std::mem::take(&mut self.state).into_parts();
        let Some(canvas) = canvas else {
            return Completion::Discarded;
        };

        match outcome {
            Ok(result) => {
                let mut signals = Signals::PHASE_CHANGED | Signals::RESULT_READY;
                if let Some(previous) = previous {
                    previous.release();
                    signals |= Signals::RESULT_RELEASED;
                }
                tracing::info!(id = result.id().0, "edit applied");
                self.state = SessionState::Ready { canvas, result };
                Completion::Applied {
                    signals,
                    notice: None,
                }
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(%message, "edit failed");
                let notice = Notice::error(message.clone());
                self.state = SessionState::Failed {
                    canvas,
                    message,
                    previous,
                };
                Completion::Applied {
                    signals: Signals::PHASE_CHANGED | Signals::NOTICE,
                    notice: Some(notice),
                }
            }
        }
    }

    /// Withdraw the submission identified by `ticket` without an outcome.
    ///
    /// The session returns to `Ready` if a previous result is on display and
    /// to `Selected` otherwise. The request stays counted against the quota.
    pub fn abandon_submit(&mut self, ticket: Ticket) -> Signals {
        let current = matches!(
            &self.state,
            SessionState::Submitting { ticket: active, .. } if *active == ticket
        );
        if !current {
            return Signals::empty();
        }

        let (canvas, previous) = std::mem::take(&mut self.state).into_parts();
        let Some(canvas) = canvas else {
            return Signals::empty();
        };
        tracing::info!(?ticket, "submission withdrawn");
        self.state = match previous {
            Some(result) => SessionState::Ready { canvas, result },
            None => SessionState::Selected { canvas },
        };
        Signals::PHASE_CHANGED
    }

    /// Drop everything and return to `Empty` with a fresh quota.
    pub fn clear(&mut self) -> Signals {
        let mut signals = Signals::empty();
        if self.phase() != Phase::Empty {
            signals |= Signals::PHASE_CHANGED;
        }
        if self.reset_state() {
            signals |= Signals::RESULT_RELEASED;
        }
        self.request_count = 0;
        tracing::info!("session cleared");
        signals
    }

    /// Release the current result, forget the canvas and invalidate tickets.
    /// Returns whether a result was released.
    fn reset_state(&mut self) -> bool {
        self.generation += 1;
        let (_, result) = std::mem::take(&mut self.state).into_parts();
        match result {
            Some(result) => {
                result.release();
                true
            }
            None => false,
        }
    }
}
