use std::io;
use std::path::Path;
use std::sync::Arc;

use core_types::{DisplayRect, Notice, Signals};
use engine::ImageEngine;
use futures::future::{AbortHandle, Abortable};
use inpaint_client::{Orchestrator, ResourceRef};
use parking_lot::Mutex;

use crate::session::{Completion, Session, Ticket};
use crate::view::ViewState;
use crate::{Result, WorkflowError, QUOTA_NOTICE};

/// Hooks for the view and notification collaborators.
///
/// Callbacks run after the session lock is released, so they may query the
/// editor again.
#[derive(Clone, Default)]
pub struct EditorCallbacks {
    pub on_change: Option<Arc<dyn Fn(Signals, &ViewState) + Send + Sync>>,
    pub on_notice: Option<Arc<dyn Fn(&Notice) + Send + Sync>>,
}

impl EditorCallbacks {
    fn emit_change(&self, signals: Signals, view: &ViewState) {
        if signals.is_empty() {
            return;
        }
        if let Some(cb) = &self.on_change {
            cb(signals, view);
        }
    }

    fn emit_notice(&self, notice: &Notice) {
        tracing::debug!(kind = ?notice.kind, description = %notice.description, "notice");
        if let Some(cb) = &self.on_notice {
            cb(notice);
        }
    }
}

/// How a call to [`Editor::submit`] ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    Completed { result: ResourceRef },
    Failed { message: String },
    /// Refused before anything was sent.
    Rejected(WorkflowError),
    /// The session was cleared or given a new image while the request ran.
    Abandoned,
}

/// Drives a [`Session`] from user events and runs edit requests against the
/// orchestrator. At most one request is in flight at a time.
pub struct Editor {
    session: Mutex<Session>,
    orchestrator: Orchestrator,
    engine: ImageEngine,
    in_flight: Mutex<Option<(Ticket, AbortHandle)>>,
    callbacks: EditorCallbacks,
}

impl Editor {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self::with_callbacks(orchestrator, EditorCallbacks::default())
    }

    pub fn with_callbacks(orchestrator: Orchestrator, callbacks: EditorCallbacks) -> Self {
        Self {
            session: Mutex::new(Session::new()),
            orchestrator,
            engine: ImageEngine::new(),
            in_flight: Mutex::new(None),
            callbacks,
        }
    }

    pub fn view(&self) -> ViewState {
        self.session.lock().view()
    }

    /// Run `f` against the session without exposing the lock.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&*self.session.lock())
    }

    /// Bytes of the result on display, if there is one.
    pub fn result_bytes(&self) -> io::Result<Option<Vec<u8>>> {
        let session = self.session.lock();
        session.result().map(|result| result.read_bytes()).transpose()
    }

    /// Load a picked or dropped file. A file that does not decode leaves the
    /// current session untouched.
    pub fn select_image(&self, bytes: Vec<u8>, file_name: Option<String>) -> Result<()> {
        let source = match self.engine.decode_source(bytes, file_name) {
            Ok(source) => source,
            Err(err) => return Err(self.reject(err.into())),
        };
        self.abort_in_flight();
        self.apply(|session| session.select_image(source))
    }

    pub fn open_image<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let source = match self.engine.open_source(path.as_ref()) {
            Ok(source) => source,
            Err(err) => return Err(self.reject(err.into())),
        };
        self.abort_in_flight();
        self.apply(|session| session.select_image(source))
    }

    /// The image was laid out (or re-laid out) at `rect`.
    pub fn relayout(&self, rect: DisplayRect) {
        let (signals, view) = {
            let mut session = self.session.lock();
            let signals = session.set_display(rect);
            (signals, session.view())
        };
        self.callbacks.emit_change(signals, &view);
    }

    /// Returns whether a stroke started.
    pub fn pointer_down(&self) -> bool {
        let mut session = self.session.lock();
        match session.begin_stroke() {
            Ok(()) => session.is_drawing(),
            Err(err) => {
                tracing::debug!("stroke ignored: {err}");
                false
            }
        }
    }

    /// Paint under the pointer. Events that arrive before layout are dropped.
    pub fn pointer_move(&self, client_x: f64, client_y: f64) {
        let (signals, view) = {
            let mut session = self.session.lock();
            match session.pointer_move(client_x, client_y) {
                Ok(signals) if !signals.is_empty() => (signals, session.view()),
                Ok(_) => return,
                Err(err) => {
                    tracing::trace!(client_x, client_y, "pointer move dropped: {err}");
                    return;
                }
            }
        };
        self.callbacks.emit_change(signals, &view);
    }

    pub fn pointer_up(&self) {
        self.session.lock().end_stroke();
    }

    /// Send the current image and mask for editing.
    ///
    /// The session lock is never held across the request. Dropping the
    /// returned future withdraws the submission.
    pub async fn submit(&self) -> SubmitOutcome {
        let (handle, registration) = AbortHandle::new_pair();
        let (pending, view) = {
            let mut session = self.session.lock();
            match session.begin_submit() {
                Ok(pending) => {
                    *self.in_flight.lock() = Some((pending.ticket, handle));
                    (pending, session.view())
                }
                Err(err) => {
                    drop(session);
                    return SubmitOutcome::Rejected(self.reject(err));
                }
            }
        };
        let ticket = pending.ticket;
        let mut guard = InFlight {
            editor: self,
            ticket,
            settled: false,
        };
        self.callbacks.emit_change(pending.signals, &view);

        let request = Abortable::new(self.orchestrator.submit_edit(&pending.request), registration);
        let outcome = request.await;
        guard.settled = true;
        drop(guard);

        let Ok(outcome) = outcome else {
            tracing::info!(?ticket, "edit request abandoned");
            return SubmitOutcome::Abandoned;
        };

        let (completion, view, submitted) = {
            let mut session = self.session.lock();
            let completion = session.complete_submit(ticket, outcome);
            let submitted = match session.last_error() {
                Some(message) => SubmitOutcome::Failed {
                    message: message.to_string(),
                },
                None => match session.result() {
                    Some(result) => SubmitOutcome::Completed {
                        result: result.resource().clone(),
                    },
                    None => SubmitOutcome::Abandoned,
                },
            };
            (completion, session.view(), submitted)
        };

        match completion {
            Completion::Applied { signals, notice } => {
                if let Some(notice) = notice {
                    self.callbacks.emit_notice(&notice);
                }
                self.callbacks.emit_change(signals, &view);
                submitted
            }
            Completion::Discarded => SubmitOutcome::Abandoned,
        }
    }

    /// Abandon any request, release the result and reset the quota.
    pub fn clear(&self) {
        self.abort_in_flight();
        let (signals, view) = {
            let mut session = self.session.lock();
            (session.clear(), session.view())
        };
        self.callbacks.emit_change(signals, &view);
    }

    fn abort_in_flight(&self) {
        if let Some((ticket, handle)) = self.in_flight.lock().take() {
            tracing::info!(?ticket, "aborting in-flight edit request");
            handle.abort();
        }
    }

    /// Forget the abort handle of `ticket` if it is still registered.
    fn release_in_flight(&self, ticket: Ticket) {
        let mut in_flight = self.in_flight.lock();
        if matches!(&*in_flight, Some((active, _)) if *active == ticket) {
            *in_flight = None;
        }
    }

    fn apply(&self, f: impl FnOnce(&mut Session) -> Result<Signals>) -> Result<()> {
        let (signals, view) = {
            let mut session = self.session.lock();
            let signals = f(&mut *session)?;
            (signals, session.view())
        };
        self.callbacks.emit_change(signals, &view);
        Ok(())
    }

    /// Report a refused event to the notification collaborator.
    fn reject(&self, err: WorkflowError) -> WorkflowError {
        let notice = match &err {
            WorkflowError::QuotaExceeded { .. } => Some(Notice::quota(QUOTA_NOTICE)),
            WorkflowError::Decode(_) | WorkflowError::MaskExport(_) => {
                Some(Notice::error(err.to_string()))
            }
            WorkflowError::NoImage | WorkflowError::Busy | WorkflowError::LayoutNotReady => None,
        };
        tracing::warn!("rejected: {err}");
        if let Some(notice) = notice {
            self.callbacks.emit_notice(&notice);
        }
        err
    }
}

/// Registration of a running submission. Dropped before the request settles,
/// it withdraws the submission so the session does not stay `Submitting`.
struct InFlight<'a> {
    editor: &'a Editor,
    ticket: Ticket,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.editor.release_in_flight(self.ticket);
        if self.settled {
            return;
        }
        let (signals, view) = {
            let mut session = self.editor.session.lock();
            (session.abandon_submit(self.ticket), session.view())
        };
        self.editor.callbacks.emit_change(signals, &view);
    }
}
