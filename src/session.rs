//! Search session: the form's view model and the controller that drives it.
//!
//! Every outbound request gets a sequence number. A response is applied only
//! if no newer request was issued in the meantime, so the newest request wins
//! regardless of the order in which responses resolve. The busy flag tracks
//! the newest request and is cleared when it completes, fails or is dropped.

use crate::error::Result;
use crate::models::{SearchEntry, SearchPage};
use crate::pagination::PageWindow;
use crate::query::{FormField, PageSize, QueryForm};
use crate::sciencedirect::SearchBackend;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// User actions that may trigger a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Submit,
    ChangePageSize(PageSize),
    Previous,
    Next,
}

/// A request the session has committed to
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub seq: u64,
    pub form: QueryForm,
}

/// What happened to a finished request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Results and total replaced
    Applied,
    /// A newer request was issued first; response discarded
    Stale,
    /// Request failed; results cleared, total kept
    Failed,
}

/// Outcome of [`SearchController::dispatch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Action was not allowed in the current state (Prev on page 1, busy)
    Ignored,
    Completed { seq: u64, completion: Completion },
}

/// Form values, last results and request bookkeeping
#[derive(Debug, Clone, Default)]
pub struct SearchSession {
    form: QueryForm,
    results: Vec<SearchEntry>,
    /// Unknown until the first successful response; kept on failure
    total: Option<u64>,
    latest_seq: u64,
    in_flight: Option<u64>,
    last_error: Option<String>,
}

impl SearchSession {
    pub fn new(form: QueryForm) -> Self {
        Self {
            form,
            ..Default::default()
        }
    }

    pub fn form(&self) -> &QueryForm {
        &self.form
    }

    pub fn results(&self) -> &[SearchEntry] {
        &self.results
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Pagination bounds, once a total has been observed
    pub fn page_window(&self) -> Option<PageWindow> {
        self.total
            .map(|total| PageWindow::new(total, self.form.page, self.form.page_size))
    }

    pub fn can_go_previous(&self) -> bool {
        !self.is_busy() && self.form.page > 1
    }

    pub fn can_go_next(&self) -> bool {
        !self.is_busy()
    }

    pub fn update(&mut self, field: FormField) {
        self.form.update(field);
    }

    /// Whether `action` may run in the current state
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Submit | Action::ChangePageSize(_) => true,
            Action::Previous => self.can_go_previous(),
            Action::Next => self.can_go_next(),
        }
    }

    /// Turn an action into a request, or `None` if the action is disabled.
    ///
    /// A page-size change is kept even when the form then fails validation;
    /// only the fetch is refused. Prev/Next move the page only on success.
    pub fn begin(&mut self, action: Action) -> Result<Option<PendingRequest>> {
        if !self.allows(action) {
            return Ok(None);
        }

        if let Action::ChangePageSize(size) = action {
            self.form.update(FormField::PageSize(size));
            self.form.page = 1;
        }

        let mut next = self.form.clone();
        match action {
            Action::Submit | Action::ChangePageSize(_) => {}
            Action::Previous => next.page -= 1,
            Action::Next => next.page = next.page.saturating_add(1),
        }

        next.validate()?;
        self.form = next;
        Ok(Some(self.issue()))
    }

    fn issue(&mut self) -> PendingRequest {
        self.latest_seq += 1;
        self.in_flight = Some(self.latest_seq);
        PendingRequest {
            seq: self.latest_seq,
            form: self.form.clone(),
        }
    }

    /// Record the outcome of request `seq`.
    pub fn finish(&mut self, seq: u64, outcome: Result<SearchPage>) -> Completion {
        if seq != self.latest_seq {
            debug!(seq = seq, latest = self.latest_seq, "Discarding stale response");
            return Completion::Stale;
        }

        self.in_flight = None;
        match outcome {
            Ok(page) => {
                self.total = Some(page.total);
                self.results = page.entries;
                self.last_error = None;
                Completion::Applied
            }
            Err(e) => {
                self.results.clear();
                self.last_error = Some(e.to_string());
                Completion::Failed
            }
        }
    }

    /// Request `seq` will never finish; clear busy if it was the newest.
    pub fn abandon(&mut self, seq: u64) {
        if self.in_flight == Some(seq) {
            self.in_flight = None;
        }
    }

    fn reject(&mut self, message: String) {
        self.last_error = Some(message);
    }
}

fn lock(session: &Mutex<SearchSession>) -> MutexGuard<'_, SearchSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a request as in flight until it is finished or dropped
struct InFlight {
    session: Arc<Mutex<SearchSession>>,
    seq: u64,
    done: bool,
}

impl InFlight {
    fn new(session: Arc<Mutex<SearchSession>>, seq: u64) -> Self {
        Self {
            session,
            seq,
            done: false,
        }
    }

    fn finish(mut self, outcome: Result<SearchPage>) -> Completion {
        self.done = true;
        lock(&self.session).finish(self.seq, outcome)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.done {
            warn!(seq = self.seq, "Search dropped before completion");
            lock(&self.session).abandon(self.seq);
        }
    }
}

/// Runs form actions against a search backend.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SearchController {
    backend: Arc<dyn SearchBackend>,
    session: Arc<Mutex<SearchSession>>,
}

impl SearchController {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self::with_session(backend, SearchSession::default())
    }

    pub fn with_session(backend: Arc<dyn SearchBackend>, session: SearchSession) -> Self {
        Self {
            backend,
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Copy of the current session state, for rendering
    pub fn snapshot(&self) -> SearchSession {
        lock(&self.session).clone()
    }

    /// Apply form edits, then run `action` to completion.
    ///
    /// A disabled action is ignored before the edits are applied, so the form
    /// under an in-flight request is left alone. Backend failures are absorbed into the session and reported as
    /// [`Completion::Failed`]; only rejected input is returned as an error.
    pub async fn dispatch(&self, edits: Vec<FormField>, action: Action) -> Result<Dispatch> {
        let pending = {
            let mut session = lock(&self.session);
            if !session.allows(action) {
                debug!(action = ?action, "Action ignored");
                return Ok(Dispatch::Ignored);
            }
            for edit in edits {
                session.update(edit);
            }
            match session.begin(action) {
                Ok(Some(pending)) => pending,
                Ok(None) => {
                    debug!(action = ?action, "Action ignored");
                    return Ok(Dispatch::Ignored);
                }
                Err(e) => {
                    session.reject(e.to_string());
                    return Err(e);
                }
            }
        };

        let seq = pending.seq;
        let guard = InFlight::new(self.session.clone(), seq);
        debug!(seq = seq, action = ?action, page = pending.form.page, "Dispatching search");

        let outcome = self.backend.search(&pending.form).await;
        if let Err(e) = &outcome {
            warn!(seq = seq, error = %e, "Search failed");
        }

        let completion = guard.finish(outcome);
        info!(seq = seq, completion = ?completion, "Search finished");
        Ok(Dispatch::Completed { seq, completion })
    }
}
