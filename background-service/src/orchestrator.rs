//! Per-invocation analysis state machine.
//!
//! One RUN_ANALYSIS drives extraction, the backend call and injection
//! strictly in that order. Invocations share nothing except the optional
//! per-tab in-flight set.

use crate::tabs::TabMessenger;
use chrono::{DateTime, Utc};
use helper_core::{Disposition, ErrorReporter, HelperError, Message, OrchestratorConfig, TabId};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use summary_client::SummaryBackend;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    AwaitingExtraction,
    AwaitingBackend,
    Injecting,
    /// Terminal. Nothing was injected.
    Aborted,
}

impl AnalysisState {
    pub fn can_advance_to(self, next: AnalysisState) -> bool {
        use AnalysisState::*;
        matches!(
            (self, next),
            (Idle, AwaitingExtraction)
                | (AwaitingExtraction, AwaitingBackend)
                | (AwaitingExtraction, Aborted)
                | (AwaitingBackend, Injecting)
                | (Injecting, Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == AnalysisState::Aborted
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnalysisState::Idle => "idle",
            AnalysisState::AwaitingExtraction => "awaiting_extraction",
            AnalysisState::AwaitingBackend => "awaiting_backend",
            AnalysisState::Injecting => "injecting",
            AnalysisState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// INJECT_RESULT was queued for the tab.
    Injected,
    Aborted(HelperError),
    /// Another invocation for the same tab was still in flight.
    AlreadyRunning,
    /// The result was produced but the tab was gone by the time it was sent.
    DispatchFailed(HelperError),
}

impl RunOutcome {
    pub fn is_injected(&self) -> bool {
        matches!(self, RunOutcome::Injected)
    }
}

#[derive(Debug)]
pub struct InvocationReport {
    pub invocation: Uuid,
    pub tab_id: TabId,
    pub final_state: AnalysisState,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

struct StateTracker {
    current: AnalysisState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            current: AnalysisState::Idle,
        }
    }

    fn advance(&mut self, next: AnalysisState) {
        if !self.current.can_advance_to(next) {
            error!(from = %self.current, to = %next, "Invalid analysis state transition");
            return;
        }
        debug!(from = %self.current, to = %next, "Analysis state transition");
        self.current = next;
    }
}

/// Releases the tab's in-flight slot when the invocation ends, however it ends.
struct InFlightGuard<'a> {
    tabs: &'a Mutex<HashSet<TabId>>,
    tab_id: TabId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.tabs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.tab_id);
    }
}

pub struct Orchestrator {
    tabs: Arc<dyn TabMessenger>,
    backend: Arc<dyn SummaryBackend>,
    reporter: ErrorReporter,
    in_flight: Option<Mutex<HashSet<TabId>>>,
}

impl Orchestrator {
    pub fn new(tabs: Arc<dyn TabMessenger>, backend: Arc<dyn SummaryBackend>) -> Self {
        Self {
            tabs,
            backend,
            reporter: ErrorReporter::new(),
            in_flight: None,
        }
    }

    pub fn with_config(self, config: &OrchestratorConfig) -> Self {
        self.with_single_flight(config.single_flight_per_tab)
    }

    /// Rejects a RUN_ANALYSIS while another one for the same tab is running.
    /// Off by default: same-tab invocations race and may both inject.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(|| Mutex::new(HashSet::new()));
        self
    }

    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub async fn run_analysis(&self, tab_id: TabId) -> InvocationReport {
        let invocation = Uuid::new_v4();
        let started_at = Utc::now();

        let (final_state, outcome) = self
            .drive(tab_id)
            .instrument(info_span!("run_analysis", %invocation, %tab_id))
            .await;

        InvocationReport {
            invocation,
            tab_id,
            final_state,
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(&self, tab_id: TabId) -> (AnalysisState, RunOutcome) {
        let mut state = StateTracker::new();

        let _guard = match self.acquire(tab_id) {
            Ok(guard) => guard,
            Err(e) => {
                self.absorb(&e);
                return (state.current, RunOutcome::AlreadyRunning);
            }
        };

        state.advance(AnalysisState::AwaitingExtraction);
        let post = match self.tabs.send_request(tab_id, Message::GetPostData).await {
            Ok(post) => post,
            Err(e) => {
                self.absorb(&e);
                state.advance(AnalysisState::Aborted);
                return (state.current, RunOutcome::Aborted(e));
            }
        };

        if !post.has_content() {
            let e = HelperError::EmptyContent { tab_id };
            self.absorb(&e);
            state.advance(AnalysisState::Aborted);
            return (state.current, RunOutcome::Aborted(e));
        }

        state.advance(AnalysisState::AwaitingBackend);
        let aggregated = self.backend.generate_summary(&post).await;

        state.advance(AnalysisState::Injecting);
        let dispatched = self
            .tabs
            .send_notification(tab_id, Message::InjectResult { aggregated });
        state.advance(AnalysisState::Idle);

        match dispatched {
            Ok(()) => {
                info!("Analysis result sent to tab");
                (state.current, RunOutcome::Injected)
            }
            Err(e) => {
                self.absorb(&e);
                (state.current, RunOutcome::DispatchFailed(e))
            }
        }
    }

    fn acquire(&self, tab_id: TabId) -> Result<Option<InFlightGuard<'_>>, HelperError> {
        let Some(tabs) = &self.in_flight else {
            return Ok(None);
        };

        let mut running = tabs.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(tab_id) {
            return Err(HelperError::AlreadyRunning { tab_id });
        }
        Ok(Some(InFlightGuard { tabs, tab_id }))
    }

    fn absorb(&self, error: &HelperError) {
        match Disposition::for_error(error) {
            Disposition::SilentAbort => self.reporter.report_warning(error),
            _ => self.reporter.report_error(error),
        }
    }
}
