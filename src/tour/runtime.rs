//! Drives one guided-tour session.
//!
//! Owns the mutable session (state, working step list, timers) and writes
//! every change back to the profile store. Nothing here returns an error to
//! the caller: storage and notifier failures are logged and the tour keeps
//! going, or stays closed.

use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::TourConfig;
use crate::notify::{Notifier, TrackingEvent};
use crate::signals::{Signal, SignalBus};
use crate::store::ProfileStore;

use super::catalog::StepCatalog;
use super::model::{Answer, UserProfile};
use super::sequencer::{self, SelectOptions};
use super::state::{Navigation, Resolution, TourState, progress_percent};
use super::step::{StepAction, TourStep};

/// Collaborators the runtime talks to.
#[derive(Clone)]
pub struct TourDeps {
    pub profiles: ProfileStore,
    pub notifier: Notifier,
    pub signals: SignalBus,
}

/// What the UI renders for the current step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourView {
    pub session_id: Uuid,
    pub step: TourStep,
    pub index: usize,
    pub total: usize,
    pub progress_percent: u8,
    /// Seconds on this step, as shown by the ticking counter.
    pub elapsed_secs: u64,
}

/// Snapshot for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TourStatus {
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<TourView>,
    pub completed: bool,
    /// Whether to show the "restart tour" affordance.
    pub offer_restart: bool,
}

/// Result of submitting a questionnaire answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Stored; an automatic advance is scheduled if the tour is open.
    Accepted,
    /// Did not fit the current question; nothing was stored.
    Rejected { reason: String },
}

/// Aborts its task when dropped.
struct TaskGuard(Option<JoinHandle<()>>);

impl TaskGuard {
    fn new(handle: JoinHandle<()>) -> Self {
        Self(Some(handle))
    }

    /// Let the task run to completion without aborting it.
    fn detach(mut self) {
        self.0.take();
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

/// Advance scheduled after an answer.
struct PendingAdvance {
    seq: u64,
    from_index: usize,
    task: TaskGuard,
}

#[derive(Default)]
struct Session {
    state: TourState,
    steps: Vec<TourStep>,
    profile: Option<UserProfile>,
    session_id: Uuid,
    opened_at: Option<Instant>,
    step_entered_at: Option<Instant>,
    /// Answers given during this session.
    transcript: Vec<(String, Answer)>,
    ticker: Option<TaskGuard>,
    pending_advance: Option<PendingAdvance>,
    advance_seq: u64,
}

impl Session {
    fn current_step(&self) -> Option<&TourStep> {
        self.state.step_index().and_then(|i| self.steps.get(i))
    }

    fn cancel_pending_advance(&mut self) {
        if self.pending_advance.take().is_some() {
            debug!("Cancelled pending auto-advance");
        }
    }
}

struct Inner {
    config: TourConfig,
    catalog: Arc<StepCatalog>,
    deps: TourDeps,
    session: Mutex<Session>,
    ticks: Arc<watch::Sender<u64>>,
}

/// Cheaply cloneable handle to a tour session.
#[derive(Clone)]
pub struct TourRuntime {
    inner: Arc<Inner>,
}

impl TourRuntime {
    pub fn new(config: TourConfig, catalog: Arc<StepCatalog>, deps: TourDeps) -> Self {
        let (ticks, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                config,
                catalog,
                deps,
                session: Mutex::new(Session::default()),
                ticks: Arc::new(ticks),
            }),
        }
    }

    /// Open the tour at its first step.
    ///
    /// The step list is derived from the stored profile every time. Returns
    /// `None` when there is nothing to show; the tour then stays closed.
    pub async fn open(&self) -> Option<TourView> {
        let mut session = self.inner.session.lock().await;
        if session.state.is_open() {
            debug!("Tour already open");
            return self.view_of(&session);
        }
        session.cancel_pending_advance();

        let profile = match self.inner.deps.profiles.load().await {
            Some(profile) => profile,
            None => {
                let profile = UserProfile::default();
                self.persist(&profile).await;
                profile
            }
        };

        let steps = sequencer::select_steps(&profile, &self.inner.catalog, self.select_options());
        session.profile = Some(profile);
        if steps.is_empty() {
            info!("No tour steps to show");
            session.state = TourState::Closed;
            return None;
        }

        session.session_id = Uuid::new_v4();
        session.steps = steps;
        session.transcript.clear();
        session.opened_at = Some(Instant::now());
        session.state = TourState::Open { step_index: 0 };
        self.enter_step(&mut session);

        info!(
            session_id = %session.session_id,
            steps = session.steps.len(),
            "Guided tour opened"
        );
        self.inner.deps.notifier.emit(TrackingEvent::Opened {
            session_id: session.session_id,
            total_steps: session.steps.len(),
        });

        self.view_of(&session)
    }

    pub async fn next(&self) {
        let mut session = self.inner.session.lock().await;
        self.navigate(&mut session, Navigation::Next).await;
    }

    pub async fn previous(&self) {
        let mut session = self.inner.session.lock().await;
        self.navigate(&mut session, Navigation::Previous).await;
    }

    /// Go straight to step `index`. Out-of-range indexes are ignored.
    pub async fn jump(&self, index: usize) {
        let mut session = self.inner.session.lock().await;
        self.navigate(&mut session, Navigation::Jump(index)).await;
    }

    /// Close the tour, marking every step up to the current one completed.
    pub async fn close(&self) {
        let mut session = self.inner.session.lock().await;
        self.finish(&mut session, false).await;
    }

    /// Close via "Skip Tour": as `close`, and the current step is also
    /// recorded as skipped.
    pub async fn skip(&self) {
        let mut session = self.inner.session.lock().await;
        self.finish(&mut session, true).await;
    }

    /// Record a questionnaire answer.
    ///
    /// The preference is written and persisted immediately. While the tour is
    /// open, the upcoming steps are re-planned for the new profile and an
    /// advance is scheduled after `auto_advance_delay`.
    pub async fn answer(&self, field: &str, answer: Answer) -> AnswerOutcome {
        let mut session = self.inner.session.lock().await;

        let question = session
            .current_step()
            .and_then(|step| step.questionnaire.as_ref())
            .filter(|q| q.field == field);
        if let Some(q) = question {
            if let Err(reason) = q.validate(&answer) {
                warn!(field, "Rejected tour answer: {}", reason);
                return AnswerOutcome::Rejected { reason };
            }
        }
        if !self.inner.catalog.is_known_field(field) {
            debug!(field, "Answer for a field no step reads");
        }

        let profile = self
            .take_profile(&mut session)
            .await
            .with_answer(field, answer.clone());
        self.persist(&profile).await;

        let step_id = session.current_step().map(|s| s.id.clone());
        if let Some(index) = session.state.step_index() {
            session.steps = sequencer::replan(
                &session.steps,
                index,
                &profile,
                &self.inner.catalog,
                self.select_options(),
            );
        }
        session.profile = Some(profile);
        session.transcript.push((field.to_string(), answer));

        self.inner
            .deps
            .notifier
            .emit(TrackingEvent::QuestionAnswered {
                session_id: session.session_id,
                step_id,
                field: field.to_string(),
            });

        if let Some(index) = session.state.step_index() {
            self.schedule_advance(&mut session, index);
        }
        AnswerOutcome::Accepted
    }

    /// Fire the current step's action, then advance.
    pub async fn invoke_action(&self) {
        let mut session = self.inner.session.lock().await;
        let Some(step) = session.current_step().cloned() else {
            return;
        };

        if let Some(action) = step.action {
            match action {
                StepAction::OpenConcierge => self.inner.deps.signals.publish(Signal::OpenConcierge),
                StepAction::Navigate { ref path } => {
                    self.inner.deps.signals.publish(Signal::Navigate { path: path.clone() })
                }
            }
            info!(step_id = %step.id, action = action.name(), "Tour step action");

            let profile = self
                .take_profile(&mut session)
                .await
                .with_action(
                    &format!("tour:{}", action.name()),
                    self.inner.config.interaction_log_cap,
                );
            session.profile = Some(profile);

            self.inner.deps.notifier.emit(TrackingEvent::ActionInvoked {
                session_id: session.session_id,
                step_id: step.id.clone(),
                action: action.name().to_string(),
            });
        }

        self.navigate(&mut session, Navigation::Next).await;
    }

    /// Clear the completed flag so the tour is offered again.
    /// The profile is left alone.
    pub async fn restart(&self) {
        if let Err(e) = self.inner.deps.profiles.clear_completed_flag().await {
            warn!("Failed to clear tour completion flag: {}", e);
        }
    }

    /// Append a page view to the interaction log and persist it.
    pub async fn record_page_view(&self, path: &str) {
        let mut session = self.inner.session.lock().await;
        let profile = self
            .take_profile(&mut session)
            .await
            .with_page_view(path, self.inner.config.interaction_log_cap);
        self.persist(&profile).await;
        session.profile = Some(profile);
    }

    /// Append a named user action to the interaction log and persist it.
    pub async fn record_action(&self, action: &str) {
        let mut session = self.inner.session.lock().await;
        let profile = self
            .take_profile(&mut session)
            .await
            .with_action(action, self.inner.config.interaction_log_cap);
        self.persist(&profile).await;
        session.profile = Some(profile);
    }

    /// Component teardown: record time on the current step and stop timers
    /// without marking anything completed.
    pub async fn shutdown(&self) {
        let mut session = self.inner.session.lock().await;
        session.cancel_pending_advance();
        if session.state.is_open() {
            self.leave_step(&mut session);
            if let Some(ref profile) = session.profile {
                self.persist(profile).await;
            }
        }
        session.state = TourState::Closed;
        session.steps.clear();
        session.opened_at = None;
    }

    pub async fn state(&self) -> TourState {
        self.inner.session.lock().await.state
    }

    pub async fn view(&self) -> Option<TourView> {
        let session = self.inner.session.lock().await;
        self.view_of(&session)
    }

    pub async fn status(&self) -> TourStatus {
        let view = self.view().await;
        let completed = self.inner.deps.profiles.is_completed().await;
        TourStatus {
            open: view.is_some(),
            view,
            completed,
            offer_restart: completed,
        }
    }

    /// The in-memory profile, or the stored one if no session has loaded it.
    pub async fn profile(&self) -> Option<UserProfile> {
        let session = self.inner.session.lock().await;
        match session.profile {
            Some(ref profile) => Some(profile.clone()),
            None => self.inner.deps.profiles.load().await,
        }
    }

    /// Answers given since the tour was last opened.
    pub async fn transcript(&self) -> Vec<(String, Answer)> {
        self.inner.session.lock().await.transcript.clone()
    }

    /// Per-second elapsed counter for the current step.
    pub fn subscribe_ticks(&self) -> watch::Receiver<u64> {
        self.inner.ticks.subscribe()
    }

    fn select_options(&self) -> SelectOptions {
        SelectOptions::from(&self.inner.config)
    }

    fn view_of(&self, session: &Session) -> Option<TourView> {
        let index = session.state.step_index()?;
        let step = session.steps.get(index)?.clone();
        let total = session.steps.len();
        Some(TourView {
            session_id: session.session_id,
            step,
            index,
            total,
            progress_percent: progress_percent(index, total),
            elapsed_secs: *self.inner.ticks.borrow(),
        })
    }

    async fn take_profile(&self, session: &mut Session) -> UserProfile {
        match session.profile.take() {
            Some(profile) => profile,
            None => self.inner.deps.profiles.load_or_create().await,
        }
    }

    async fn persist(&self, profile: &UserProfile) {
        if let Err(e) = self.inner.deps.profiles.save(profile).await {
            warn!("Failed to persist user profile: {}", e);
        }
    }

    async fn navigate(&self, session: &mut Session, nav: Navigation) {
        session.cancel_pending_advance();
        let Some(from) = session.state.step_index() else {
            return;
        };

        match session.state.resolve(nav, session.steps.len()) {
            Resolution::Ignore => {}
            Resolution::Finish => self.finish(session, false).await,
            Resolution::MoveTo(to) => {
                let left = session.steps[from].id.clone();
                self.leave_step(session);
                session.state = TourState::Open { step_index: to };
                self.enter_step(session);

                debug!(from = %left, to, "Tour step changed");
                if nav == Navigation::Next {
                    self.inner.deps.notifier.emit(TrackingEvent::StepAdvanced {
                        session_id: session.session_id,
                        step_id: left,
                        step_index: from,
                    });
                }
                if let Some(ref profile) = session.profile {
                    self.persist(profile).await;
                }
            }
        }
    }

    async fn finish(&self, session: &mut Session, skipped: bool) {
        session.cancel_pending_advance();
        let Some(index) = session.state.step_index() else {
            return;
        };
        let Some(current) = session.steps.get(index).map(|s| s.id.clone()) else {
            return;
        };

        self.leave_step(session);
        let total_seconds = session
            .opened_at
            .take()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0);

        let mut profile = self.take_profile(session).await;
        if skipped {
            profile = profile.with_skipped_step(&current);
            self.inner.deps.notifier.emit(TrackingEvent::Skipped {
                session_id: session.session_id,
                step_id: current.clone(),
                step_index: index,
            });
        }
        let visited: Vec<String> = session.steps[..=index].iter().map(|s| s.id.clone()).collect();
        profile = profile
            .with_completed_steps(visited)
            .with_time_spent(total_seconds);
        self.persist(&profile).await;
        if let Err(e) = self.inner.deps.profiles.set_completed_flag().await {
            warn!("Failed to set tour completion flag: {}", e);
        }

        info!(
            session_id = %session.session_id,
            steps_completed = index + 1,
            total_seconds,
            skipped,
            "Guided tour closed"
        );
        self.inner.deps.notifier.emit(TrackingEvent::Completed {
            session_id: session.session_id,
            steps_completed: index + 1,
            total_seconds,
        });

        session.profile = Some(profile);
        session.state = TourState::Closed;
        session.steps.clear();
    }

    /// Start timing the current step and the on-screen ticker.
    fn enter_step(&self, session: &mut Session) {
        session.step_entered_at = Some(Instant::now());
        self.inner.ticks.send_replace(0);

        let ticks = Arc::clone(&self.inner.ticks);
        let period = self.inner.config.tick_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                ticks.send_modify(|n| *n += 1);
            }
        });
        // Replacing the guard aborts the previous step's ticker.
        session.ticker = Some(TaskGuard::new(handle));
    }

    /// Stop the ticker and record time on the current step, replacing any
    /// earlier value for it.
    fn leave_step(&self, session: &mut Session) {
        session.ticker = None;
        let Some(entered) = session.step_entered_at.take() else {
            return;
        };
        let Some(step_id) = session.current_step().map(|s| s.id.clone()) else {
            return;
        };
        let seconds = entered.elapsed().as_secs();
        if let Some(profile) = session.profile.take() {
            session.profile = Some(profile.with_step_time(&step_id, seconds));
        }
    }

    fn schedule_advance(&self, session: &mut Session, from_index: usize) {
        session.cancel_pending_advance();
        session.advance_seq += 1;
        let seq = session.advance_seq;

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.config.auto_advance_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                TourRuntime { inner }.run_scheduled_advance(seq).await;
            }
        });

        session.pending_advance = Some(PendingAdvance {
            seq,
            from_index,
            task: TaskGuard::new(handle),
        });
    }

    async fn run_scheduled_advance(&self, seq: u64) {
        let mut session = self.inner.session.lock().await;
        let from_index = match session.pending_advance.take() {
            Some(pending) if pending.seq == seq => {
                let from = pending.from_index;
                // This task is the one running; don't abort it.
                pending.task.detach();
                from
            }
            other => {
                session.pending_advance = other;
                return;
            }
        };

        if session.state.step_index() == Some(from_index) {
            self.navigate(&mut session, Navigation::Next).await;
        }
    }
}

/// Open the tour whenever an `OpenGuidedTour` signal arrives.
pub fn spawn_signal_listener(runtime: TourRuntime, bus: &SignalBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Signal::OpenGuidedTour) => {
                    runtime.open().await;
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Signal listener lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
