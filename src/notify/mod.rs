//! External notifiers — analytics and action tracking for tour milestones.
//!
//! Delivery is fire-and-forget: the runtime queues a `TrackingEvent` and
//! moves on. A background task hands each event to the analytics sink and
//! the action tracker in order; sink failures are logged and dropped.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::NotifyError;

pub use http::HttpAnalyticsSink;

/// A tour milestone worth reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    Opened {
        session_id: Uuid,
        total_steps: usize,
    },
    StepAdvanced {
        session_id: Uuid,
        step_id: String,
        step_index: usize,
    },
    QuestionAnswered {
        session_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        step_id: Option<String>,
        field: String,
    },
    ActionInvoked {
        session_id: Uuid,
        step_id: String,
        action: String,
    },
    Skipped {
        session_id: Uuid,
        step_id: String,
        step_index: usize,
    },
    Completed {
        session_id: Uuid,
        steps_completed: usize,
        total_seconds: u64,
    },
}

/// Which analytics call an event maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsCall {
    Click(&'static str),
    FormSubmit(&'static str),
}

impl TrackingEvent {
    pub fn analytics_call(&self) -> AnalyticsCall {
        match self {
            Self::Opened { .. } => AnalyticsCall::Click("guided-tour-open"),
            Self::StepAdvanced { .. } => AnalyticsCall::Click("guided-tour-next"),
            Self::QuestionAnswered { .. } => AnalyticsCall::FormSubmit("guided-tour-question"),
            Self::ActionInvoked { .. } => AnalyticsCall::Click("guided-tour-action"),
            Self::Skipped { .. } => AnalyticsCall::Click("guided-tour-skip"),
            Self::Completed { .. } => AnalyticsCall::FormSubmit("guided-tour-complete"),
        }
    }

    /// Action name reported to the action tracker.
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::Opened { .. } => "guided_tour_opened",
            Self::StepAdvanced { .. } => "guided_tour_step_advanced",
            Self::QuestionAnswered { .. } => "guided_tour_question_answered",
            Self::ActionInvoked { .. } => "guided_tour_action_invoked",
            Self::Skipped { .. } => "guided_tour_skipped",
            Self::Completed { .. } => "guided_tour_completed",
        }
    }
}

/// Click and form-submit analytics collector.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    fn name(&self) -> &str;

    async fn record_click(
        &self,
        cta_id: &str,
        context: &serde_json::Value,
    ) -> Result<(), NotifyError>;

    async fn record_form_submit(
        &self,
        form_id: &str,
        context: &serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// General user-action event stream.
#[async_trait]
pub trait ActionTracker: Send + Sync {
    fn name(&self) -> &str;

    async fn record_action(
        &self,
        action_name: &str,
        page_path: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), NotifyError>;
}

/// Sink that writes events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record_click(
        &self,
        cta_id: &str,
        context: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(cta_id, %context, "Analytics click");
        Ok(())
    }

    async fn record_form_submit(
        &self,
        form_id: &str,
        context: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        info!(form_id, %context, "Analytics form submit");
        Ok(())
    }
}

#[async_trait]
impl ActionTracker for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn record_action(
        &self,
        action_name: &str,
        page_path: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        debug!(action_name, page_path, %metadata, "User action");
        Ok(())
    }
}

/// Handle for queueing tracking events.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<TrackingEvent>,
}

impl Notifier {
    /// Start the delivery task and return a handle to it.
    pub fn spawn(
        analytics: Arc<dyn AnalyticsSink>,
        tracker: Arc<dyn ActionTracker>,
        page_path: impl Into<String>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<TrackingEvent>();
        let page_path = page_path.into();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                deliver(analytics.as_ref(), tracker.as_ref(), &page_path, &event).await;
            }
            debug!("Notifier queue closed");
        });

        (Self { tx }, handle)
    }

    /// Queue an event. Never blocks and never fails the caller.
    pub fn emit(&self, event: TrackingEvent) {
        if self.tx.send(event).is_err() {
            debug!("Notifier task gone, dropping tracking event");
        }
    }
}

async fn deliver(
    analytics: &dyn AnalyticsSink,
    tracker: &dyn ActionTracker,
    page_path: &str,
    event: &TrackingEvent,
) {
    let context = match serde_json::to_value(event) {
        Ok(v) => v,
        Err(e) => {
            warn!("Failed to serialize tracking event: {}", e);
            return;
        }
    };

    let analytics_call = async {
        match event.analytics_call() {
            AnalyticsCall::Click(cta_id) => analytics.record_click(cta_id, &context).await,
            AnalyticsCall::FormSubmit(form_id) => {
                analytics.record_form_submit(form_id, &context).await
            }
        }
    };
    let tracker_call = tracker.record_action(event.action_name(), page_path, &context);

    let (analytics_result, tracker_result) = futures::join!(analytics_call, tracker_call);
    if let Err(e) = analytics_result {
        warn!(sink = analytics.name(), "Analytics call failed: {}", e);
    }
    if let Err(e) = tracker_result {
        warn!(sink = tracker.name(), "Action tracking failed: {}", e);
    }
}
