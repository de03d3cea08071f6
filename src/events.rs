//! Event bus for pipeline observers.
//!
//! The core publishes one event per agent state change plus coarse
//! run/stage transitions and free-text progress lines; a UI or test
//! harness subscribes without the core knowing the consumer's identity.
//! Publishing with no subscribers is not an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::dataset::Dataset;
use crate::stage::Stage;
use crate::strategy::Strategy;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// All pipeline events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A pipeline run was started
    RunStarted {
        run_id: String,
        dataset: Dataset,
        strategies: [Strategy; 3],
        timestamp: DateTime<Utc>,
    },

    /// The dataset context finished loading
    ContextLoaded {
        run_id: String,
        dataset: Dataset,
        timestamp: DateTime<Utc>,
    },

    /// A stage began executing under its configured strategy
    StageStarted {
        run_id: String,
        stage: Stage,
        strategy: Strategy,
        timestamp: DateTime<Utc>,
    },

    /// An agent invocation is about to issue its completion call
    AgentPending {
        run_id: String,
        node_id: String,
        agent_name: String,
        stage: Stage,
        timestamp: DateTime<Utc>,
    },

    /// An agent invocation returned successfully
    AgentCompleted {
        run_id: String,
        node_id: String,
        agent_name: String,
        stage: Stage,
        output_chars: usize,
        timestamp: DateTime<Utc>,
    },

    /// A stage resolved with its final output
    StageCompleted {
        run_id: String,
        stage: Stage,
        output_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The whole pipeline completed
    RunCompleted {
        run_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The pipeline entered the failed state
    RunFailed {
        run_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Free-text progress line
    Progress {
        run_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::RunStarted { .. } => "run_started",
            PipelineEvent::ContextLoaded { .. } => "context_loaded",
            PipelineEvent::StageStarted { .. } => "stage_started",
            PipelineEvent::AgentPending { .. } => "agent_pending",
            PipelineEvent::AgentCompleted { .. } => "agent_completed",
            PipelineEvent::StageCompleted { .. } => "stage_completed",
            PipelineEvent::RunCompleted { .. } => "run_completed",
            PipelineEvent::RunFailed { .. } => "run_failed",
            PipelineEvent::Progress { .. } => "progress",
        }
    }

    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PipelineEvent::RunStarted { timestamp, .. } => *timestamp,
            PipelineEvent::ContextLoaded { timestamp, .. } => *timestamp,
            PipelineEvent::StageStarted { timestamp, .. } => *timestamp,
            PipelineEvent::AgentPending { timestamp, .. } => *timestamp,
            PipelineEvent::AgentCompleted { timestamp, .. } => *timestamp,
            PipelineEvent::StageCompleted { timestamp, .. } => *timestamp,
            PipelineEvent::RunCompleted { timestamp, .. } => *timestamp,
            PipelineEvent::RunFailed { timestamp, .. } => *timestamp,
            PipelineEvent::Progress { timestamp, .. } => *timestamp,
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> &str {
        match self {
            PipelineEvent::RunStarted { run_id, .. } => run_id,
            PipelineEvent::ContextLoaded { run_id, .. } => run_id,
            PipelineEvent::StageStarted { run_id, .. } => run_id,
            PipelineEvent::AgentPending { run_id, .. } => run_id,
            PipelineEvent::AgentCompleted { run_id, .. } => run_id,
            PipelineEvent::StageCompleted { run_id, .. } => run_id,
            PipelineEvent::RunCompleted { run_id, .. } => run_id,
            PipelineEvent::RunFailed { run_id, .. } => run_id,
            PipelineEvent::Progress { run_id, .. } => run_id,
        }
    }

    /// Get the stage if this event is stage-scoped
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineEvent::StageStarted { stage, .. } => Some(*stage),
            PipelineEvent::AgentPending { stage, .. } => Some(*stage),
            PipelineEvent::AgentCompleted { stage, .. } => Some(*stage),
            PipelineEvent::StageCompleted { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Broadcast-backed event bus
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: PipelineEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "Event published"),
            // No receivers is fine; the run proceeds regardless.
            Err(_) => debug!(event_type, "Event published (no receivers)"),
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
