//! Pipeline orchestrator: drives the three stages in sequence.
//!
//! The orchestrator is single-threaded cooperative; the only true
//! parallelism lives inside a Vote strategy's fan-out. One run at a time
//! is enforced with a reentrancy flag rather than cancellation — an
//! in-flight completion call cannot be aborted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info};
use uuid::Uuid;

use crate::client::Completion;
use crate::config::RunConfig;
use crate::dataset::{DatasetContext, DatasetError};
use crate::events::{EventBus, PipelineEvent, SharedEventBus};
use crate::provenance::{ProvenanceError, ProvenanceStore, SharedProvenance};
use crate::stage::{Stage, StageResult};
use crate::strategy::{run_stage, StageContext};

/// Error type for orchestrator operations
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("a pipeline run is already in flight")]
    AlreadyRunning,

    #[error("failed to load dataset context: {0}")]
    ContextLoad(#[from] DatasetError),

    #[error(transparent)]
    Provenance(#[from] ProvenanceError),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Observable lifecycle of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowPhase {
    Idle,
    LoadingContext,
    StageRunning(Stage),
    Complete,
    /// Absorbing failure state; already-computed stage outputs are
    /// retained and stay readable.
    Failed(String),
}

/// Central driver for one three-stage pipeline at a time.
pub struct WorkflowOrchestrator {
    client: Arc<dyn Completion>,
    provenance: SharedProvenance,
    events: SharedEventBus,
    phase: RwLock<WorkflowPhase>,
    result: RwLock<StageResult>,
    running: AtomicBool,
}

impl WorkflowOrchestrator {
    pub fn new(client: Arc<dyn Completion>) -> Self {
        Self {
            client,
            provenance: ProvenanceStore::new().shared(),
            events: EventBus::new().shared(),
            phase: RwLock::new(WorkflowPhase::Idle),
            result: RwLock::new(StageResult::default()),
            running: AtomicBool::new(false),
        }
    }

    /// Handle to the provenance store for inspection.
    pub fn provenance(&self) -> SharedProvenance {
        self.provenance.clone()
    }

    /// Handle to the event bus.
    pub fn events(&self) -> SharedEventBus {
        self.events.clone()
    }

    /// Subscribe to pipeline events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> WorkflowPhase {
        self.phase.read().await.clone()
    }

    /// Stage outputs produced so far.
    pub async fn result(&self) -> StageResult {
        self.result.read().await.clone()
    }

    /// Run the whole pipeline once.
    ///
    /// Rejects reentrant calls; completed stage outputs survive a
    /// failure and remain readable through [`Self::result`].
    pub async fn run(&self, config: &RunConfig) -> OrchestratorResult<StageResult> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyRunning);
        }

        let run_id = Uuid::new_v4().to_string();
        let outcome = self.run_inner(&run_id, config).await;

        match &outcome {
            Ok(_) => {
                *self.phase.write().await = WorkflowPhase::Complete;
                self.events.publish(PipelineEvent::RunCompleted {
                    run_id: run_id.clone(),
                    timestamp: Utc::now(),
                });
                info!(run_id, "Pipeline run complete");
            }
            Err(e) => {
                *self.phase.write().await = WorkflowPhase::Failed(e.to_string());
                self.events.publish(PipelineEvent::RunFailed {
                    run_id: run_id.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                error!(run_id, "Pipeline run failed: {e}");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_inner(&self, run_id: &str, config: &RunConfig) -> OrchestratorResult<StageResult> {
        // Fresh run: previous outputs and records are discarded.
        self.provenance.clear()?;
        *self.result.write().await = StageResult::default();

        self.events.publish(PipelineEvent::RunStarted {
            run_id: run_id.to_string(),
            dataset: config.dataset,
            strategies: config.strategies,
            timestamp: Utc::now(),
        });

        *self.phase.write().await = WorkflowPhase::LoadingContext;
        self.progress(run_id, format!("Loading {} dataset...", config.dataset));
        let data = DatasetContext::load(config.dataset).await?;
        self.events.publish(PipelineEvent::ContextLoaded {
            run_id: run_id.to_string(),
            dataset: config.dataset,
            timestamp: Utc::now(),
        });

        for stage in Stage::all() {
            let strategy = config.strategies[stage.index()];
            *self.phase.write().await = WorkflowPhase::StageRunning(stage);
            self.events.publish(PipelineEvent::StageStarted {
                run_id: run_id.to_string(),
                stage,
                strategy,
                timestamp: Utc::now(),
            });
            self.progress(
                run_id,
                format!("Stage {}: {} ({strategy})...", stage.index(), stage.name()),
            );

            let previous = {
                let result = self.result.read().await;
                stage
                    .index()
                    .checked_sub(1)
                    .and_then(|i| result.output(Stage::all()[i]).map(str::to_string))
            };

            let ctx = StageContext {
                run_id,
                stage,
                data: &data,
                bias: &config.bias,
                previous_output: previous.as_deref(),
                model: &config.completion.model,
                temperature: config.completion.temperature,
                client: self.client.as_ref(),
                provenance: &self.provenance,
                events: &self.events,
            };
            let output = run_stage(strategy, &ctx).await?;

            let output_preview: String = output.chars().take(100).collect();
            self.result.write().await.set_output(stage, output);
            self.events.publish(PipelineEvent::StageCompleted {
                run_id: run_id.to_string(),
                stage,
                output_preview,
                timestamp: Utc::now(),
            });
            self.progress(run_id, format!("Stage {} complete", stage.index()));
        }

        Ok(self.result.read().await.clone())
    }

    /// Return to `Idle`, dropping all provenance records and outputs.
    pub async fn reset(&self) -> OrchestratorResult<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyRunning);
        }
        self.provenance.clear()?;
        *self.result.write().await = StageResult::default();
        *self.phase.write().await = WorkflowPhase::Idle;
        Ok(())
    }

    fn progress(&self, run_id: &str, message: impl Into<String>) {
        let message = message.into();
        info!(run_id, "{message}");
        self.events.publish(PipelineEvent::Progress {
            run_id: run_id.to_string(),
            message,
            timestamp: Utc::now(),
        });
    }
}
