//! Stage strategy runners.
//!
//! A stage executes under one of three interchangeable coordination
//! strategies. All of them share the same contract: consume the stage
//! context and the previous stage's output, record every agent
//! invocation in the provenance store, and resolve to the stage's final
//! output — the empty string on total failure, never an error. The only
//! `Err` path out of a runner is infrastructure failure (a poisoned
//! provenance lock), which the orchestrator treats as pipeline-fatal.

pub mod sequential;
pub mod single;
pub mod vote;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bias::BiasConfig;
use crate::client::Completion;
use crate::dataset::DatasetContext;
use crate::events::{EventBus, PipelineEvent};
use crate::prompt;
use crate::provenance::{AgentRecord, ProvenanceResult, ProvenanceStore};
use crate::stage::Stage;

/// Coordination strategy for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 3 concurrent agents plus one aggregator.
    Vote,
    /// Generate → Refine → Finalize, strictly ordered.
    Sequential,
    /// One agent, one call.
    Single,
}

impl Strategy {
    /// Number of agent slots the strategy fills (excluding the vote
    /// aggregator).
    pub fn agent_slots(&self) -> usize {
        match self {
            Strategy::Vote | Strategy::Sequential => 3,
            Strategy::Single => 1,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Vote => write!(f, "vote"),
            Strategy::Sequential => write!(f, "sequential"),
            Strategy::Single => write!(f, "single"),
        }
    }
}

/// Everything a strategy runner needs for one stage execution.
pub struct StageContext<'a> {
    pub run_id: &'a str,
    pub stage: Stage,
    pub data: &'a DatasetContext,
    pub bias: &'a BiasConfig,
    /// Previous stage's output; `None` for stage 0.
    pub previous_output: Option<&'a str>,
    /// Model identifier recorded with every invocation.
    pub model: &'a str,
    pub temperature: f32,
    pub client: &'a dyn Completion,
    pub provenance: &'a ProvenanceStore,
    pub events: &'a EventBus,
}

impl StageContext<'_> {
    /// Bias injection for an agent slot, when this slot was selected.
    pub fn injection_for(&self, agent_num: u8) -> Option<&'static str> {
        if self.bias.applies_to(self.stage, agent_num) {
            Some(self.bias.kind.injection(self.data.dataset))
        } else {
            None
        }
    }

    /// Externally built generation prompt for an agent slot.
    pub fn generation_prompt(&self, agent_num: u8) -> String {
        match self.stage {
            Stage::Title => {
                prompt::title_prompt(self.data, agent_num, self.injection_for(agent_num))
            }
            Stage::Article => prompt::article_prompt(
                self.data,
                self.previous_output.unwrap_or(""),
                agent_num,
                self.injection_for(agent_num),
            ),
            Stage::Visualization => prompt::chart_prompt(
                self.data,
                self.bias.chart_level(),
                self.previous_output,
                None,
            ),
        }
    }

    /// Input text the stage prompts derive from, when non-empty.
    pub fn input(&self) -> Option<String> {
        self.previous_output
            .filter(|output| !output.is_empty())
            .map(str::to_string)
    }

    /// Store a pending record and announce the invocation.
    pub fn record_pending(&self, record: AgentRecord) -> ProvenanceResult<()> {
        self.events.publish(PipelineEvent::AgentPending {
            run_id: self.run_id.to_string(),
            node_id: record.node_id.to_string(),
            agent_name: record.agent_name.clone(),
            stage: record.stage,
            timestamp: chrono::Utc::now(),
        });
        self.provenance.record(record)
    }

    /// Replace the pending record with its completed form.
    pub fn record_completed(&self, record: AgentRecord) -> ProvenanceResult<()> {
        self.events.publish(PipelineEvent::AgentCompleted {
            run_id: self.run_id.to_string(),
            node_id: record.node_id.to_string(),
            agent_name: record.agent_name.clone(),
            stage: record.stage,
            output_chars: record.output.as_deref().map(str::len).unwrap_or(0),
            timestamp: chrono::Utc::now(),
        });
        self.provenance.record(record)
    }

    /// Emit a free-text progress line.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(run_id = self.run_id, stage = %self.stage, "{message}");
        self.events.publish(PipelineEvent::Progress {
            run_id: self.run_id.to_string(),
            message,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Run one stage under the given strategy.
pub async fn run_stage(strategy: Strategy, ctx: &StageContext<'_>) -> ProvenanceResult<String> {
    match strategy {
        Strategy::Vote => vote::run(ctx).await,
        Strategy::Sequential => sequential::run(ctx).await,
        Strategy::Single => single::run(ctx).await,
    }
}
