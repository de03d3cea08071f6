//! Multi-strategy agent orchestration for a three-stage report pipeline.
//!
//! This library demonstrates how multi-agent LLM coordination can
//! introduce or mitigate bias while generating a title, an article, and
//! a chart specification over one of two canned datasets exhibiting
//! Simpson's Paradox.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  WorkflowOrchestrator                      │
//! │  Idle → LoadingContext → Stage 0 → 1 → 2 → Complete        │
//! │  (Failed absorbs from any running state)                   │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │ one strategy per stage
//!           ┌───────────────┼───────────────┐
//!           ▼               ▼               ▼
//!     ┌───────────┐   ┌────────────┐   ┌──────────┐
//!     │   Vote    │   │ Sequential │   │  Single  │
//!     │ 3 ∥ + agg │   │ gen→ref→fin│   │  1 call  │
//!     └─────┬─────┘   └─────┬──────┘   └────┬─────┘
//!           └───────────────┼────────────────┘
//!                           ▼
//!              Completion client (one POST per agent)
//!              Provenance store (replace-by-key records)
//!              Event bus (pending/completed + progress)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use paradox_newsroom::{
//!     Dataset, HttpCompletionClient, RunConfig, Strategy, WorkflowOrchestrator,
//! };
//!
//! let config = RunConfig::new(Dataset::Kidney)
//!     .with_strategies([Strategy::Vote, Strategy::Sequential, Strategy::Single]);
//! let client = Arc::new(HttpCompletionClient::new(&config.completion)?);
//! let orchestrator = WorkflowOrchestrator::new(client);
//! let report = orchestrator.run(&config).await?;
//! ```

pub mod bias;
pub mod client;
pub mod config;
pub mod dataset;
pub mod events;
pub mod judge;
pub mod orchestrator;
pub mod prompt;
pub mod provenance;
pub mod sanitize;
pub mod stage;
pub mod strategy;
pub mod viz;

// Re-export key configuration types
pub use bias::{BiasAssignment, BiasConfig, BiasKind, BiasLevel};
pub use config::{CompletionConfig, RunConfig};
pub use dataset::{Dataset, DatasetContext, DatasetError};

// Re-export the completion boundary
pub use client::{Completion, CompletionError, HttpCompletionClient};

// Re-export core pipeline types
pub use events::{EventBus, PipelineEvent, SharedEventBus};
pub use orchestrator::{OrchestratorError, WorkflowOrchestrator, WorkflowPhase};
pub use provenance::{
    AgentRecord, AgentRole, NodeId, ProvenanceError, ProvenanceStore, SharedProvenance,
};
pub use stage::{Stage, StageResult};
pub use strategy::{run_stage, StageContext, Strategy};

// Re-export the judging collaborator
pub use judge::{judge_report, JudgeError, JudgeVerdict, ScoreBreakdown};
