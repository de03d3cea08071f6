//! End-to-end pipeline runs against deterministic stub clients.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use paradox_newsroom::{
    Completion, CompletionError, Dataset, NodeId, PipelineEvent, RunConfig, Stage, Strategy,
    WorkflowOrchestrator, WorkflowPhase,
};

/// Echoes the prompt length, so outputs are pure functions of the
/// prompts that produced them.
struct EchoClient;

#[async_trait]
impl Completion for EchoClient {
    async fn complete(
        &self,
        prompt: &str,
        _temperature: f32,
        _agent_label: &str,
    ) -> Result<String, CompletionError> {
        Ok(format!("OUT:{}", prompt.len()))
    }
}

/// Echoes like [`EchoClient`] but fails one specific agent label.
struct LabelFailClient(&'static str);

#[async_trait]
impl Completion for LabelFailClient {
    async fn complete(
        &self,
        prompt: &str,
        _temperature: f32,
        agent_label: &str,
    ) -> Result<String, CompletionError> {
        if agent_label == self.0 {
            Err(CompletionError::Transport("injected failure".into()))
        } else {
            Ok(format!("OUT:{}", prompt.len()))
        }
    }
}

/// Fails every call.
struct FailingClient;

#[async_trait]
impl Completion for FailingClient {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: f32,
        _agent_label: &str,
    ) -> Result<String, CompletionError> {
        Err(CompletionError::Transport("injected failure".into()))
    }
}

fn config(dataset: Dataset, strategies: [Strategy; 3]) -> RunConfig {
    RunConfig::new(dataset).with_strategies(strategies)
}

#[tokio::test]
async fn scenario_all_single_baseball() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(EchoClient));
    let config = config(
        Dataset::Baseball,
        [Strategy::Single, Strategy::Single, Strategy::Single],
    );

    let report = orchestrator.run(&config).await.unwrap();

    assert!(report.title.as_deref().unwrap().starts_with("OUT:"));
    assert!(report.article.as_deref().unwrap().starts_with("OUT:"));
    assert!(!report.visualization.as_deref().unwrap().is_empty());

    // One record per stage, nothing else.
    let provenance = orchestrator.provenance();
    assert_eq!(provenance.len().unwrap(), 3);
    for stage in Stage::all() {
        let record = provenance.get(&NodeId::agent(stage, 1)).unwrap().unwrap();
        assert!(record.output.is_some());
    }

    assert_eq!(orchestrator.phase().await, WorkflowPhase::Complete);
}

#[tokio::test]
async fn scenario_vote_stage_with_one_failing_agent() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(LabelFailClient("VotingAgent2")));
    let config = config(
        Dataset::Kidney,
        [Strategy::Single, Strategy::Vote, Strategy::Single],
    );

    let report = orchestrator.run(&config).await.unwrap();

    // The aggregator still produced the article from 2 real + 1 empty vote.
    let article = report.article.unwrap();
    assert!(article.starts_with("OUT:"));

    let provenance = orchestrator.provenance();
    let stage1 = provenance.stage_records(Stage::Article).unwrap();
    assert_eq!(stage1.len(), 4);

    let failed = provenance
        .get(&NodeId::agent(Stage::Article, 2))
        .unwrap()
        .unwrap();
    assert!(failed.output.is_none());

    let aggregator = provenance
        .get(&NodeId::aggregator(Stage::Article))
        .unwrap()
        .unwrap();
    assert_eq!(aggregator.output.as_deref(), Some(article.as_str()));
}

#[tokio::test(start_paused = true)]
async fn scenario_exhausted_chart_retries_fall_back() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(FailingClient));
    let config = config(
        Dataset::Baseball,
        [Strategy::Single, Strategy::Single, Strategy::Single],
    );

    let report = orchestrator.run(&config).await.unwrap();

    // Text stages fail visibly empty; the chart stage never does.
    assert_eq!(report.title.as_deref(), Some(""));
    assert_eq!(report.article.as_deref(), Some(""));

    let spec: Value = serde_json::from_str(report.visualization.as_deref().unwrap()).unwrap();
    assert_eq!(spec["mark"], "bar");
    assert!(!spec["data"]["values"].as_array().unwrap().is_empty());
    assert_eq!(spec["$schema"], "https://vega.github.io/schema/vega-lite/v5.json");
}

#[tokio::test]
async fn events_arrive_in_stage_order() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(EchoClient));
    let config = config(
        Dataset::Kidney,
        [Strategy::Single, Strategy::Single, Strategy::Single],
    );

    let mut receiver = orchestrator.subscribe();
    orchestrator.run(&config).await.unwrap();

    let mut saw_pending = [false; 3];
    let mut completed_stages = Vec::new();
    loop {
        match receiver.recv().await.unwrap() {
            PipelineEvent::AgentPending { stage, .. } => {
                saw_pending[stage.index()] = true;
            }
            PipelineEvent::AgentCompleted { stage, .. } => {
                // Pending always precedes completion for a stage's agent.
                assert!(saw_pending[stage.index()]);
            }
            PipelineEvent::StageCompleted { stage, .. } => {
                completed_stages.push(stage.index());
            }
            PipelineEvent::RunCompleted { .. } => break,
            _ => {}
        }
    }
    assert_eq!(completed_stages, vec![0, 1, 2]);
}

#[tokio::test]
async fn rerun_replaces_previous_provenance() {
    let orchestrator = WorkflowOrchestrator::new(Arc::new(EchoClient));

    let vote_config = config(
        Dataset::Baseball,
        [Strategy::Vote, Strategy::Single, Strategy::Single],
    );
    orchestrator.run(&vote_config).await.unwrap();
    assert_eq!(orchestrator.provenance().len().unwrap(), 6);

    let single_config = config(
        Dataset::Baseball,
        [Strategy::Single, Strategy::Single, Strategy::Single],
    );
    orchestrator.run(&single_config).await.unwrap();
    // The fresh run discarded the earlier vote records.
    assert_eq!(orchestrator.provenance().len().unwrap(), 3);

    orchestrator.reset().await.unwrap();
    assert_eq!(orchestrator.phase().await, WorkflowPhase::Idle);
    assert!(orchestrator.provenance().is_empty().unwrap());
}
