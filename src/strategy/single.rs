//! Single strategy: one agent, one call.

use tracing::warn;

use crate::provenance::{AgentRecord, NodeId, ProvenanceResult};
use crate::stage::Stage;
use crate::viz;

use super::StageContext;

/// Run the single-agent strategy for one stage.
pub async fn run(ctx: &StageContext<'_>) -> ProvenanceResult<String> {
    ctx.log("[Single] Running single agent...");
    let chart_stage = ctx.stage == Stage::Visualization;

    let agent_name = if chart_stage {
        "Single Agent (Viz)"
    } else {
        "Single Agent"
    };
    let prompt = ctx.generation_prompt(1);
    let record = AgentRecord::pending(
        NodeId::agent(ctx.stage, 1),
        agent_name,
        ctx.model,
        prompt.as_str(),
        ctx.input(),
    );
    ctx.record_pending(record.clone())?;

    if chart_stage {
        let output = viz::generate_chart(ctx, "SingleAgent").await;
        ctx.record_completed(record.completed(output.clone()))?;
        return Ok(output);
    }

    match ctx.client.complete(&prompt, ctx.temperature, "SingleAgent").await {
        Ok(content) => {
            ctx.record_completed(record.completed(content.clone()))?;
            Ok(content)
        }
        Err(error) => {
            warn!(%error, "Single agent failed, stage resolves empty");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{EchoClient, FailingClient, Harness};
    use super::*;
    use crate::dataset::Dataset;

    #[tokio::test]
    async fn test_success_records_one_invocation() {
        let harness = Harness::new(Dataset::Baseball);
        let client = EchoClient;
        let ctx = harness.ctx(Stage::Title, &client, None);

        let output = run(&ctx).await.unwrap();
        assert!(output.starts_with("OUT:"));

        let records = harness.provenance.stage_records(Stage::Title).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_name, "Single Agent");
    }

    #[tokio::test]
    async fn test_failure_resolves_empty_with_pending_record() {
        let harness = Harness::new(Dataset::Kidney);
        let client = FailingClient;
        let ctx = harness.ctx(Stage::Article, &client, Some("A title"));

        let output = run(&ctx).await.unwrap();
        assert_eq!(output, "");

        let record = harness
            .provenance
            .get(&NodeId::agent(Stage::Article, 1))
            .unwrap()
            .unwrap();
        assert!(record.output.is_none());
        assert_eq!(record.input.as_deref(), Some("A title"));
    }
}
