//! Vote strategy: 3 concurrent agents plus one aggregator.

use futures::future::join_all;
use tracing::warn;

use crate::prompt;
use crate::provenance::{AgentRecord, NodeId, ProvenanceError, ProvenanceResult};
use crate::stage::Stage;
use crate::viz;

use super::StageContext;

/// Run the vote strategy for one stage.
///
/// The three branches are independent: a failing branch contributes an
/// empty vote and neither blocks nor cancels its siblings. Aggregation
/// never starts before all three have settled. If the aggregator call
/// fails, the stage resolves to the empty string while the branch
/// records stay visible in provenance.
pub async fn run(ctx: &StageContext<'_>) -> ProvenanceResult<String> {
    ctx.log("[Voting] Running 3 agents in parallel...");
    let chart_stage = ctx.stage == Stage::Visualization;

    let branches = (1..=3u8).map(|agent_num| async move {
        let node_id = NodeId::agent(ctx.stage, agent_num);
        let agent_name = if chart_stage {
            format!("Voting Agent {agent_num} (Viz)")
        } else {
            format!("Voting Agent {agent_num}")
        };
        let label = format!("VotingAgent{agent_num}");
        let prompt = ctx.generation_prompt(agent_num);
        let record =
            AgentRecord::pending(node_id, agent_name, ctx.model, prompt.as_str(), ctx.input());
        ctx.record_pending(record.clone())?;

        if chart_stage {
            // Chart generation carries its own bounded retry and cannot fail.
            let output = viz::generate_chart(ctx, &label).await;
            ctx.record_completed(record.completed(output.clone()))?;
            return Ok::<String, ProvenanceError>(output);
        }

        match ctx.client.complete(&prompt, ctx.temperature, &label).await {
            Ok(content) => {
                ctx.record_completed(record.completed(content.clone()))?;
                Ok(content)
            }
            Err(error) => {
                warn!(agent = %label, %error, "Vote branch failed, contributing empty vote");
                Ok(String::new())
            }
        }
    });

    let votes: Vec<String> = join_all(branches)
        .await
        .into_iter()
        .collect::<ProvenanceResult<_>>()?;

    ctx.log("[Voting] All 3 agents completed, aggregating...");

    let aggregator_prompt = prompt::aggregator_prompt(ctx.stage, &votes);
    let aggregator_name = if chart_stage {
        "Voting Aggregator (Viz)"
    } else {
        "Voting Aggregator"
    };
    let record = AgentRecord::pending(
        NodeId::aggregator(ctx.stage),
        aggregator_name,
        ctx.model,
        aggregator_prompt.as_str(),
        Some(votes.join("\n---\n")),
    );
    ctx.record_pending(record.clone())?;

    match ctx
        .client
        .complete(&aggregator_prompt, ctx.temperature, "VotingAggregator")
        .await
    {
        Ok(content) => {
            ctx.record_completed(record.completed(content.clone()))?;
            Ok(content)
        }
        Err(error) => {
            warn!(%error, "Aggregator failed, stage resolves empty");
            Ok(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{EchoClient, Harness, LabelFailClient};
    use super::*;
    use crate::dataset::Dataset;

    #[tokio::test]
    async fn test_all_branches_succeed() {
        let harness = Harness::new(Dataset::Baseball);
        let client = EchoClient;
        let ctx = harness.ctx(Stage::Title, &client, None);

        let output = run(&ctx).await.unwrap();
        assert!(output.starts_with("OUT:"));
        assert_eq!(harness.provenance.stage_records(Stage::Title).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_one_failing_branch_still_aggregates() {
        let harness = Harness::new(Dataset::Kidney);
        let client = LabelFailClient("VotingAgent2");
        let ctx = harness.ctx(Stage::Article, &client, Some("A title"));

        let output = run(&ctx).await.unwrap();
        assert!(!output.is_empty());

        let records = harness.provenance.stage_records(Stage::Article).unwrap();
        assert_eq!(records.len(), 4);

        let agent2 = harness
            .provenance
            .get(&NodeId::agent(Stage::Article, 2))
            .unwrap()
            .unwrap();
        assert!(agent2.output.is_none());
        assert!(!agent2.prompt.is_empty());
    }

    #[tokio::test]
    async fn test_aggregator_failure_keeps_branch_records() {
        let harness = Harness::new(Dataset::Baseball);
        let client = LabelFailClient("VotingAggregator");
        let ctx = harness.ctx(Stage::Title, &client, None);

        let output = run(&ctx).await.unwrap();
        assert_eq!(output, "");

        for agent_num in 1..=3 {
            let record = harness
                .provenance
                .get(&NodeId::agent(Stage::Title, agent_num))
                .unwrap()
                .unwrap();
            assert!(record.output.as_deref().is_some_and(|o| !o.is_empty()));
        }
        // The aggregator's own invocation stays visible in pending form.
        let aggregator = harness
            .provenance
            .get(&NodeId::aggregator(Stage::Title))
            .unwrap()
            .unwrap();
        assert!(aggregator.output.is_none());
    }

    #[tokio::test]
    async fn test_chart_stage_runs_three_chart_agents() {
        let harness = Harness::new(Dataset::Kidney);
        let client = EchoClient;
        let ctx = harness.ctx(Stage::Visualization, &client, Some("the article"));

        let output = run(&ctx).await.unwrap();
        assert!(!output.is_empty());

        let records = harness
            .provenance
            .stage_records(Stage::Visualization)
            .unwrap();
        assert_eq!(records.len(), 4);
        assert!(records[0].agent_name.contains("(Viz)"));
    }
}
