//! Sequential strategy: Generate → Refine → Finalize with graceful
//! degradation at each boundary.

use tracing::warn;

use crate::prompt;
use crate::provenance::{AgentRecord, NodeId, ProvenanceResult};
use crate::sanitize::strip_code_fences;
use crate::stage::Stage;
use crate::viz;

use super::StageContext;

/// Run the sequential strategy for one stage.
///
/// Three agents run strictly in order. If generation fails the stage
/// returns empty immediately and the later agents are never invoked; if
/// refinement or finalization fails, the stage falls back to the best
/// output produced so far.
pub async fn run(ctx: &StageContext<'_>) -> ProvenanceResult<String> {
    ctx.log("[Sequential] Running 3 agents sequentially...");
    let chart_stage = ctx.stage == Stage::Visualization;

    // Agent 1: Generate
    let prompt1 = ctx.generation_prompt(1);
    let record1 = AgentRecord::pending(
        NodeId::agent(ctx.stage, 1),
        "Sequential Agent 1 (Generate)",
        ctx.model,
        prompt1.as_str(),
        ctx.input(),
    );
    ctx.record_pending(record1.clone())?;

    let mut output = if chart_stage {
        let chart = viz::generate_chart(ctx, "SeqAgent1-Generate").await;
        ctx.record_completed(record1.completed(chart.clone()))?;
        chart
    } else {
        match ctx
            .client
            .complete(&prompt1, ctx.temperature, "SeqAgent1-Generate")
            .await
        {
            Ok(content) => {
                ctx.record_completed(record1.completed(content.clone()))?;
                content
            }
            Err(error) => {
                // Nothing to refine; the stage gives up immediately.
                warn!(%error, "Generation failed, stage resolves empty");
                return Ok(String::new());
            }
        }
    };

    // Agent 2: Refine
    let prompt2 = prompt::refine_prompt(ctx.stage, &output);
    let record2 = AgentRecord::pending(
        NodeId::agent(ctx.stage, 2),
        "Sequential Agent 2 (Refine)",
        ctx.model,
        prompt2.as_str(),
        Some(output.clone()),
    );
    ctx.record_pending(record2.clone())?;

    match ctx
        .client
        .complete(&prompt2, ctx.temperature, "SeqAgent2-Refine")
        .await
    {
        Ok(content) => {
            let content = if chart_stage {
                strip_code_fences(&content)
            } else {
                content
            };
            ctx.record_completed(record2.completed(content.clone()))?;
            output = content;
        }
        Err(error) => {
            // Partial credit: refinement failure does not discard
            // generation, but the chain stops here.
            warn!(%error, "Refinement failed, keeping generated output");
            return Ok(output);
        }
    }

    // Agent 3: Finalize
    let prompt3 = prompt::finalize_prompt(ctx.stage, &output);
    let record3 = AgentRecord::pending(
        NodeId::agent(ctx.stage, 3),
        "Sequential Agent 3 (Finalize)",
        ctx.model,
        prompt3.as_str(),
        Some(output.clone()),
    );
    ctx.record_pending(record3.clone())?;

    match ctx
        .client
        .complete(&prompt3, ctx.temperature, "SeqAgent3-Finalize")
        .await
    {
        Ok(content) => {
            let content = if chart_stage {
                strip_code_fences(&content)
            } else {
                content
            };
            ctx.record_completed(record3.completed(content.clone()))?;
            Ok(content)
        }
        Err(error) => {
            warn!(%error, "Finalization failed, keeping refined output");
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{EchoClient, Harness, LabelFailClient};
    use super::*;
    use crate::dataset::Dataset;

    #[tokio::test]
    async fn test_full_chain_returns_finalized_output() {
        let harness = Harness::new(Dataset::Baseball);
        let client = EchoClient;
        let ctx = harness.ctx(Stage::Article, &client, Some("A title"));

        let output = run(&ctx).await.unwrap();
        let record3 = harness
            .provenance
            .get(&NodeId::agent(Stage::Article, 3))
            .unwrap()
            .unwrap();
        assert_eq!(record3.output.as_deref(), Some(output.as_str()));
        assert_eq!(harness.provenance.stage_records(Stage::Article).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_generation_failure_skips_later_agents() {
        let harness = Harness::new(Dataset::Baseball);
        let client = LabelFailClient("SeqAgent1-Generate");
        let ctx = harness.ctx(Stage::Title, &client, None);

        let output = run(&ctx).await.unwrap();
        assert_eq!(output, "");

        // Only the failed generator left a (pending) record behind.
        let records = harness.provenance.stage_records(Stage::Title).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].node_id, NodeId::agent(Stage::Title, 1));
        assert!(records[0].output.is_none());
    }

    #[tokio::test]
    async fn test_refinement_failure_falls_back_to_generation() {
        let harness = Harness::new(Dataset::Kidney);
        let client = LabelFailClient("SeqAgent2-Refine");
        let ctx = harness.ctx(Stage::Title, &client, None);

        let output = run(&ctx).await.unwrap();
        let generated = harness
            .provenance
            .get(&NodeId::agent(Stage::Title, 1))
            .unwrap()
            .unwrap()
            .output
            .unwrap();
        assert_eq!(output, generated);

        // The finalizer is never invoked after a refinement failure.
        let records = harness.provenance.stage_records(Stage::Title).unwrap();
        assert_eq!(records.len(), 2);
        assert!(harness
            .provenance
            .get(&NodeId::agent(Stage::Title, 3))
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_finalization_failure_falls_back_to_refined() {
        let harness = Harness::new(Dataset::Baseball);
        let client = LabelFailClient("SeqAgent3-Finalize");
        let ctx = harness.ctx(Stage::Article, &client, Some("A title"));

        let output = run(&ctx).await.unwrap();
        let refined = harness
            .provenance
            .get(&NodeId::agent(Stage::Article, 2))
            .unwrap()
            .unwrap()
            .output
            .unwrap();
        assert_eq!(output, refined);
    }
}
