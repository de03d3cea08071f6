//! Judging pass over a finished report.
//!
//! Two judges run concurrently: a visualization-grammar judge over the
//! chart specification and a writing-quality judge over the article.
//! Each returns a JSON verdict that may arrive fenced or with unquoted
//! keys; parsing tolerates both. The pipeline never depends on the
//! scores for control flow.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{Completion, CompletionError};
use crate::sanitize::strip_code_fences;
use crate::stage::StageResult;

/// Error type for the judging pass
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("unparseable judge verdict: {0}")]
    Parse(String),

    #[error("report is missing the {0} output")]
    MissingOutput(&'static str),
}

/// One judge's structured verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Total score string, e.g. "7/10".
    pub score: String,
    /// Short reasons for deductions.
    pub reasons: Vec<String>,
    /// Longer per-dimension comments.
    pub comments: Vec<String>,
}

/// Combined score breakdown for a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Weighted overall score, formatted to two decimals.
    pub overall_score: String,
    pub writing_score: String,
    pub coding_score: String,
    pub writing_reasons: Vec<String>,
    pub coding_reasons: Vec<String>,
    pub writing_comments: Vec<String>,
    pub coding_comments: Vec<String>,
}

/// Judge a completed report: both judges fan out concurrently.
pub async fn judge_report(
    client: &dyn Completion,
    temperature: f32,
    result: &StageResult,
) -> Result<ScoreBreakdown, JudgeError> {
    let article = result
        .article
        .as_deref()
        .ok_or(JudgeError::MissingOutput("article"))?;
    let chart = result
        .visualization
        .as_deref()
        .ok_or(JudgeError::MissingOutput("visualization"))?;

    let chart_prompt = chart_judge_prompt(chart);
    let writing_prompt = writing_judge_prompt(article);
    let (chart_raw, writing_raw) = tokio::join!(
        client.complete(&chart_prompt, temperature, "VisualizationJudge"),
        client.complete(&writing_prompt, temperature, "WritingJudge"),
    );

    let chart_verdict = parse_verdict(&chart_raw?)?;
    let writing_verdict = parse_verdict(&writing_raw?)?;

    debug!(
        writing = %writing_verdict.score,
        coding = %chart_verdict.score,
        "Judges returned"
    );

    Ok(compute_breakdown(writing_verdict, chart_verdict))
}

fn chart_judge_prompt(spec: &str) -> String {
    format!(
        "You are a visualization grammar expert.\n\n\
         Your task is to evaluate a Vega-Lite specification and return a structured object with:\n\
         - a **total score** string (like \"7/10\"),\n\
         - a list of short **reasons** for deductions (1 line per point),\n\
         - and a list of full **comments** (2 sentences per dimension).\n\n\
         Return a JSON object in this format:\n\
         {{\n  \"score\": \"7/10\",\n  \"reasons\": [\"Reason 1\", \"Reason 2\"],\n  \"comments\": [\"Comment 1\", \"Comment 2\"]\n}}\n\n\
         Evaluate based on: correctness, clarity, effectiveness.\n\n\
         Here is the Vega-Lite spec to evaluate:\n{spec}"
    )
}

fn writing_judge_prompt(article: &str) -> String {
    format!(
        "You are a writing quality expert.\n\n\
         Evaluate this article and return a JSON object with:\n\
         - a **total score** string (like \"8/10\"),\n\
         - a list of short **reasons** for deductions,\n\
         - and a list of full **comments**.\n\n\
         Return format:\n\
         {{\n  \"score\": \"8/10\",\n  \"reasons\": [\"Reason 1\", \"Reason 2\"],\n  \"comments\": [\"Comment 1\", \"Comment 2\"]\n}}\n\n\
         Article to evaluate:\n{article}"
    )
}

/// Parse a raw judge response, tolerating fences and unquoted keys.
pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict, JudgeError> {
    let clean = strip_code_fences(raw);
    let quoted = quote_bare_keys(&clean)?;
    serde_json::from_str(&quoted).map_err(|e| JudgeError::Parse(e.to_string()))
}

fn quote_bare_keys(text: &str) -> Result<String, JudgeError> {
    let pattern = Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#)
        .map_err(|e| JudgeError::Parse(e.to_string()))?;
    Ok(pattern.replace_all(text, "$1\"$2\":").into_owned())
}

/// Numeric part of an "N/10" score string; 0 when absent.
pub fn parse_score(score: &str) -> u32 {
    score
        .trim()
        .strip_suffix("/10")
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0)
}

/// Weighted overall score: writing counts 1.5x against the chart score.
pub fn compute_overall(writing: u32, coding: u32) -> String {
    let overall = (writing as f64 * 1.5 + coding as f64) / 25.0 * 10.0;
    format!("{overall:.2}")
}

fn compute_breakdown(writing: JudgeVerdict, coding: JudgeVerdict) -> ScoreBreakdown {
    let overall_score = compute_overall(parse_score(&writing.score), parse_score(&coding.score));
    ScoreBreakdown {
        overall_score,
        writing_score: writing.score,
        coding_score: coding.score,
        writing_reasons: writing.reasons,
        coding_reasons: coding.reasons,
        writing_comments: writing.comments,
        coding_comments: coding.comments,
    }
}
