//! Chart-specification generation with bounded retry.
//!
//! Stage 2 expects a structured Vega-Lite specification rather than
//! freeform text, so every strategy routes its chart slots through this
//! sub-routine instead of a plain completion call. A failed call is
//! retried with a remediation hint appended to the prompt; once the
//! attempt budget is spent, a hard-coded fallback bar chart over the
//! dataset's summary counts is returned so the stage always ends with
//! renderable output.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::warn;

use crate::dataset::DatasetContext;
use crate::prompt;
use crate::sanitize::strip_code_fences;
use crate::strategy::StageContext;

/// Maximum completion attempts before the fallback specification is used.
pub const MAX_CHART_ATTEMPTS: u32 = 3;

/// Fixed pause between attempts so a failing endpoint is not hammered.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Generate a chart specification for the stage context, retrying failed
/// completion calls up to [`MAX_CHART_ATTEMPTS`] times. Never fails.
pub async fn generate_chart(ctx: &StageContext<'_>, agent_label: &str) -> String {
    let level = ctx.bias.chart_level();
    let mut last_failure: Option<String> = None;

    for attempt in 1..=MAX_CHART_ATTEMPTS {
        ctx.log(format!(
            "[{agent_label}] Attempt {attempt}/{MAX_CHART_ATTEMPTS} to generate chart spec..."
        ));

        let fix = last_failure
            .as_deref()
            .map(|reason| (reason, remediation_hint(reason)));
        let chart_prompt = prompt::chart_prompt(ctx.data, level, ctx.previous_output, fix);

        match ctx
            .client
            .complete(&chart_prompt, ctx.temperature, agent_label)
            .await
        {
            Ok(content) => {
                let clean = strip_code_fences(&content);
                // Structural problems are surfaced, not retried; only a
                // failed call earns another attempt.
                if let Err(reason) = validate_chart_json(&clean) {
                    warn!(agent = agent_label, %reason, "Generated chart spec fails validation");
                }
                ctx.log(format!(
                    "[{agent_label}] Chart spec generated on attempt {attempt}"
                ));
                return clean;
            }
            Err(error) => {
                let reason = error.to_string();
                ctx.log(format!("[{agent_label}] Attempt {attempt} failed: {reason}"));
                last_failure = Some(reason);
                if attempt < MAX_CHART_ATTEMPTS {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    ctx.log(format!(
        "[{agent_label}] All {MAX_CHART_ATTEMPTS} attempts failed, using fallback spec"
    ));
    fallback_chart_spec(ctx.data).to_string()
}

/// Targeted fix suggestion for a failure reason, by substring lookup.
pub fn remediation_hint(reason: &str) -> &'static str {
    const FIXES: [(&str, &str); 6] = [
        (
            "undefined variable",
            "Ensure all fields in encodings exist in the data",
        ),
        (
            "missing scale",
            "Add proper scale definitions for categorical data",
        ),
        (
            "invalid data",
            "Validate data structure matches Vega-Lite requirements",
        ),
        (
            "Missing $schema",
            "Add \"$schema\": \"https://vega.github.io/schema/vega-lite/v5.json\"",
        ),
        (
            "Missing data",
            "Ensure \"data\" field with \"values\" array is present",
        ),
        (
            "Missing mark",
            "Add \"mark\" field (e.g. \"bar\", \"line\", \"point\")",
        ),
    ];

    for (needle, fix) in FIXES {
        if reason.contains(needle) {
            return fix;
        }
    }
    "Review the Vega-Lite specification structure"
}

/// Parse a sanitized chart string and check its structure.
pub fn validate_chart_json(text: &str) -> Result<(), String> {
    let spec: Value =
        serde_json::from_str(text).map_err(|e| format!("invalid data: not JSON ({e})"))?;
    validate_chart_spec(&spec)
}

/// Minimal structural validity: schema, data, and a mark or nested spec.
pub fn validate_chart_spec(spec: &Value) -> Result<(), String> {
    if spec.get("$schema").is_none() {
        return Err("Missing $schema field".into());
    }
    if spec.get("data").is_none() {
        return Err("Missing data field".into());
    }
    if spec.get("mark").is_none() && spec.get("spec").is_none() {
        return Err("Missing mark or spec field".into());
    }
    Ok(())
}

/// Hard-coded fallback: a bar chart of outcome counts.
pub fn fallback_chart_spec(data: &DatasetContext) -> Value {
    let outcome = data.dataset.outcome_field();
    json!({
        "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
        "background": "#f9f6ef",
        "title": data.dataset.chart_title(),
        "data": {"values": data.summary.clone()},
        "mark": "bar",
        "encoding": {
            "x": {"field": outcome, "type": "nominal", "title": "Outcome"},
            "y": {"field": "count", "type": "quantitative", "title": "Count"},
            "color": {
                "field": outcome,
                "type": "nominal",
                "scale": {"range": ["#10b981", "#ef4444"]}
            }
        }
    })
}
