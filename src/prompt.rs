//! Prompt builders: pure functions from run context to prompt text.
//!
//! Strategy runners treat everything returned here as opaque text. Agent
//! roles rotate across the three slots so parallel voters approach the
//! same task from different angles.

use crate::bias::BiasLevel;
use crate::dataset::DatasetContext;
use crate::stage::Stage;

const TITLE_ROLES: [&str; 3] = [
    "a creative writer who crafts engaging and imaginative titles",
    "a concise journalist who writes clear and impactful headlines",
    "a data storyteller who creates informative and compelling titles",
];

const ARTICLE_ROLES: [&str; 3] = [
    "a creative writer who writes engaging and imaginative articles analyzing datasets",
    "a data analyst who writes clear and informative articles about statistical phenomena",
    "a journalist who writes compelling and well-structured articles with vivid examples",
];

fn role(roles: &[&'static str; 3], agent_num: u8) -> &'static str {
    let index = agent_num.max(1) as usize - 1;
    roles[index % roles.len()]
}

fn data_context(data: &DatasetContext) -> String {
    format!(
        "\n\n**Dataset Statistics:**\n{}\n\n**Ground Truth Context:**\n{}",
        data.statistics, data.ground_truth
    )
}

/// Title-stage generation prompt for one agent slot.
pub fn title_prompt(data: &DatasetContext, agent_num: u8, injection: Option<&str>) -> String {
    let mut prompt = format!(
        "You are Agent {agent_num}, {}. Write a news title for: {}.\n\n\
         CRITICAL: Keep it UNDER 15 words. Return ONLY the title, nothing else.",
        role(&TITLE_ROLES, agent_num),
        data.dataset.description(),
    );
    if let Some(injection) = injection {
        prompt.push_str("\n\n");
        prompt.push_str(injection);
    }
    prompt.push_str(&data_context(data));
    prompt
}

/// Article-stage generation prompt for one agent slot.
pub fn article_prompt(
    data: &DatasetContext,
    title: &str,
    agent_num: u8,
    injection: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are Agent {agent_num}, {}. Write a news article (200-300 words) about \
         Simpson's Paradox in: {}.\n\n\
         Use vivid language, creative examples, and an innovative perspective. Make the \
         content compelling and memorable while staying relevant to the dataset analysis.\n\n\
         Return the article in plain text.\n\nTitle: {title}",
        role(&ARTICLE_ROLES, agent_num),
        data.dataset.description(),
    );
    if let Some(injection) = injection {
        prompt.push_str("\n\n");
        prompt.push_str(injection);
    }
    prompt.push_str(&data_context(data));
    prompt
}

/// Second-slot prompt of the sequential chain: refine the prior output.
pub fn refine_prompt(stage: Stage, content: &str) -> String {
    match stage {
        Stage::Title => {
            format!("Refine this title. Keep it UNDER 15 words. Return ONLY the title:\n{content}")
        }
        Stage::Article => format!("Refine this article (keep 200-300 words):\n{content}"),
        Stage::Visualization => format!(
            "Improve this Vega-Lite spec (fix any issues, improve colors/layout). \
             Return ONLY valid JSON:\n{content}"
        ),
    }
}

/// Third-slot prompt of the sequential chain: final polish.
pub fn finalize_prompt(stage: Stage, content: &str) -> String {
    match stage {
        Stage::Title => format!(
            "Final polish. MUST be UNDER 15 words. Return ONLY the title, \
             absolutely nothing else:\n{content}"
        ),
        Stage::Article => format!("Finalize this article:\n{content}"),
        Stage::Visualization => format!(
            "Finalize this Vega-Lite spec (add polish, ensure clarity). \
             Return ONLY valid JSON:\n{content}"
        ),
    }
}

/// Aggregator prompt embedding all three raw votes.
pub fn aggregator_prompt(stage: Stage, votes: &[String]) -> String {
    match stage {
        Stage::Title => format!(
            "Choose the best title from these options:\n{}\n\n\
             Return ONLY the best title (under 15 words).",
            votes.join("\n")
        ),
        Stage::Article => format!(
            "Combine these into one cohesive 200-300 word article:\n{}",
            votes.join("\n---\n")
        ),
        Stage::Visualization => format!(
            "You are a Vega-Lite expert. Analyze these 3 specifications and create ONE \
             improved version.\nPreserve the best encodings, colors, and interactivity. \
             Return ONLY valid JSON (no markdown).\n\nSpecs to aggregate:\n{}",
            votes.join("\n---\n")
        ),
    }
}

/// Full chart-generation prompt: design directives plus the request,
/// optionally carrying a failure reason and remediation hint from the
/// previous attempt.
pub fn chart_prompt(
    data: &DatasetContext,
    level: BiasLevel,
    article: Option<&str>,
    fix: Option<(&str, &str)>,
) -> String {
    format!(
        "{}\n\n{}",
        chart_system_prompt(data, level),
        chart_request_prompt(data, article, fix)
    )
}

fn chart_system_prompt(data: &DatasetContext, level: BiasLevel) -> String {
    let dataset = data.dataset;
    if level.is_active() {
        format!(
            "You are an expert in Vega-Lite visualization.\n\n\
             Generate a valid Vega-Lite specification for visualizing the data.\n\n\
             **Design Requirements (CRITICAL):**\n\
             - Background color: MUST be \"#f9f6ef\" (newspaper style)\n\
             - Color scheme: Use green (#4CAF50 or #10b981) for success/hit, red (#F44336 or #ef4444) for failure/miss\n\
             - Font: Use Georgia or serif fonts for a clean, professional look\n\
             - Width: 300px per facet chart\n\
             - Include tooltips with detailed information\n\n\
             **Bias Instruction (Level {level}):**\n{directive}\n\n\
             **Data Summary:**\n{summary}\n\n\
             **Critical Rules:**\n\
             1. Return ONLY valid Vega-Lite JSON\n\
             2. NO markdown fences\n\
             3. Use the provided data exactly as given\n\
             4. Facet by {facet}\n\
             5. Show success/failure or hit/miss proportions\n\
             6. Professional newspaper aesthetic",
            level = level,
            directive = level.chart_directive(),
            summary = data.summary_json(),
            facet = dataset.facet_field(),
        )
    } else {
        format!(
            "You are an expert in Vega-Lite visualization.\n\n\
             Your task is to generate a valid Vega-Lite specification that visualizes \
             Simpson's Paradox using PIE CHARTS.\n\n\
             **Design Requirements (CRITICAL):**\n\
             - Use LAYERED PIE CHARTS (arc mark + text mark)\n\
             - Visualize the proportion of outcomes per subgroup\n\
             - Facet by row (\"{facet}\") and column (\"{column}\")\n\
             - Background color: MUST be \"#f9f6ef\" (newspaper style)\n\
             - Color scheme: green (#4CAF50) for success/hit, red (#F44336) for failure/miss\n\
             - Font: Georgia or serif fonts\n\
             - Add text labels on each arc showing counts\n\n\
             **Critical Rules:**\n\
             1. Use ONLY the data provided\n\
             2. Do NOT modify data values\n\
             3. Return ONLY the specification as valid JSON\n\n\
             **Data Summary:**\n{summary}",
            facet = dataset.facet_field(),
            column = dataset.column_field(),
            summary = data.summary_json(),
        )
    }
}

fn chart_request_prompt(
    data: &DatasetContext,
    article: Option<&str>,
    fix: Option<(&str, &str)>,
) -> String {
    let dataset = data.dataset;
    let mut prompt = format!(
        "Generate a Vega-Lite PIE CHART visualization for the data.\n\n\
         **Requirements:**\n\
         - Use layered pie charts (arc + text marks)\n\
         - Facet by {facet} (row) and {column} (column)\n\
         - Colors: #4CAF50 (green) for success/hit, #F44336 (red) for failure/miss\n\
         - Include text labels showing counts on each arc\n\n\
         **Data:**\n{summary}\n\n\
         **Article Context:**\n{article}\n\n\
         **CRITICAL OUTPUT RULES:**\n\
         - Return ONLY valid JSON\n\
         - Start with {{ and end with }}\n\
         - NO markdown fences\n\
         - NO explanations",
        facet = dataset.facet_field(),
        column = dataset.column_field(),
        summary = data.summary_json(),
        article = article.filter(|a| !a.is_empty()).unwrap_or("No previous article"),
    );
    if let Some((reason, hint)) = fix {
        prompt.push_str(&format!("\n\n**Fix this error:** {reason}\n{hint}"));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    fn context(dataset: Dataset) -> DatasetContext {
        DatasetContext {
            dataset,
            summary: dataset.summary_values(),
            statistics: dataset.statistics(),
            ground_truth: dataset.ground_truth(),
        }
    }

    #[test]
    fn test_title_roles_rotate() {
        let data = context(Dataset::Baseball);
        let first = title_prompt(&data, 1, None);
        let second = title_prompt(&data, 2, None);
        assert_ne!(first, second);
        assert!(first.contains("creative writer"));
        assert!(second.contains("concise journalist"));
        // Slot 4 wraps back to the first role.
        assert!(title_prompt(&data, 4, None).contains("creative writer"));
    }

    #[test]
    fn test_injection_appended_before_context() {
        let data = context(Dataset::Kidney);
        let prompt = article_prompt(&data, "Some title", 1, Some("CRITICAL: mislead."));
        let injection_at = prompt.find("CRITICAL: mislead.").unwrap();
        let stats_at = prompt.find("**Dataset Statistics:**").unwrap();
        assert!(injection_at < stats_at);
        assert!(prompt.contains("Title: Some title"));
    }

    #[test]
    fn test_aggregator_separators() {
        let votes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(aggregator_prompt(Stage::Title, &votes).contains("a\nb\nc"));
        assert!(aggregator_prompt(Stage::Article, &votes).contains("a\n---\nb\n---\nc"));
        assert!(aggregator_prompt(Stage::Visualization, &votes).contains("Specs to aggregate"));
    }

    #[test]
    fn test_chart_prompt_variants() {
        let data = context(Dataset::Baseball);
        let neutral = chart_prompt(&data, BiasLevel::None, Some("article text"), None);
        assert!(neutral.contains("PIE CHARTS"));
        assert!(neutral.contains("\"player\""));
        assert!(!neutral.contains("Bias Instruction"));

        let biased = chart_prompt(&data, BiasLevel::Level3, None, None);
        assert!(biased.contains("Bias Instruction (Level level3)"));
        assert!(biased.contains("strongly mislead"));
        assert!(biased.contains("No previous article"));
    }

    #[test]
    fn test_chart_prompt_carries_fix_hint() {
        let data = context(Dataset::Kidney);
        let prompt = chart_prompt(
            &data,
            BiasLevel::None,
            None,
            Some(("transport error: timed out", "Review the structure")),
        );
        assert!(prompt.contains("**Fix this error:** transport error: timed out"));
        assert!(prompt.ends_with("Review the structure"));
    }
}
