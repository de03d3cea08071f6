//! Pipeline stages and the incrementally built report.

use serde::{Deserialize, Serialize};

/// The three report stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Stage 0: news title
    Title,
    /// Stage 1: article body
    Article,
    /// Stage 2: chart specification
    Visualization,
}

impl Stage {
    /// All stages in execution order.
    pub fn all() -> [Stage; 3] {
        [Stage::Title, Stage::Article, Stage::Visualization]
    }

    /// Ordinal index (0..=2).
    pub fn index(&self) -> usize {
        match self {
            Stage::Title => 0,
            Stage::Article => 1,
            Stage::Visualization => 2,
        }
    }

    /// Human-readable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Title => "Title",
            Stage::Article => "Article",
            Stage::Visualization => "Visualization",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage{}", self.index())
    }
}

/// The three top-level outputs accumulated across a pipeline run.
///
/// Each field is set exactly once, when its stage resolves; a field may
/// hold an empty string when a Title/Article stage failed outright. The
/// complete triple is the terminal artifact handed to judging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageResult {
    pub title: Option<String>,
    pub article: Option<String>,
    pub visualization: Option<String>,
}

impl StageResult {
    /// Output of a given stage, if that stage has resolved.
    pub fn output(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Title => self.title.as_deref(),
            Stage::Article => self.article.as_deref(),
            Stage::Visualization => self.visualization.as_deref(),
        }
    }

    /// Store a stage's final output.
    pub fn set_output(&mut self, stage: Stage, output: String) {
        match stage {
            Stage::Title => self.title = Some(output),
            Stage::Article => self.article = Some(output),
            Stage::Visualization => self.visualization = Some(output),
        }
    }

    /// True once all three stages have resolved.
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.article.is_some() && self.visualization.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_ordering() {
        let stages = Stage::all();
        assert_eq!(stages[0].index(), 0);
        assert_eq!(stages[2], Stage::Visualization);
        assert_eq!(Stage::Article.to_string(), "stage1");
    }

    #[test]
    fn test_result_accumulation() {
        let mut result = StageResult::default();
        assert!(!result.is_complete());

        result.set_output(Stage::Title, "A title".to_string());
        assert_eq!(result.output(Stage::Title), Some("A title"));
        assert_eq!(result.output(Stage::Article), None);

        result.set_output(Stage::Article, String::new());
        result.set_output(Stage::Visualization, "{}".to_string());
        assert!(result.is_complete());
    }
}
