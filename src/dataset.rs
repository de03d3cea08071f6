//! Canned Simpson's Paradox datasets and their loaded run context.
//!
//! Two fixed datasets are supported: the Justice/Jeter batting averages
//! (1995-1996) and the kidney stone treatment study. Both carry the same
//! paradox shape: one group wins every subgroup comparison yet loses the
//! aggregate one.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The two canned datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Baseball,
    Kidney,
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dataset::Baseball => write!(f, "baseball"),
            Dataset::Kidney => write!(f, "kidney"),
        }
    }
}

impl Dataset {
    /// One-line description used in generation prompts.
    pub fn description(&self) -> &'static str {
        match self {
            Dataset::Baseball => "Justice vs Jeter baseball dataset showing Simpson's Paradox",
            Dataset::Kidney => "Kidney stone treatment dataset showing Simpson's Paradox",
        }
    }

    /// Field the chart facets on.
    pub fn facet_field(&self) -> &'static str {
        match self {
            Dataset::Baseball => "player",
            Dataset::Kidney => "treatment",
        }
    }

    /// Field the chart columns split on.
    pub fn column_field(&self) -> &'static str {
        match self {
            Dataset::Baseball => "year",
            Dataset::Kidney => "size",
        }
    }

    /// Field carrying the binary outcome.
    pub fn outcome_field(&self) -> &'static str {
        match self {
            Dataset::Baseball => "is_hit",
            Dataset::Kidney => "success",
        }
    }

    /// Display title used by the fallback chart.
    pub fn chart_title(&self) -> &'static str {
        match self {
            Dataset::Baseball => "Baseball Data - Fallback Visualization",
            Dataset::Kidney => "Kidney Stone Data - Fallback Visualization",
        }
    }

    /// Aggregated outcome counts, the literal data every chart prompt and
    /// the fallback specification embed.
    pub fn summary_values(&self) -> Value {
        match self {
            Dataset::Baseball => json!([
                {"player": "Jeter", "year": "1995", "is_hit": "Hit", "count": 12},
                {"player": "Jeter", "year": "1995", "is_hit": "Miss", "count": 36},
                {"player": "Jeter", "year": "1996", "is_hit": "Hit", "count": 183},
                {"player": "Jeter", "year": "1996", "is_hit": "Miss", "count": 399},
                {"player": "Justice", "year": "1995", "is_hit": "Hit", "count": 104},
                {"player": "Justice", "year": "1995", "is_hit": "Miss", "count": 287},
                {"player": "Justice", "year": "1996", "is_hit": "Hit", "count": 45},
                {"player": "Justice", "year": "1996", "is_hit": "Miss", "count": 95}
            ]),
            Dataset::Kidney => json!([
                {"treatment": "A", "size": "small", "success": "success", "count": 81},
                {"treatment": "A", "size": "small", "success": "failure", "count": 6},
                {"treatment": "A", "size": "large", "success": "success", "count": 192},
                {"treatment": "A", "size": "large", "success": "failure", "count": 71},
                {"treatment": "B", "size": "small", "success": "success", "count": 234},
                {"treatment": "B", "size": "small", "success": "failure", "count": 36},
                {"treatment": "B", "size": "large", "success": "success", "count": 55},
                {"treatment": "B", "size": "large", "success": "failure", "count": 25}
            ]),
        }
    }

    /// Subgroup and aggregate rates, appended to Title/Article prompts.
    pub fn statistics(&self) -> &'static str {
        match self {
            Dataset::Baseball => {
                r#"### Baseball Statistic:

Derek Jeter:
    - Overall Hitting Rate: 0.309
    - 1995 Hitting Rate: 0.250
    - 1996 Hitting Rate: 0.314
    David Justice:
    - Overall Hitting Rate: 0.270
    - 1995 Hitting Rate: 0.253
    - 1996 Hitting Rate: 0.321
    In baseball dataset, the overall hitting rate of Derek Jeter is higher than David Justice,
    but for each year, David Justice has a higher hitting rate than Derek Jeter."#
            }
            Dataset::Kidney => {
                r#"### Kidney Treatment Statistic:

Treatment Method A:
    - Overall: 0.780
    - Large Stone Treatment: 0.730
    - Small Stone Treatment: 0.931
Treatment Method B:
    - Overall: 0.826
    - Large Stone Treatment: 0.688
    - Small Stone Treatment: 0.867
In kidney treatment dataset,
the overall success rate of treatment method B is higher than treatment method A,
but for each size of kidney stone,
treatment method A has a higher success rate than treatment method B."#
            }
        }
    }

    /// Ground-truth narrative the prompts cite as the factual reference.
    pub fn ground_truth(&self) -> &'static str {
        match self {
            Dataset::Baseball => {
                r#"This dataset contains performance information about two baseball players, Derek Jeter and David Justice, and their hitting data between 1995 and 1996.
This dataset exhibits Simpson's Paradox.
David Justice has a higher batting average than Derek Jeter in both 1995 and 1996, but when the data is combined, Derek Jeter has a higher overall batting average.
Here are the statistics for each player:

Derek Jeter:
    - Overall Hitting Rate: 0.309
    - 1995 Hitting Rate: 0.250
    - 1996 Hitting Rate: 0.314
David Justice:
    - Overall Hitting Rate: 0.270
    - 1995 Hitting Rate: 0.253
    - 1996 Hitting Rate: 0.321"#
            }
            Dataset::Kidney => {
                r#"This dataset contains performance information about two kidney stone treatment methods, A and B, and their success rates.
The dataset shows that treatment method A has a higher success rate than treatment method B for both large and small kidney stones, but when the data is combined, treatment method B has a higher overall success rate.
Here are the statistics for each treatment method:

Treatment Method A:
    - Overall: 0.780
    - Large Stone Treatment: 0.730
    - Small Stone Treatment: 0.931
Treatment Method B:
    - Overall: 0.826
    - Large Stone Treatment: 0.688
    - Small Stone Treatment: 0.867"#
            }
        }
    }
}

/// Error type for dataset context loading
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("summary fixture for {0} is empty")]
    EmptySummary(Dataset),

    #[error("summary fixture for {dataset} has a non-positive count in row {row}")]
    BadCount { dataset: Dataset, row: usize },
}

/// Everything a pipeline run needs from its dataset, resolved once during
/// the LoadingContext phase before stage 0 may start.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    pub dataset: Dataset,
    /// Aggregated outcome counts as JSON rows.
    pub summary: Value,
    pub statistics: &'static str,
    pub ground_truth: &'static str,
}

impl DatasetContext {
    /// Resolve the context for a dataset, checking the summary fixture.
    pub async fn load(dataset: Dataset) -> Result<Self, DatasetError> {
        let summary = dataset.summary_values();
        let rows = summary
            .as_array()
            .filter(|rows| !rows.is_empty())
            .ok_or(DatasetError::EmptySummary(dataset))?;

        for (row, entry) in rows.iter().enumerate() {
            let count = entry.get("count").and_then(Value::as_i64).unwrap_or(0);
            if count <= 0 {
                return Err(DatasetError::BadCount { dataset, row });
            }
        }

        Ok(Self {
            dataset,
            summary,
            statistics: dataset.statistics(),
            ground_truth: dataset.ground_truth(),
        })
    }

    /// Compact JSON rendering of the summary counts for prompt embedding.
    pub fn summary_json(&self) -> String {
        self.summary.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_loads_for_both_datasets() {
        for dataset in [Dataset::Baseball, Dataset::Kidney] {
            let ctx = DatasetContext::load(dataset).await.unwrap();
            assert_eq!(ctx.summary.as_array().unwrap().len(), 8);
            assert!(ctx.statistics.contains("Overall"));
        }
    }

    #[test]
    fn test_field_names_match_summary_rows() {
        for dataset in [Dataset::Baseball, Dataset::Kidney] {
            let rows = dataset.summary_values();
            let first = &rows.as_array().unwrap()[0];
            assert!(first.get(dataset.facet_field()).is_some());
            assert!(first.get(dataset.column_field()).is_some());
            assert!(first.get(dataset.outcome_field()).is_some());
            assert!(first.get("count").is_some());
        }
    }

    #[test]
    fn test_summary_totals() {
        // 350 patients per treatment arm in the study.
        let kidney: i64 = Dataset::Kidney
            .summary_values()
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["count"].as_i64().unwrap())
            .sum();
        assert_eq!(kidney, 700);
    }
}
