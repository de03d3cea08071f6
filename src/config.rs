//! Run and endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::bias::BiasConfig;
use crate::dataset::Dataset;
use crate::strategy::Strategy;

/// Completion endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Chat-completion endpoint URL.
    pub endpoint: String,
    /// Bearer credential sent with every request.
    pub api_key: String,
    /// Model identifier, fixed for the whole run.
    pub model: String,
    /// Sampling temperature for every agent call.
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("NEWSROOM_COMPLETIONS_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".into()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("NEWSROOM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            temperature: 0.7,
        }
    }
}

/// Full configuration for one pipeline run.
///
/// One dataset and one bias configuration apply across all three stages;
/// the strategy is chosen independently per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub dataset: Dataset,
    /// Strategy per stage, indexed by stage ordinal.
    pub strategies: [Strategy; 3],
    pub bias: BiasConfig,
    pub completion: CompletionConfig,
}

impl RunConfig {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            strategies: [Strategy::Vote, Strategy::Sequential, Strategy::Single],
            bias: BiasConfig::none(),
            completion: CompletionConfig::default(),
        }
    }

    pub fn with_strategies(mut self, strategies: [Strategy; 3]) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_bias(mut self, bias: BiasConfig) -> Self {
        self.bias = bias;
        self
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(Dataset::Baseball)
    }
}
