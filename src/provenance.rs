//! Provenance store for agent invocations.
//!
//! Every outbound agent call is recorded here twice: once just before the
//! call is issued (prompt and input visible, output empty) and once more
//! when it returns successfully. The second write replaces the first
//! under the same key, so the visible contract is idempotent
//! replace-by-key, and an observer reading mid-flight simply sees the
//! pending form. Concurrent vote branches write disjoint keys; no further
//! synchronization is needed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stage::Stage;

/// Error type for provenance operations
#[derive(Debug, thiserror::Error)]
pub enum ProvenanceError {
    #[error("provenance lock poisoned")]
    LockPoisoned,
}

/// Result type for provenance operations
pub type ProvenanceResult<T> = Result<T, ProvenanceError>;

/// Shared reference to ProvenanceStore
pub type SharedProvenance = Arc<ProvenanceStore>;

/// Role of an invocation within its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Numbered agent slot (1-based).
    Agent(u8),
    /// The vote aggregator slot.
    Aggregator,
}

/// Identity of one agent invocation: stage plus role slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId {
    pub stage: Stage,
    pub role: AgentRole,
}

impl NodeId {
    pub fn agent(stage: Stage, agent_num: u8) -> Self {
        Self {
            stage,
            role: AgentRole::Agent(agent_num),
        }
    }

    pub fn aggregator(stage: Stage) -> Self {
        Self {
            stage,
            role: AgentRole::Aggregator,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.role {
            AgentRole::Agent(n) => write!(f, "{}-agent{}", self.stage, n),
            AgentRole::Aggregator => write!(f, "{}-aggregator", self.stage),
        }
    }
}

/// Recorded state of one agent invocation.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRecord {
    pub node_id: NodeId,
    /// Display name, e.g. "Voting Agent 2".
    pub agent_name: String,
    /// Model identifier used for the call.
    pub model: String,
    /// Exact prompt text sent.
    pub prompt: String,
    /// Input the prompt was derived from (absent for stage 0).
    pub input: Option<String>,
    /// Output text; absent until the call returns successfully.
    pub output: Option<String>,
    pub stage: Stage,
    pub recorded_at: DateTime<Utc>,
}

impl AgentRecord {
    /// Record for an invocation about to be issued.
    pub fn pending(
        node_id: NodeId,
        agent_name: impl Into<String>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        input: Option<String>,
    ) -> Self {
        Self {
            node_id,
            agent_name: agent_name.into(),
            model: model.into(),
            prompt: prompt.into(),
            input,
            output: None,
            stage: node_id.stage,
            recorded_at: Utc::now(),
        }
    }

    /// Completed form of this record, replacing the pending one.
    pub fn completed(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self.recorded_at = Utc::now();
        self
    }
}

/// In-memory keyed store of agent invocation records.
#[derive(Default)]
pub struct ProvenanceStore {
    records: RwLock<HashMap<NodeId, AgentRecord>>,
}

impl ProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedProvenance {
        Arc::new(self)
    }

    /// Insert or replace the record stored under its node identity.
    pub fn record(&self, record: AgentRecord) -> ProvenanceResult<()> {
        let mut records = self.records.write().map_err(|_| ProvenanceError::LockPoisoned)?;
        records.insert(record.node_id, record);
        Ok(())
    }

    /// Latest record for a node, if any.
    pub fn get(&self, node_id: &NodeId) -> ProvenanceResult<Option<AgentRecord>> {
        let records = self.records.read().map_err(|_| ProvenanceError::LockPoisoned)?;
        Ok(records.get(node_id).cloned())
    }

    /// All records for one stage, ordered by node identity display form.
    pub fn stage_records(&self, stage: Stage) -> ProvenanceResult<Vec<AgentRecord>> {
        let records = self.records.read().map_err(|_| ProvenanceError::LockPoisoned)?;
        let mut found: Vec<AgentRecord> = records
            .values()
            .filter(|record| record.stage == stage)
            .cloned()
            .collect();
        found.sort_by_key(|record| record.node_id.to_string());
        Ok(found)
    }

    /// Total number of stored records.
    pub fn len(&self) -> ProvenanceResult<usize> {
        let records = self.records.read().map_err(|_| ProvenanceError::LockPoisoned)?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> ProvenanceResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop all records (configuration reset).
    pub fn clear(&self) -> ProvenanceResult<()> {
        let mut records = self.records.write().map_err(|_| ProvenanceError::LockPoisoned)?;
        records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::agent(Stage::Title, 1).to_string(), "stage0-agent1");
        assert_eq!(
            NodeId::aggregator(Stage::Article).to_string(),
            "stage1-aggregator"
        );
    }

    #[test]
    fn test_record_replace_is_idempotent() {
        let store = ProvenanceStore::new();
        let node = NodeId::agent(Stage::Title, 1);

        let pending = AgentRecord::pending(node, "Single Agent", "gpt-4o-mini", "prompt", None);
        store.record(pending.clone()).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.get(&node).unwrap().unwrap().output.is_none());

        store.record(pending.completed("the title")).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        let stored = store.get(&node).unwrap().unwrap();
        assert_eq!(stored.output.as_deref(), Some("the title"));
        assert_eq!(stored.prompt, "prompt");
    }

    #[test]
    fn test_stage_records_filter_and_order() {
        let store = ProvenanceStore::new();
        for n in [3, 1, 2] {
            let node = NodeId::agent(Stage::Article, n);
            store
                .record(AgentRecord::pending(node, format!("Agent {n}"), "m", "p", None))
                .unwrap();
        }
        store
            .record(AgentRecord::pending(
                NodeId::agent(Stage::Title, 1),
                "Other",
                "m",
                "p",
                None,
            ))
            .unwrap();

        let records = store.stage_records(Stage::Article).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].node_id.to_string(), "stage1-agent1");
        assert_eq!(records[2].node_id.to_string(), "stage1-agent3");
    }

    #[test]
    fn test_clear_resets_store() {
        let store = ProvenanceStore::new();
        store
            .record(AgentRecord::pending(
                NodeId::agent(Stage::Title, 1),
                "Agent",
                "m",
                "p",
                None,
            ))
            .unwrap();
        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }
}
