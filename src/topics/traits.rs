// Topic model trait: the seam between the pipeline and each strategy.
//
// Both strategies (LDA over term counts, density clustering over sentence
// embeddings) implement TopicModel and return the same TopicFit, so the
// pipeline and the report writer never care which one ran.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Topic id meaning "no topic was confidently assigned".
pub const NOISE_TOPIC: i32 = -1;

/// One discovered topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i32,
    /// Keywords by descending weight.
    pub keywords: Vec<(String, f64)>,
    /// Number of documents assigned to this topic.
    pub size: usize,
}

impl Topic {
    /// Comma-separated keywords, for tables and terminal output.
    pub fn label(&self, max: usize) -> String {
        self.keywords
            .iter()
            .take(max)
            .map(|(w, _)| w.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The result of fitting a model to a batch of documents.
///
/// All per-document vectors are aligned with the input order, including
/// blank documents, which come back as noise with probability 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicFit {
    pub model: String,
    pub assignments: Vec<i32>,
    pub probabilities: Vec<f64>,
    /// Document × topic weights (frequency strategy only).
    pub distributions: Option<Vec<Vec<f64>>>,
    /// Non-noise topics, ordered by id.
    pub topics: Vec<Topic>,
    /// Document embeddings (embedding strategy only). Blank documents are zero vectors.
    pub embeddings: Option<Vec<Vec<f64>>>,
}

impl TopicFit {
    pub fn topic(&self, id: i32) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == id)
    }

    pub fn noise_count(&self) -> usize {
        self.assignments.iter().filter(|&&a| a == NOISE_TOPIC).count()
    }
}

/// Fit topics to documents.
#[async_trait]
pub trait TopicModel: Send + Sync {
    fn name(&self) -> &str;

    /// Parameters worth persisting alongside a fit.
    fn parameters(&self) -> serde_json::Value;

    /// Returns `Ok(None)` when there is nothing to model: no documents, or
    /// only blank ones.
    async fn fit(&self, documents: &[String]) -> Result<Option<TopicFit>>;
}

/// Indices of the documents that contain something besides whitespace.
pub fn non_blank(documents: &[String]) -> Vec<usize> {
    documents
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.trim().is_empty())
        .map(|(i, _)| i)
        .collect()
}
