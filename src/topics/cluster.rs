// Embedding + density clustering topic model.
//
// Documents are embedded, normalized to unit length, projected onto a few
// principal components and clustered with HDBSCAN. Clusters are renumbered
// by size so topic 0 is always the largest, then described with c-TF-IDF
// keywords. Documents HDBSCAN leaves unclustered keep NOISE_TOPIC.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::ctfidf::class_tfidf;
use super::embeddings::{l2_normalize, Embedder};
use super::hdbscan::Hdbscan;
use super::reduce::pca;
use super::traits::{non_blank, TopicFit, TopicModel, NOISE_TOPIC};
use super::vectorizer::CountVectorizer;

pub struct EmbeddingClusterModel {
    embedder: Box<dyn Embedder>,
    /// Dimensions kept after PCA, before clustering.
    pub components: usize,
    pub seed: u64,
    pub hdbscan: Hdbscan,
    pub vectorizer: CountVectorizer,
    pub top_n_words: usize,
}

impl EmbeddingClusterModel {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            components: 5,
            seed: 42,
            hdbscan: Hdbscan::default(),
            vectorizer: CountVectorizer::default(),
            top_n_words: 10,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.hdbscan.min_cluster_size = size;
        self
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }
}

/// Map raw cluster labels to ids ordered by cluster size, largest first.
/// Equal sizes keep the order in which the clusters first appear.
fn relabel_by_size(labels: &[i32]) -> Vec<i32> {
    let mut stats: HashMap<i32, (usize, usize)> = HashMap::new();
    for (i, &l) in labels.iter().enumerate() {
        if l == NOISE_TOPIC {
            continue;
        }
        let entry = stats.entry(l).or_insert((0, i));
        entry.0 += 1;
    }
    let mut order: Vec<(i32, usize, usize)> =
        stats.into_iter().map(|(l, (n, first))| (l, n, first)).collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    let mapping: HashMap<i32, i32> = order
        .iter()
        .enumerate()
        .map(|(new, &(old, _, _))| (old, new as i32))
        .collect();
    labels
        .iter()
        .map(|l| mapping.get(l).copied().unwrap_or(NOISE_TOPIC))
        .collect()
}

#[async_trait]
impl TopicModel for EmbeddingClusterModel {
    fn name(&self) -> &str {
        "embedding"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "strategy": "embedding",
            "embedder": self.embedder.name(),
            "dimension": self.embedder.dimension(),
            "components": self.components,
            "seed": self.seed,
            "min_cluster_size": self.hdbscan.min_cluster_size,
            "min_samples": self.hdbscan.min_samples,
            "top_n_words": self.top_n_words,
            "max_features": self.vectorizer.max_features,
        })
    }

    async fn fit(&self, documents: &[String]) -> Result<Option<TopicFit>> {
        let present = non_blank(documents);
        if present.is_empty() {
            return Ok(None);
        }
        let texts: Vec<String> = present.iter().map(|&i| documents[i].clone()).collect();

        let mut vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .with_context(|| format!("Failed to embed documents with {}", self.embedder.name()))?;
        if vectors.len() != texts.len() {
            anyhow::bail!(
                "Embedder returned {} vectors for {} documents",
                vectors.len(),
                texts.len()
            );
        }
        for v in &mut vectors {
            l2_normalize(v);
        }

        let reduced = pca(&vectors, self.components, self.seed);
        let clustering = self.hdbscan.fit(&reduced);
        let labels = relabel_by_size(&clustering.labels);
        debug!(
            clusters = clustering.cluster_count(),
            components = self.components,
            "Clustered embeddings"
        );

        let topics = class_tfidf(&texts, &labels, &self.vectorizer, self.top_n_words);

        let n = documents.len();
        let dim = self.embedder.dimension();
        let mut assignments = vec![NOISE_TOPIC; n];
        let mut probabilities = vec![0.0; n];
        let mut embeddings = vec![vec![0.0; dim]; n];
        for (k, &doc) in present.iter().enumerate() {
            assignments[doc] = labels[k];
            probabilities[doc] = clustering.probabilities[k];
            embeddings[doc] = std::mem::take(&mut vectors[k]);
        }

        let fit = TopicFit {
            model: self.name().to_string(),
            assignments,
            probabilities,
            distributions: None,
            topics,
            embeddings: Some(embeddings),
        };
        info!(
            topics = fit.topics.len(),
            documents = n,
            unassigned = fit.noise_count(),
            embedder = self.embedder.name(),
            "Fitted embedding clusters"
        );
        Ok(Some(fit))
    }
}
