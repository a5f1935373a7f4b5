// Latent Dirichlet Allocation fitted by collapsed Gibbs sampling.
//
// Random initial assignments make small corpora land in different local
// optima from run to run, so initialization is seeded farthest-first: one
// seed document is drawn with the seeded RNG, each further seed is the
// document least similar to the seeds so far, and every token starts in the
// topic of its document's nearest seed. Sampling then proceeds as usual and
// document-topic weights are averaged over the post-burn-in sweeps.

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tracing::{debug, info};

use super::embeddings::cosine_similarity;
use super::traits::{non_blank, Topic, TopicFit, TopicModel, NOISE_TOPIC};
use super::vectorizer::{CountVectorizer, Vectorized};

#[derive(Debug, Clone)]
pub struct LdaModel {
    pub n_topics: usize,
    /// Document-topic prior.
    pub alpha: f64,
    /// Topic-word prior.
    pub beta: f64,
    pub iterations: usize,
    pub burn_in: usize,
    pub top_n_words: usize,
    pub seed: u64,
    pub vectorizer: CountVectorizer,
}

impl LdaModel {
    pub fn new(n_topics: usize) -> Self {
        Self {
            n_topics,
            alpha: 0.1,
            beta: 0.01,
            iterations: 500,
            burn_in: 100,
            top_n_words: 10,
            seed: 42,
            vectorizer: CountVectorizer::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_vectorizer(mut self, vectorizer: CountVectorizer) -> Self {
        self.vectorizer = vectorizer;
        self
    }
}

/// Sampler state over the documents that have at least one vocabulary term.
struct Sampler {
    n_topics: usize,
    vocab_size: usize,
    /// Token stream per document (term indices).
    tokens: Vec<Vec<usize>>,
    assignments: Vec<Vec<usize>>,
    doc_topic: Vec<Vec<f64>>,
    topic_word: Vec<Vec<f64>>,
    topic_total: Vec<f64>,
}

impl Sampler {
    fn new(tokens: Vec<Vec<usize>>, initial: &[usize], n_topics: usize, vocab_size: usize) -> Self {
        let mut doc_topic = vec![vec![0.0; n_topics]; tokens.len()];
        let mut topic_word = vec![vec![0.0; vocab_size]; n_topics];
        let mut topic_total = vec![0.0; n_topics];
        let mut assignments = Vec::with_capacity(tokens.len());

        for (d, doc) in tokens.iter().enumerate() {
            let k = initial[d];
            for &w in doc {
                doc_topic[d][k] += 1.0;
                topic_word[k][w] += 1.0;
                topic_total[k] += 1.0;
            }
            assignments.push(vec![k; doc.len()]);
        }

        Self {
            n_topics,
            vocab_size,
            tokens,
            assignments,
            doc_topic,
            topic_word,
            topic_total,
        }
    }

    fn sweep(&mut self, alpha: f64, beta: f64, rng: &mut StdRng) {
        let beta_sum = beta * self.vocab_size as f64;
        let mut probs = vec![0.0; self.n_topics];

        for d in 0..self.tokens.len() {
            for pos in 0..self.tokens[d].len() {
                let w = self.tokens[d][pos];
                let old = self.assignments[d][pos];

                self.doc_topic[d][old] -= 1.0;
                self.topic_word[old][w] -= 1.0;
                self.topic_total[old] -= 1.0;

                // The document-length denominator is constant across topics
                let mut total = 0.0;
                for (k, p) in probs.iter_mut().enumerate() {
                    *p = (self.doc_topic[d][k] + alpha) * (self.topic_word[k][w] + beta)
                        / (self.topic_total[k] + beta_sum);
                    total += *p;
                }

                let threshold = rng.random::<f64>() * total;
                let mut cumsum = 0.0;
                let mut new = self.n_topics - 1;
                for (k, &p) in probs.iter().enumerate() {
                    cumsum += p;
                    if cumsum >= threshold {
                        new = k;
                        break;
                    }
                }

                self.doc_topic[d][new] += 1.0;
                self.topic_word[new][w] += 1.0;
                self.topic_total[new] += 1.0;
                self.assignments[d][pos] = new;
            }
        }
    }

    fn theta(&self, alpha: f64) -> Vec<Vec<f64>> {
        let k_alpha = self.n_topics as f64 * alpha;
        self.tokens
            .iter()
            .zip(&self.doc_topic)
            .map(|(doc, counts)| {
                let denom = doc.len() as f64 + k_alpha;
                counts.iter().map(|c| (c + alpha) / denom).collect()
            })
            .collect()
    }

    fn phi(&self, beta: f64) -> Vec<Vec<f64>> {
        let beta_sum = beta * self.vocab_size as f64;
        self.topic_word
            .iter()
            .zip(&self.topic_total)
            .map(|(row, total)| row.iter().map(|c| (c + beta) / (total + beta_sum)).collect())
            .collect()
    }
}

/// Pick up to `k` seed documents, farthest-first by cosine similarity.
fn farthest_first_seeds(vectors: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<usize> {
    if vectors.is_empty() || k == 0 {
        return Vec::new();
    }
    let mut seeds = vec![rng.random_range(0..vectors.len())];
    while seeds.len() < k.min(vectors.len()) {
        let next = (0..vectors.len())
            .filter(|i| !seeds.contains(i))
            .map(|i| {
                let closest = seeds
                    .iter()
                    .map(|&s| cosine_similarity(&vectors[i], &vectors[s]))
                    .fold(f64::NEG_INFINITY, f64::max);
                (i, closest)
            })
            // Least similar to its closest seed; first index on ties
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        match next {
            Some((i, _)) => seeds.push(i),
            None => break,
        }
    }
    seeds
}

/// Index of the first maximum.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl LdaModel {
    fn fit_sync(&self, documents: &[String]) -> Option<TopicFit> {
        let present = non_blank(documents);
        if present.is_empty() || self.n_topics == 0 {
            return None;
        }

        let texts: Vec<String> = present.iter().map(|&i| documents[i].clone()).collect();
        let vectorized: Vectorized = self.vectorizer.fit_transform(&texts);
        if vectorized.is_empty() {
            debug!("No vocabulary terms survived vectorization");
            return None;
        }

        // Documents with no vocabulary terms are treated like blank ones
        let modeled: Vec<usize> = (0..texts.len())
            .filter(|&i| !vectorized.counts[i].is_empty())
            .collect();
        let dense: Vec<Vec<f64>> = modeled.iter().map(|&i| vectorized.dense(i)).collect();
        let tokens: Vec<Vec<usize>> = modeled
            .iter()
            .map(|&i| {
                vectorized.counts[i]
                    .iter()
                    .flat_map(|&(w, n)| std::iter::repeat_n(w, n))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let seeds = farthest_first_seeds(&dense, self.n_topics, &mut rng);
        let initial: Vec<usize> = dense
            .iter()
            .map(|v| {
                let sims: Vec<f64> = seeds.iter().map(|&s| cosine_similarity(v, &dense[s])).collect();
                argmax(&sims)
            })
            .collect();

        let mut sampler = Sampler::new(tokens, &initial, self.n_topics, vectorized.vocabulary.len());
        let mut theta_sum = vec![vec![0.0; self.n_topics]; modeled.len()];
        let mut samples = 0usize;
        for iter in 0..self.iterations {
            sampler.sweep(self.alpha, self.beta, &mut rng);
            if iter >= self.burn_in {
                for (acc, row) in theta_sum.iter_mut().zip(sampler.theta(self.alpha)) {
                    for (a, v) in acc.iter_mut().zip(row) {
                        *a += v;
                    }
                }
                samples += 1;
            }
        }
        let theta: Vec<Vec<f64>> = if samples == 0 {
            sampler.theta(self.alpha)
        } else {
            theta_sum
                .into_iter()
                .map(|row| row.into_iter().map(|v| v / samples as f64).collect())
                .collect()
        };
        let phi = sampler.phi(self.beta);

        let n = documents.len();
        let mut assignments = vec![NOISE_TOPIC; n];
        let mut probabilities = vec![0.0; n];
        let mut distributions = vec![vec![0.0; self.n_topics]; n];
        for (row, &m) in theta.iter().zip(&modeled) {
            let doc = present[m];
            let k = argmax(row);
            assignments[doc] = k as i32;
            probabilities[doc] = row[k];
            distributions[doc] = row.clone();
        }

        let topics = (0..self.n_topics)
            .map(|k| {
                let mut ranked: Vec<(usize, f64)> = phi[k].iter().copied().enumerate().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
                Topic {
                    id: k as i32,
                    keywords: ranked
                        .into_iter()
                        .take(self.top_n_words)
                        .map(|(w, p)| (vectorized.vocabulary[w].clone(), p))
                        .collect(),
                    size: assignments.iter().filter(|&&a| a == k as i32).count(),
                }
            })
            .collect();

        Some(TopicFit {
            model: self.name().to_string(),
            assignments,
            probabilities,
            distributions: Some(distributions),
            topics,
            embeddings: None,
        })
    }
}

#[async_trait]
impl TopicModel for LdaModel {
    fn name(&self) -> &str {
        "lda"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "strategy": "lda",
            "n_topics": self.n_topics,
            "alpha": self.alpha,
            "beta": self.beta,
            "iterations": self.iterations,
            "burn_in": self.burn_in,
            "top_n_words": self.top_n_words,
            "seed": self.seed,
            "max_features": self.vectorizer.max_features,
            "min_df": self.vectorizer.min_df,
            "max_df": self.vectorizer.max_df,
        })
    }

    async fn fit(&self, documents: &[String]) -> Result<Option<TopicFit>> {
        let model = self.clone();
        let documents = documents.to_vec();
        let fit = tokio::task::spawn_blocking(move || model.fit_sync(&documents)).await?;
        if let Some(fit) = &fit {
            info!(
                topics = self.n_topics,
                documents = fit.assignments.len(),
                unassigned = fit.noise_count(),
                "Fitted LDA"
            );
        }
        Ok(fit)
    }
}
