// Topic modeling: a frequency strategy (LDA over term counts) and an
// embedding strategy (sentence vectors, PCA, HDBSCAN, c-TF-IDF keywords).

pub mod cluster;
pub mod ctfidf;
pub mod embeddings;
pub mod hdbscan;
pub mod lda;
pub mod model_artifact;
pub mod reduce;
pub mod traits;
pub mod vectorizer;

pub use traits::{Topic, TopicFit, TopicModel, NOISE_TOPIC};

/// Which topic model family to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Latent Dirichlet allocation over word counts, one fit per topic count.
    Lda,
    /// Sentence embeddings clustered by density; the topic count is found.
    Embedding,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::Lda => "lda",
            Strategy::Embedding => "embedding",
        })
    }
}
