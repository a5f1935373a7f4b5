// Unit tests for the topic models and their building blocks.
//
// Tests the public TopicModel surface (LDA and embedding clustering) on tiny
// corpora with disjoint vocabularies, plus vectorizer, c-TF-IDF, PCA and the
// saved-model round trip.

use artscope::topics::cluster::EmbeddingClusterModel;
use artscope::topics::ctfidf::class_tfidf;
use artscope::topics::embeddings::{cosine_similarity, Embedder, HashingEmbedder};
use artscope::topics::lda::LdaModel;
use artscope::topics::model_artifact;
use artscope::topics::reduce::pca;
use artscope::topics::vectorizer::CountVectorizer;
use artscope::topics::{TopicModel, NOISE_TOPIC};

fn docs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|s| s.to_string()).collect()
}

fn two_themes() -> Vec<String> {
    docs(&[
        "painting studio canvas painting exhibition",
        "canvas painting studio residency painting",
        "exhibition painting canvas studio",
        "vegetable garden compost harvest garden",
        "compost garden vegetable seeds garden",
    ])
}

// ============================================================
// LDA
// ============================================================

#[tokio::test]
async fn lda_separates_disjoint_themes() {
    let fit = LdaModel::new(2).fit(&two_themes()).await.unwrap().unwrap();
    assert_eq!(fit.assignments.len(), 5);
    assert_eq!(fit.topics.len(), 2);
    let a = fit.assignments[0];
    assert!(fit.assignments[..3].iter().all(|&t| t == a), "{:?}", fit.assignments);
    assert!(fit.assignments[3..].iter().all(|&t| t == fit.assignments[3]));
    assert_ne!(a, fit.assignments[3]);

    let painting = fit.topic(a).unwrap();
    assert_eq!(painting.keywords[0].0, "painting");
    assert_eq!(painting.size, 3);
    assert_eq!(fit.topics.iter().map(|t| t.size).sum::<usize>(), 5);
}

#[tokio::test]
async fn lda_probabilities_match_distributions() {
    let fit = LdaModel::new(2).fit(&two_themes()).await.unwrap().unwrap();
    let dist = fit.distributions.as_ref().unwrap();
    for (i, row) in dist.iter().enumerate() {
        let k = fit.assignments[i] as usize;
        assert!((row[k] - fit.probabilities[i]).abs() < 1e-12);
        assert!(row.iter().all(|&p| p <= row[k]));
    }
}

#[tokio::test]
async fn lda_degenerate_input_is_none() {
    let model = LdaModel::new(3);
    assert!(model.fit(&[]).await.unwrap().is_none());
    assert!(model.fit(&docs(&["", " \n "])).await.unwrap().is_none());
    // Only stop words: nothing survives vectorization
    assert!(model.fit(&docs(&["the and of", "is it"])).await.unwrap().is_none());
}

#[tokio::test]
async fn lda_document_without_terms_is_noise() {
    let mut corpus = two_themes();
    corpus.push("the and of".into());
    let fit = LdaModel::new(2).fit(&corpus).await.unwrap().unwrap();
    assert_eq!(fit.assignments[5], NOISE_TOPIC);
    assert_eq!(fit.probabilities[5], 0.0);
}

#[tokio::test]
async fn lda_keeps_input_order_and_blank_rows_as_noise() {
    let corpus = docs(&[
        "art museum exhibit",
        "art museum exhibit",
        "cooking recipe soup",
        "cooking recipe stew",
        "",
    ]);
    let fit = LdaModel::new(2).with_seed(42).fit(&corpus).await.unwrap().unwrap();
    assert_eq!(fit.assignments.len(), 5);
    assert_eq!(fit.probabilities.len(), 5);
    assert_eq!(fit.assignments[0], fit.assignments[1]);
    assert_eq!(fit.assignments[2], fit.assignments[3]);
    assert_ne!(fit.assignments[0], fit.assignments[2]);
    assert_ne!(fit.assignments[0], NOISE_TOPIC);
    assert_ne!(fit.assignments[2], NOISE_TOPIC);

    assert_eq!(fit.assignments[4], NOISE_TOPIC);
    assert_eq!(fit.probabilities[4], 0.0);
    let dist = fit.distributions.as_ref().unwrap();
    assert_eq!(dist.len(), 5);
    assert!(dist[4].iter().all(|&p| p == 0.0));
}

#[tokio::test]
async fn lda_more_topics_than_documents() {
    let fit = LdaModel::new(4).fit(&docs(&["painting studio", "garden compost"])).await.unwrap().unwrap();
    assert_eq!(fit.topics.len(), 4);
    assert!(fit.assignments.iter().all(|&t| (0..4).contains(&t)));
}

// ============================================================
// Embedding clustering
// ============================================================

fn clustered_corpus() -> Vec<String> {
    let mut corpus: Vec<String> = (0..4).map(|_| "river boat water fishing".to_string()).collect();
    corpus.extend((0..4).map(|_| "concert guitar music stage".to_string()));
    corpus
}

#[tokio::test]
async fn hashing_embeddings_cluster_into_two_groups() {
    let model = EmbeddingClusterModel::new(Box::new(HashingEmbedder::default()));
    let fit = model.fit(&clustered_corpus()).await.unwrap().unwrap();
    assert_eq!(fit.topics.len(), 2);
    assert!(fit.assignments[..4].iter().all(|&t| t == fit.assignments[0]));
    assert!(fit.assignments[4..].iter().all(|&t| t == fit.assignments[4]));
    assert_ne!(fit.assignments[0], fit.assignments[4]);
    assert!(fit.assignments.iter().all(|&t| t != NOISE_TOPIC));

    let river = fit.topic(fit.assignments[0]).unwrap();
    assert!(river.keywords.iter().any(|(w, _)| w == "river"));
    assert!(fit.distributions.is_none());
    assert_eq!(fit.embeddings.as_ref().unwrap().len(), 8);
}

#[tokio::test]
async fn cluster_ids_are_ordered_by_size() {
    let mut corpus = clustered_corpus();
    corpus.extend((0..2).map(|_| "concert guitar music stage".to_string()));
    let model = EmbeddingClusterModel::new(Box::new(HashingEmbedder::default()));
    let fit = model.fit(&corpus).await.unwrap().unwrap();
    // Six concert documents against four river ones
    assert_eq!(fit.assignments[4], 0);
    assert_eq!(fit.assignments[0], 1);
    assert!(fit.topics[0].size >= fit.topics[1].size);
}

#[tokio::test]
async fn too_small_for_a_cluster_is_all_noise() {
    let model = EmbeddingClusterModel::new(Box::new(HashingEmbedder::default())).with_min_cluster_size(5);
    let fit = model
        .fit(&docs(&["river boat", "concert guitar", "garden compost"]))
        .await
        .unwrap()
        .unwrap();
    assert!(fit.topics.is_empty());
    assert_eq!(fit.noise_count(), 3);
}

#[tokio::test]
async fn hashing_embedder_is_deterministic_and_normalized() {
    let embedder = HashingEmbedder::default();
    let texts = docs(&["Concert guitar", "concert GUITAR", "river boat"]);
    let vectors = embedder.embed_batch(&texts).await.unwrap();
    assert_eq!(vectors[0].len(), embedder.dimension());
    assert!((cosine_similarity(&vectors[0], &vectors[1]) - 1.0).abs() < 1e-9);
    let norm: f64 = vectors[2].iter().map(|x| x * x).sum::<f64>().sqrt();
    assert!((norm - 1.0).abs() < 1e-9);
}

// ============================================================
// Building blocks
// ============================================================

#[test]
fn vectorizer_respects_min_df_and_cap() {
    let vectorizer = CountVectorizer {
        min_df: 2,
        max_features: Some(1),
        ..Default::default()
    };
    let v = vectorizer.fit_transform(&docs(&["garden garden compost", "garden compost", "kiln"]));
    assert_eq!(v.vocabulary, vec!["garden"]);
    assert_eq!(v.counts[0], vec![(0, 2)]);
    assert!(v.counts[2].is_empty());
}

#[test]
fn class_tfidf_ranks_distinctive_words_first() {
    let documents = docs(&["garden compost shared", "garden harvest shared", "kiln pottery shared", "kiln glaze shared"]);
    let topics = class_tfidf(&documents, &[0, 0, 1, 1], &CountVectorizer::default(), 3);
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].keywords[0].0, "garden");
    assert_eq!(topics[1].keywords[0].0, "kiln");
    assert_eq!(topics[0].size, 2);
}

#[test]
fn pca_is_reproducible_and_shaped() {
    let vectors = vec![
        vec![1.0, 0.0, 0.0],
        vec![0.9, 0.1, 0.0],
        vec![0.0, 1.0, 0.2],
        vec![0.1, 0.9, 0.1],
    ];
    let a = pca(&vectors, 2, 7);
    let b = pca(&vectors, 2, 7);
    assert_eq!(a, b);
    assert_eq!(a.len(), 4);
    assert!(a.iter().all(|row| row.len() == 2));
    // The first component separates the two pairs
    assert!(a[0][0].signum() == a[1][0].signum());
    assert!(a[0][0].signum() != a[2][0].signum());
}

#[tokio::test]
async fn saved_model_reads_back() {
    let dir = std::env::temp_dir().join(format!("artscope_topics_{}_model", std::process::id()));
    let model = LdaModel::new(2);
    let fit = model.fit(&two_themes()).await.unwrap().unwrap();
    model_artifact::save(&model, &fit, &dir).unwrap();
    assert_eq!(model_artifact::load_fit(&dir).unwrap(), fit);

    let raw = std::fs::read_to_string(dir.join(model_artifact::PARAMETERS_FILE)).unwrap();
    let params: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(params["model"], "lda");
    assert_eq!(params["parameters"]["n_topics"], 2);
    let _ = std::fs::remove_dir_all(&dir);
}
