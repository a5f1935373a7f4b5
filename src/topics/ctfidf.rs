// Class-based TF-IDF: keywords for clusters of documents.
//
// All documents of a cluster are joined into one class document. A term's
// weight in a class is its L1-normalized frequency in that class times
// ln(1 + A / f), where A is the average word count per class and f the
// term's total frequency across all classes. The noise class takes part in
// the IDF so words common to everything are still pushed down, but it gets
// no keywords of its own.

use std::collections::BTreeMap;

use super::traits::{Topic, NOISE_TOPIC};
use super::vectorizer::CountVectorizer;

/// Keywords per cluster label, ordered by label. Noise is skipped.
pub fn class_tfidf(
    documents: &[String],
    labels: &[i32],
    vectorizer: &CountVectorizer,
    top_n: usize,
) -> Vec<Topic> {
    let mut classes: BTreeMap<i32, (Vec<&str>, usize)> = BTreeMap::new();
    for (doc, &label) in documents.iter().zip(labels) {
        let entry = classes.entry(label).or_default();
        entry.0.push(doc.as_str());
        entry.1 += 1;
    }
    if classes.is_empty() {
        return Vec::new();
    }

    let class_ids: Vec<i32> = classes.keys().copied().collect();
    let class_docs: Vec<String> = classes.values().map(|(docs, _)| docs.join(" ")).collect();
    let vectorized = vectorizer.fit_transform(&class_docs);
    let vocab_size = vectorized.vocabulary.len();

    let class_words: Vec<f64> = vectorized
        .counts
        .iter()
        .map(|c| c.iter().map(|&(_, n)| n as f64).sum())
        .collect();
    let average_words = class_words.iter().sum::<f64>() / class_ids.len() as f64;

    let mut term_totals = vec![0.0; vocab_size];
    for counts in &vectorized.counts {
        for &(t, n) in counts {
            term_totals[t] += n as f64;
        }
    }

    class_ids
        .iter()
        .enumerate()
        .filter(|(_, &id)| id != NOISE_TOPIC)
        .map(|(ci, &id)| {
            let mut weights: Vec<(usize, f64)> = vectorized.counts[ci]
                .iter()
                .map(|&(t, n)| {
                    let tf = n as f64 / class_words[ci].max(1.0);
                    let idf = (1.0 + average_words / term_totals[t].max(1.0)).ln();
                    (t, tf * idf)
                })
                .collect();
            weights.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            Topic {
                id,
                keywords: weights
                    .into_iter()
                    .take(top_n)
                    .map(|(t, w)| (vectorized.vocabulary[t].clone(), w))
                    .collect(),
                size: classes.get(&id).map(|c| c.1).unwrap_or(0),
            }
        })
        .collect()
}
