// Saved topic model: a directory with the strategy parameters and the fit.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use super::traits::{TopicFit, TopicModel};

pub const PARAMETERS_FILE: &str = "model.json";
pub const FIT_FILE: &str = "fit.json";

/// Write `model.json` and `fit.json` into `dir`, creating it if needed.
pub fn save(model: &dyn TopicModel, fit: &TopicFit, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create model directory {}", dir.display()))?;

    let parameters = json!({
        "model": model.name(),
        "parameters": model.parameters(),
        "topics": fit.topics.len(),
        "documents": fit.assignments.len(),
    });
    std::fs::write(
        dir.join(PARAMETERS_FILE),
        serde_json::to_string_pretty(&parameters)?,
    )
    .context("Failed to write model parameters")?;
    std::fs::write(dir.join(FIT_FILE), serde_json::to_string_pretty(fit)?)
        .context("Failed to write model fit")?;
    Ok(())
}

/// Read back a fit written by [`save`].
pub fn load_fit(dir: &Path) -> Result<TopicFit> {
    let path = dir.join(FIT_FILE);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid fit file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::lda::LdaModel;
    use crate::topics::traits::Topic;

    #[test]
    fn test_save_then_load_fit() {
        let dir = std::env::temp_dir().join(format!("artscope_artifact_{}", std::process::id()));
        let fit = TopicFit {
            model: "lda".into(),
            assignments: vec![0, 1],
            probabilities: vec![0.9, 0.7],
            distributions: Some(vec![vec![0.9, 0.1], vec![0.3, 0.7]]),
            topics: vec![Topic {
                id: 0,
                keywords: vec![("atelier".into(), 0.4)],
                size: 1,
            }],
            embeddings: None,
        };
        save(&LdaModel::new(2), &fit, &dir).unwrap();

        let params: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join(PARAMETERS_FILE)).unwrap()).unwrap();
        assert_eq!(params["model"], "lda");
        assert_eq!(params["parameters"]["n_topics"], 2);
        assert_eq!(load_fit(&dir).unwrap(), fit);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
