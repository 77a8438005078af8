use serde::Deserialize;
use std::{fs, path::Path};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_train_path")]
    pub train_path: String,
    /// May be left empty in the file and supplied on the command line.
    #[serde(default)]
    pub test_path: String,
    #[serde(default = "default_embeddings_path")]
    pub embeddings_path: String,
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_train_path() -> String {
    "data/train/".to_string()
}

fn default_embeddings_path() -> String {
    "roularta-160.txt".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    /// Seed for the oversampling step; fixed so re-runs are reproducible.
    #[serde(default)]
    pub smote_seed: u64,
    #[serde(default = "default_smote_neighbors")]
    pub smote_neighbors: usize,
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_epochs() -> usize {
    300
}

fn default_smote_neighbors() -> usize {
    5
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            smote_seed: 0,
            smote_neighbors: default_smote_neighbors(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Config with all defaults and the given test path; used when no
    /// config file is present.
    pub fn with_test_path(test_path: &str) -> Self {
        Config {
            train_path: default_train_path(),
            test_path: test_path.to_string(),
            embeddings_path: default_embeddings_path(),
            model: ModelConfig::default(),
        }
    }
}
