use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Width of the pretrained vectors (roularta-160).
pub const EMBEDDING_DIM: usize = 160;

/// Pretrained word-embedding table in word2vec text format: one word and
/// its vector per line, with an optional `count dim` header line. Loaded
/// once and shared immutably across the batch.
#[derive(Debug)]
pub struct EmbeddingTable {
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingTable {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut vectors = HashMap::new();

        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values = parts
                .map(str::parse)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| Error::EmbeddingTable {
                    path: path.to_path_buf(),
                    reason: format!("line {}: {e}", lineno + 1),
                })?;

            // "384823 160" style header
            if lineno == 0 && values.len() == 1 && word.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if values.len() != EMBEDDING_DIM {
                return Err(Error::EmbeddingTable {
                    path: path.to_path_buf(),
                    reason: format!(
                        "line {}: expected {EMBEDDING_DIM} values, got {}",
                        lineno + 1,
                        values.len()
                    ),
                });
            }
            vectors.insert(word.to_string(), values);
        }

        info!(words = vectors.len(), path = %path.display(), "Embedding table loaded");
        Ok(EmbeddingTable { vectors })
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, Vec<f32>)>) -> Self {
        EmbeddingTable {
            vectors: pairs.into_iter().collect(),
        }
    }

    /// Vector for `word`, or the zero vector when the word is unknown.
    pub fn lookup(&self, word: &str) -> Vec<f32> {
        self.vectors
            .get(word)
            .cloned()
            .unwrap_or_else(|| vec![0.0; EMBEDDING_DIM])
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
