// src/features.rs
//
// Turns walked receipt directories into a flat feature table: one row per
// alphabetic OCR word, with averaged box coordinates and (for training
// data) a label marking words that immediately precede the total amount.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::annotations::{self, ReceiptDir, VisionFile};
use crate::error::{Error, Result};

/// One feature row: an alphabetic word from one receipt.
#[derive(Debug, Clone)]
pub struct WordRow {
    pub receipt_id: usize,
    pub path: PathBuf,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// `Some(true)` when the word immediately precedes the ground-truth
    /// amount in the OCR stream; `None` on unlabeled (test) data.
    pub label: Option<bool>,
}

/// All word rows of one dataset split, in receipt discovery order.
#[derive(Debug, Default)]
pub struct FeatureTable {
    pub rows: Vec<WordRow>,
}

impl FeatureTable {
    pub fn receipt_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.receipt_id + 1)
            .max()
            .unwrap_or(0)
    }
}

fn strip_alnum(token: &str) -> String {
    token.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn is_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphabetic())
}

/// Walk backward from `idx` until an alphabetic token turns up, and return
/// it stripped and lowercased. Running off the front of the stream means
/// the annotations are not receipt-shaped.
fn prior_word(words: &[&str], idx: usize, path: &Path) -> Result<String> {
    for i in (0..idx).rev() {
        let stripped = strip_alnum(words[i]);
        if is_alpha(&stripped) {
            return Ok(stripped.to_lowercase());
        }
    }
    Err(Error::NoPriorWord {
        path: path.to_path_buf(),
    })
}

/// Words that immediately precede an occurrence of `value` in the OCR text
/// stream. Tokens are stripped of punctuation and leading zeros before
/// comparison; a value split across two tokens ("12" + ".50") also counts,
/// matched against the raw next token.
fn collect_target_words(full_text: &str, value: &str, path: &Path) -> Result<Vec<String>> {
    let words: Vec<&str> = full_text.split_whitespace().collect();
    let mut targets = Vec::new();

    for (idx, word) in words.iter().enumerate() {
        let stripped = strip_alnum(word);
        let stripped = stripped.trim_start_matches('0');

        let matched = stripped == value
            || words
                .get(idx + 1)
                .is_some_and(|next| format!("{stripped}{next}") == value);
        if matched {
            targets.push(prior_word(&words, idx, path)?);
        }
    }
    Ok(targets)
}

/// Feature rows for one receipt. Entry 0 of the annotation list is the
/// full-text blob and is skipped; only purely alphabetic words become
/// rows. With a ground-truth `target_value`, rows whose word appears in
/// the target-word set are labeled 1, everything else 0.
pub fn extract_receipt(
    receipt: &ReceiptDir,
    vision: &VisionFile,
    target_value: Option<&str>,
) -> Result<Vec<WordRow>> {
    let mut rows = Vec::new();

    for entry in vision.text_annotations.iter().skip(1) {
        if is_alpha(&entry.description) {
            let (x, y) = annotations::average_coordinates(entry);
            rows.push(WordRow {
                receipt_id: receipt.index,
                path: receipt.path.clone(),
                name: entry.description.to_lowercase(),
                x,
                y,
                label: None,
            });
        }
    }

    if let Some(value) = target_value {
        let targets = collect_target_words(vision.full_text(), value, &receipt.path)?;
        for row in &mut rows {
            row.label = Some(targets.iter().any(|t| t == &row.name));
        }
    }

    Ok(rows)
}

/// Load every receipt under `root` into one flat table. `labeled` selects
/// whether ground-truth annotation files are read and labels derived.
pub fn load_split(root: &Path, labeled: bool) -> Result<FeatureTable> {
    let receipts = annotations::walk_receipt_dirs(root)?;
    let mut table = FeatureTable::default();

    for receipt in &receipts {
        let vision = annotations::load_vision(&receipt.path)?;
        let value = if labeled {
            Some(annotations::load_ground_truth(&receipt.path)?)
        } else {
            None
        };
        let rows = extract_receipt(receipt, &vision, value.as_deref())?;
        if rows.is_empty() {
            warn!(path = %receipt.path.display(), "Receipt produced no feature rows");
        }
        debug!(
            receipt = receipt.index,
            path = %receipt.path.display(),
            words = rows.len(),
            "Receipt loaded"
        );
        table.rows.extend(rows);
    }
    Ok(table)
}
