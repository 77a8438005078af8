// src/model.rs
//
// The classifier side of the pipeline: class-balancing via SMOTE, a
// logistic regression fitted by batch gradient descent, and per-receipt
// selection of the word most likely to precede the total amount.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

use crate::amounts;
use crate::annotations;
use crate::config::ModelConfig;
use crate::embedding::{EMBEDDING_DIM, EmbeddingTable};
use crate::error::{Error, Result};
use crate::features::FeatureTable;

/// One column per embedding dimension plus the two averaged coordinates.
const FEATURE_DIM: usize = EMBEDDING_DIM + 2;

/// The word selected for one test receipt at inference time.
#[derive(Debug, Clone)]
pub struct TargetWord {
    pub receipt_id: usize,
    pub path: PathBuf,
    pub word: String,
}

/// Final prediction for one test receipt.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub directory: String,
    pub amount: String,
}

/// Pipeline context: both dataset splits, the shared embedding table and
/// the fitted weights. Created once, then driven through fit and predict.
pub struct TotalModel {
    train: FeatureTable,
    test: FeatureTable,
    embeddings: EmbeddingTable,
    cfg: ModelConfig,
    weights: Option<Array1<f64>>,
    bias: f64,
}

impl TotalModel {
    pub fn new(
        train: FeatureTable,
        test: FeatureTable,
        embeddings: EmbeddingTable,
        cfg: ModelConfig,
    ) -> Self {
        TotalModel {
            train,
            test,
            embeddings,
            cfg,
            weights: None,
            bias: 0.0,
        }
    }

    /// Row-major matrix of `[embedding | x | y]` features.
    fn feature_matrix(&self, table: &FeatureTable) -> Array2<f64> {
        let mut data = Vec::with_capacity(table.rows.len() * FEATURE_DIM);
        for row in &table.rows {
            let vector = self.embeddings.lookup(&row.name);
            data.extend(vector.iter().map(|&v| f64::from(v)));
            data.push(row.x);
            data.push(row.y);
        }
        Array2::from_shape_vec((table.rows.len(), FEATURE_DIM), data)
            .expect("row count and FEATURE_DIM agree with the data length")
    }

    /// Balance the classes and fit the logistic regression.
    pub fn fit(&mut self) -> Result<()> {
        if self.train.rows.is_empty() {
            return Err(Error::NoTrainingData);
        }
        let x = self.feature_matrix(&self.train);
        let y: Array1<f64> = self
            .train
            .rows
            .iter()
            .map(|r| if r.label == Some(true) { 1.0 } else { 0.0 })
            .collect();

        let (x_balanced, y_balanced) =
            smote_resample(&x, &y, self.cfg.smote_seed, self.cfg.smote_neighbors);
        info!(
            rows = x_balanced.nrows(),
            positives = y_balanced.sum() as usize,
            epochs = self.cfg.epochs,
            "Fitting logistic regression"
        );

        let (weights, bias) = fit_logistic(
            &x_balanced,
            &y_balanced,
            self.cfg.learning_rate,
            self.cfg.epochs,
        );
        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    /// Positive-class probability for every test row, then per receipt the
    /// argmax row. No probability threshold: one word per receipt, always.
    fn select_targets(&self, probabilities: &Array1<f64>) -> Vec<TargetWord> {
        use std::collections::BTreeMap;

        let mut best: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for (i, (row, &p)) in self.test.rows.iter().zip(probabilities.iter()).enumerate() {
            match best.get(&row.receipt_id) {
                // ties keep the earliest row
                Some(&(top, _)) if top >= p => {}
                _ => {
                    best.insert(row.receipt_id, (p, i));
                }
            }
        }

        best.into_iter()
            .map(|(receipt_id, (_, i))| {
                let row = &self.test.rows[i];
                TargetWord {
                    receipt_id,
                    path: row.path.clone(),
                    word: row.name.clone(),
                }
            })
            .collect()
    }

    /// Predict the total amount of every test receipt, in discovery order.
    pub fn predict(&self) -> Result<Vec<Prediction>> {
        let weights = self.weights.as_ref().ok_or(Error::NotFitted)?;
        let x = self.feature_matrix(&self.test);
        let probabilities = (x.dot(weights) + self.bias).mapv(sigmoid);

        let mut predictions = Vec::new();
        for target in self.select_targets(&probabilities) {
            let vision = annotations::load_vision(&target.path)?;
            let amount = amounts::extract_amount(vision.full_text(), &target.word);
            let directory = target
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            info!(
                receipt = target.receipt_id,
                word = %target.word,
                amount = %amount,
                "Predicted total"
            );
            predictions.push(Prediction { directory, amount });
        }
        Ok(predictions)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Batch gradient descent on the mean log-loss. Deterministic: weights
/// start at zero and the data order is fixed.
pub fn fit_logistic(
    x: &Array2<f64>,
    y: &Array1<f64>,
    learning_rate: f64,
    epochs: usize,
) -> (Array1<f64>, f64) {
    let n = x.nrows() as f64;
    let mut weights = Array1::<f64>::zeros(x.ncols());
    let mut bias = 0.0;

    for _ in 0..epochs {
        let predicted = (x.dot(&weights) + bias).mapv(sigmoid);
        let residual = &predicted - y;
        let grad_w = x.t().dot(&residual) / n;
        let grad_b = residual.sum() / n;
        weights.scaled_add(-learning_rate, &grad_w);
        bias -= learning_rate * grad_b;
    }
    (weights, bias)
}

/// Deterministic SMOTE: synthesize minority-class rows by interpolating
/// between a random minority sample and one of its `k` nearest minority
/// neighbours until both classes are the same size. A lone minority
/// sample is duplicated as-is.
pub fn smote_resample(
    x: &Array2<f64>,
    y: &Array1<f64>,
    seed: u64,
    k: usize,
) -> (Array2<f64>, Array1<f64>) {
    let positives: Vec<usize> = (0..y.len()).filter(|&i| y[i] == 1.0).collect();
    let negatives: Vec<usize> = (0..y.len()).filter(|&i| y[i] != 1.0).collect();

    let (minority, minority_label, deficit) = if positives.len() < negatives.len() {
        let deficit = negatives.len() - positives.len();
        (positives, 1.0, deficit)
    } else {
        let deficit = positives.len() - negatives.len();
        (negatives, 0.0, deficit)
    };
    if deficit == 0 || minority.is_empty() {
        return (x.clone(), y.clone());
    }

    // k nearest minority neighbours of each minority row
    let neighbours: Vec<Vec<usize>> = minority
        .iter()
        .map(|&i| {
            let mut dists: Vec<(usize, f64)> = minority
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| {
                    let d = (&x.row(i) - &x.row(j)).mapv(|v| v * v).sum();
                    (j, d)
                })
                .collect();
            dists.sort_by(|a, b| a.1.total_cmp(&b.1));
            dists.into_iter().take(k).map(|(j, _)| j).collect()
        })
        .collect();

    let dim = x.ncols();
    let mut data: Vec<f64> = Vec::with_capacity((x.nrows() + deficit) * dim);
    for i in 0..x.nrows() {
        data.extend(x.row(i).iter().copied());
    }
    let mut labels: Vec<f64> = y.to_vec();

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..deficit {
        let pos = rng.random_range(0..minority.len());
        let base = x.row(minority[pos]);
        let nbrs = &neighbours[pos];
        if nbrs.is_empty() {
            data.extend(base.iter().copied());
        } else {
            let other = x.row(nbrs[rng.random_range(0..nbrs.len())]);
            let gap: f64 = rng.random();
            data.extend(
                base.iter()
                    .zip(other.iter())
                    .map(|(&a, &b)| a + gap * (b - a)),
            );
        }
        labels.push(minority_label);
    }

    let rows = labels.len();
    (
        Array2::from_shape_vec((rows, dim), data).expect("synthesized rows are row-major"),
        Array1::from_vec(labels),
    )
}
