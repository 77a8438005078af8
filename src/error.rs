use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors. The two receipt-shape conditions (`MissingFile`,
/// `NoPriorWord`) are surfaced as values so a caller can decide whether to
/// skip the offending receipt or halt the batch.
#[derive(Error, Debug)]
pub enum Error {
    /// No file in the receipt directory starts with the requested prefix.
    #[error("no `{}*` file found in {}", .role, .dir.display())]
    MissingFile { dir: PathBuf, role: &'static str },

    /// The total amount was located in the OCR stream but no alphabetic
    /// word precedes it — the annotations do not look like a receipt.
    #[error("no word precedes the total amount in {}", .path.display())]
    NoPriorWord { path: PathBuf },

    /// The directory walk found no receipt folders at all.
    #[error("no receipt directories found under {}", .path.display())]
    EmptyDataset { path: PathBuf },

    /// The ground-truth annotation file parsed but holds no entries.
    #[error("ground-truth file in {} has no entries", .dir.display())]
    EmptyGroundTruth { dir: PathBuf },

    #[error("embedding table {}: {}", .path.display(), .reason)]
    EmbeddingTable { path: PathBuf, reason: String },

    #[error("training table has no feature rows")]
    NoTrainingData,

    #[error("predict called before fit")]
    NotFitted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed annotation JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),
}
