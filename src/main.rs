mod amounts;
mod annotations;
mod config;
mod embedding;
mod error;
mod features;
mod model;

use std::path::Path;
use tracing::info;

const CONFIG_PATH: &str = "receipt_totals.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing; predictions go to stdout, logs stay on stderr
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .init();

    // the test path can come from the config file or the command line
    let test_path_arg = std::env::args().nth(1);
    let mut cfg = if Path::new(CONFIG_PATH).exists() {
        config::Config::load(CONFIG_PATH)?
    } else {
        config::Config::with_test_path("")
    };
    if let Some(test_path) = test_path_arg {
        cfg.test_path = test_path;
    }
    if cfg.test_path.is_empty() {
        return Err(format!("usage: receipt_totals <test-path>  (or set test_path in {CONFIG_PATH})").into());
    }

    info!(train = %cfg.train_path, test = %cfg.test_path, "Loading datasets");

    let embeddings = embedding::EmbeddingTable::load(Path::new(&cfg.embeddings_path))?;
    let train = features::load_split(Path::new(&cfg.train_path), true)?;
    let test = features::load_split(Path::new(&cfg.test_path), false)?;

    info!(
        train_rows = train.rows.len(),
        train_receipts = train.receipt_count(),
        test_rows = test.rows.len(),
        test_receipts = test.receipt_count(),
        embedding_words = embeddings.len(),
        "Datasets loaded"
    );

    let mut model = model::TotalModel::new(train, test, embeddings, cfg.model);
    model.fit()?;

    for prediction in model.predict()? {
        println!("{},{}", prediction.directory, prediction.amount);
    }

    Ok(())
}
