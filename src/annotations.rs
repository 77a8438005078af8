// src/annotations.rs
//
// Reading and walking the per-receipt annotation directories. Each receipt
// folder holds a `vision*` JSON (OCR word list with bounding polygons) and,
// for training data, an `annotations*` JSON carrying the true total amount.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Parsed `vision*` file: the OCR output for one receipt image.
#[derive(Debug, Deserialize)]
pub struct VisionFile {
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
}

impl VisionFile {
    /// The full-text blob the OCR engine emits as entry 0. Entries 1..n
    /// are the discrete words.
    pub fn full_text(&self) -> &str {
        self.text_annotations
            .first()
            .map(|a| a.description.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
pub struct TextAnnotation {
    pub description: String,
    #[serde(default)]
    pub bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// One polygon corner. The OCR backend omits the `x` or `y` key when the
/// point sits on the image border, so both are optional.
#[derive(Debug, Default, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

/// One entry of the ground-truth `annotations*` file. Only the first
/// entry's `value` (the total amount) is used.
#[derive(Debug, Deserialize)]
pub struct GroundTruthEntry {
    pub value: AmountValue,
}

/// Ground-truth amounts appear both as JSON strings and bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for AmountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountValue::Text(s) => f.write_str(s),
            AmountValue::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            AmountValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A receipt folder discovered during the walk, numbered in discovery
/// order. The id ties feature rows back to their receipt.
#[derive(Debug, Clone)]
pub struct ReceiptDir {
    pub index: usize,
    pub path: PathBuf,
}

/// Parse the first file in `dir` whose name starts with `role`.
/// Entries are visited in name order so the choice is deterministic.
pub fn load_role_file<T: serde::de::DeserializeOwned>(dir: &Path, role: &'static str) -> Result<T> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();

    for name in names {
        if name.starts_with(role) {
            let content = fs::read_to_string(dir.join(&name))?;
            return Ok(serde_json::from_str(&content)?);
        }
    }
    Err(Error::MissingFile {
        dir: dir.to_path_buf(),
        role,
    })
}

pub fn load_vision(dir: &Path) -> Result<VisionFile> {
    load_role_file(dir, "vision")
}

/// The true total amount for a training receipt, as a string.
pub fn load_ground_truth(dir: &Path) -> Result<String> {
    let entries: Vec<GroundTruthEntry> = load_role_file(dir, "annotations")?;
    let first = entries.first().ok_or_else(|| Error::EmptyGroundTruth {
        dir: dir.to_path_buf(),
    })?;
    Ok(first.value.to_string())
}

/// Recursively collect receipt folders under `root`: any directory holding
/// more than one file. Directories with a single file or none are treated
/// as intermediate levels and skipped.
pub fn walk_receipt_dirs(root: &Path) -> Result<Vec<ReceiptDir>> {
    let mut dirs = Vec::new();
    walk(root, &mut dirs)?;
    if dirs.is_empty() {
        return Err(Error::EmptyDataset {
            path: root.to_path_buf(),
        });
    }
    Ok(dirs
        .into_iter()
        .enumerate()
        .map(|(index, path)| ReceiptDir { index, path })
        .collect())
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut file_count = 0usize;
    let mut subdirs = Vec::new();
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            file_count += 1;
        }
    }

    if file_count > 1 {
        out.push(dir.to_path_buf());
    }
    for sub in subdirs {
        walk(&sub, out)?;
    }
    Ok(())
}

/// Average of the bounding polygon's corners. Each present vertex
/// contributes a quarter of its value; a missing vertex or coordinate key
/// contributes nothing, so a partial box yields a partial sum rather than
/// a re-normalized mean.
pub fn average_coordinates(annotation: &TextAnnotation) -> (f64, f64) {
    let mut avg_x = 0.0;
    let mut avg_y = 0.0;
    if let Some(poly) = &annotation.bounding_poly {
        for vertex in poly.vertices.iter().take(4) {
            avg_x += vertex.x.unwrap_or(0.0) * 0.25;
            avg_y += vertex.y.unwrap_or(0.0) * 0.25;
        }
    }
    (avg_x, avg_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    fn write_file(path: &Path, content: &str) {
        let mut f = File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_walk_skips_single_file_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();

        // intermediate level with one stray file
        touch(&root.join("readme.txt"));

        let a = root.join("receipts").join("a");
        let b = root.join("receipts").join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        touch(&a.join("annotations.json"));
        touch(&a.join("vision.json"));
        // b has only one file, so it is not a receipt folder
        touch(&b.join("vision.json"));

        let dirs = walk_receipt_dirs(root).unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].index, 0);
        assert_eq!(dirs[0].path, a);
    }

    #[test]
    fn test_walk_order_is_deterministic() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["c", "a", "b"] {
            let dir = tmp.path().join(name);
            fs::create_dir(&dir).unwrap();
            touch(&dir.join("vision.json"));
            touch(&dir.join("scan.png"));
        }
        let first = walk_receipt_dirs(tmp.path()).unwrap();
        let second = walk_receipt_dirs(tmp.path()).unwrap();
        let names: Vec<_> = first
            .iter()
            .map(|r| r.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(first.len(), second.len());
        for (x, y) in first.iter().zip(second.iter()) {
            assert_eq!(x.path, y.path);
        }
    }

    #[test]
    fn test_empty_dataset_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = walk_receipt_dirs(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset { .. }));
    }

    #[test]
    fn test_missing_role_file() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("vision.json"));
        let err = load_ground_truth(tmp.path()).unwrap_err();
        match err {
            Error::MissingFile { dir, role } => {
                assert_eq!(dir, tmp.path());
                assert_eq!(role, "annotations");
            }
            other => panic!("expected MissingFile, got {other:?}"),
        }
    }

    #[test]
    fn test_ground_truth_string_and_number() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            &tmp.path().join("annotations-1.json"),
            r#"[{"value": "1250"}]"#,
        );
        assert_eq!(load_ground_truth(tmp.path()).unwrap(), "1250");

        let tmp2 = tempfile::tempdir().unwrap();
        write_file(&tmp2.path().join("annotations.json"), r#"[{"value": 12}]"#);
        assert_eq!(load_ground_truth(tmp2.path()).unwrap(), "12");
    }

    #[test]
    fn test_average_coordinates_full_box() {
        let annotation: TextAnnotation = serde_json::from_str(
            r#"{
                "description": "total",
                "bounding_poly": {"vertices": [
                    {"x": 10, "y": 20}, {"x": 30, "y": 20},
                    {"x": 30, "y": 40}, {"x": 10, "y": 40}
                ]}
            }"#,
        )
        .unwrap();
        let (x, y) = average_coordinates(&annotation);
        assert_eq!(x, 20.0);
        assert_eq!(y, 30.0);
    }

    #[test]
    fn test_average_coordinates_partial_box_is_a_partial_sum() {
        // one corner missing entirely, another missing its y
        let annotation: TextAnnotation = serde_json::from_str(
            r#"{
                "description": "total",
                "bounding_poly": {"vertices": [
                    {"x": 10, "y": 20}, {"x": 30}, {"x": 30, "y": 40}
                ]}
            }"#,
        )
        .unwrap();
        let (x, y) = average_coordinates(&annotation);
        assert_eq!(x, (10.0 + 30.0 + 30.0) * 0.25);
        assert_eq!(y, (20.0 + 40.0) * 0.25);
    }

    #[test]
    fn test_no_bounding_poly_contributes_zero() {
        let annotation: TextAnnotation =
            serde_json::from_str(r#"{"description": "total"}"#).unwrap();
        assert_eq!(average_coordinates(&annotation), (0.0, 0.0));
    }
}
