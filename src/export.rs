//! Submission export
//!
//! One CSV row per source: `customer_id,prediction`, where `prediction` is
//! the predicted destination ids joined by single spaces, best first.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dataset::InteractionDataset;
use crate::error::{LinkPropError, Result};

pub const SUBMISSION_HEADER: &str = "customer_id,prediction";

/// A source id and its ranked destination ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRow {
    pub source: String,
    pub predictions: Vec<String>,
}

impl SubmissionRow {
    /// The space-joined prediction field.
    pub fn prediction_field(&self) -> String {
        self.predictions.join(" ")
    }
}

/// Map row-aligned predicted column ids back to external ids.
///
/// `predictions[i]` belongs to source row `i`; rows beyond the prediction
/// list are not emitted.
pub fn submission_rows(
    dataset: &InteractionDataset,
    predictions: &[Vec<usize>],
) -> Result<Vec<SubmissionRow>> {
    predictions
        .iter()
        .enumerate()
        .map(|(row, cols)| {
            let source = dataset
                .sources
                .id(row)
                .ok_or_else(|| out_of_range(row, 0, dataset))?
                .to_string();
            let predictions = cols
                .iter()
                .map(|&col| {
                    dataset
                        .destinations
                        .id(col)
                        .map(str::to_string)
                        .ok_or_else(|| out_of_range(row, col, dataset))
                })
                .collect::<Result<_>>()?;
            Ok(SubmissionRow {
                source,
                predictions,
            })
        })
        .collect()
}

fn out_of_range(row: usize, col: usize, dataset: &InteractionDataset) -> LinkPropError {
    LinkPropError::Index {
        row,
        col,
        rows: dataset.sources.len(),
        cols: dataset.destinations.len(),
    }
}

/// Write rows as CSV with a header line.
pub fn write_submission_csv<W: Write>(writer: &mut W, rows: &[SubmissionRow]) -> Result<()> {
    writeln!(writer, "{SUBMISSION_HEADER}")?;
    for row in rows {
        writeln!(writer, "{},{}", row.source, row.prediction_field())?;
    }
    Ok(())
}

/// Write rows to a CSV file at `path`, creating parent directories.
pub fn write_submission(path: &Path, rows: &[SubmissionRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    write_submission_csv(&mut writer, rows)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "submission written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> InteractionDataset {
        InteractionDataset::from_transactions(
            vec!["c1", "c2"],
            vec!["0108775015", "0108775044", "0110065001"],
            &[("c1", "0108775015")],
        )
        .unwrap()
    }

    #[test]
    fn test_rows_map_back_to_ids() {
        let rows = submission_rows(&dataset(), &[vec![2, 0], vec![]]).unwrap();
        assert_eq!(rows[0].source, "c1");
        assert_eq!(rows[0].prediction_field(), "0110065001 0108775015");
        assert_eq!(rows[1].prediction_field(), "");
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = submission_rows(&dataset(), &[vec![7]]).unwrap_err();
        assert!(matches!(err, LinkPropError::Index { col: 7, .. }));

        let err = submission_rows(&dataset(), &[vec![], vec![], vec![0]]).unwrap_err();
        assert!(matches!(err, LinkPropError::Index { row: 2, .. }));
    }

    #[test]
    fn test_csv_layout() {
        let rows = submission_rows(&dataset(), &[vec![1], vec![0, 2]]).unwrap();
        let mut out = Vec::new();
        write_submission_csv(&mut out, &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "customer_id,prediction\nc1,0108775044\nc2,0108775015 0110065001\n"
        );
    }

    #[test]
    fn test_write_submission_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("submission.csv");
        let rows = submission_rows(&dataset(), &[vec![0]]).unwrap();
        write_submission(&path, &rows).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(SUBMISSION_HEADER));
        assert_eq!(text.lines().count(), 2);
    }
}
