//! Numeric outlier detection using the mean and sample standard deviation.
//!
//! This is the same non-robust statistic a sheet's `STDEV` gives: one extreme
//! value inflates `σ` and can mask itself in a small column.

use super::{Detector, ScanContext};
use crate::config::QualityConfig;
use crate::error::Result;
use crate::pipeline::progress::ScanStage;
use crate::snapshot::{RepresentationClass, Snapshot, classify_column};
use crate::types::{Finding, IssueDetail, Severity};
use tracing::debug;

/// Mean and sample standard deviation (`n - 1` denominator).
pub(crate) fn mean_and_stddev(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// Flags numbers more than `sigma` standard deviations from their column's mean.
#[derive(Debug, Clone)]
pub struct OutlierDetector {
    sigma: f64,
    min_samples: usize,
    serial_range: (f64, f64),
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self::new(&QualityConfig::default())
    }
}

impl OutlierDetector {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            sigma: config.outlier_sigma,
            min_samples: config.outlier_min_samples,
            serial_range: config.serial_range(),
        }
    }
}

impl Detector for OutlierDetector {
    fn name(&self) -> &'static str {
        "outliers"
    }

    fn stage(&self) -> ScanStage {
        ScanStage::OutlierDetection
    }

    fn detect(&self, snapshot: &Snapshot, ctx: &mut ScanContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for col in 0..snapshot.col_count() {
            let mut cells = Vec::with_capacity(snapshot.data_row_count());
            for cell in snapshot.column(col) {
                ctx.tick()?;
                cells.push(cell);
            }

            // Date serials are excluded by classification
            let samples: Vec<(usize, f64)> = classify_column(cells, self.serial_range)
                .into_iter()
                .filter(|c| c.class == RepresentationClass::PlainNumber)
                .filter_map(|c| {
                    let n = snapshot.value(c.row, col)?.as_number()?;
                    n.is_finite().then_some((c.row, n))
                })
                .collect();
            if samples.len() < self.min_samples {
                continue;
            }

            let values: Vec<f64> = samples.iter().map(|(_, n)| *n).collect();
            let Some((mean, stddev)) = mean_and_stddev(&values) else {
                continue;
            };
            if stddev == 0.0 || !stddev.is_finite() {
                continue;
            }

            let column_name = snapshot.column_name(col);
            for (row, value) in samples {
                if (value - mean).abs() <= self.sigma * stddev {
                    continue;
                }
                let deviation = (value - mean) / stddev;
                debug!(
                    "Column '{}': {} is {:.2} sigma from mean {:.3}",
                    column_name, value, deviation, mean
                );
                findings.push(Finding::new(
                    Severity::Info,
                    snapshot.sheet().map(str::to_string),
                    [snapshot.cell_address(row, col)],
                    IssueDetail::Outlier {
                        column_name: column_name.clone(),
                        value,
                        mean,
                        stddev,
                        deviation,
                    },
                ));
            }
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::test_support::*;
    use crate::snapshot::{CellAddress, CellValue};

    fn detect(snapshot: &Snapshot) -> Vec<Finding> {
        OutlierDetector::default()
            .detect(snapshot, &mut ScanContext::unbounded())
            .unwrap()
    }

    #[test]
    fn test_mean_and_stddev() {
        let (mean, sd) = mean_and_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((sd - 2.138089935299395).abs() < 1e-12);
        assert!(mean_and_stddev(&[1.0]).is_none());
    }

    #[test]
    fn test_single_extreme_value_flagged() {
        let mut values = vec![2.0; 10];
        values.push(50.0);
        let snapshot = column_snapshot("Score", numbers(&values));
        let findings = detect(&snapshot);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].first_cell(), Some(CellAddress::new(11, 0)));
        match &findings[0].detail {
            IssueDetail::Outlier {
                value,
                mean,
                stddev,
                deviation,
                ..
            } => {
                assert_eq!(*value, 50.0);
                assert!((mean - 70.0 / 11.0).abs() < 1e-9);
                assert!((stddev - 14.4725).abs() < 1e-3);
                assert!(*deviation > 3.0 && *deviation < 3.05);
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_zero_variance_column_skipped() {
        let snapshot = column_snapshot("Score", numbers(&[2.0; 10]));
        assert!(detect(&snapshot).is_empty());
    }

    #[test]
    fn test_too_few_samples() {
        let snapshot = column_snapshot("Score", numbers(&[1.0, 1.0, 1000.0]));
        assert!(detect(&snapshot).is_empty());
    }

    #[test]
    fn test_text_and_serials_ignored() {
        let mut values = vec![CellValue::text("2024-01-01")];
        values.extend(numbers(&[45000.0, 45001.0, 45002.0, 45003.0, 45004.0]));
        values.extend(numbers(&[2.0e6]));
        let snapshot = column_snapshot("When", values);
        // serials are dates here; only the large number is plain, too few samples
        assert!(detect(&snapshot).is_empty());
    }
}
