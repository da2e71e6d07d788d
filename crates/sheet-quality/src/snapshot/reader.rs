//! Snapshot acquisition through an adapter.

use super::Snapshot;
use crate::adapter::{AdapterError, RangeData, SheetAdapter};
use crate::error::{QualityError, Result};
use crate::pipeline::progress::{
    CancellationToken, ProgressReporter, ProgressUpdate, ScanStage, report,
};
use crate::snapshot::RangeAddress;
use tracing::debug;

fn read_checked(adapter: &dyn SheetAdapter, address: &RangeAddress) -> Result<RangeData> {
    let failure = |source| QualityError::ReadFailure {
        address: address.to_string(),
        source,
    };
    let data = adapter.read_range(address).map_err(failure)?;

    let (rows, cols) = (address.row_count(), address.col_count());
    if !data.has_shape(rows, cols) {
        return Err(failure(AdapterError::ShapeMismatch {
            expected_rows: rows,
            expected_cols: cols,
            rows: data.row_count(),
            cols: data.col_count(),
        }));
    }
    Ok(data)
}

/// Read `address` into a [`Snapshot`].
///
/// Ranges taller than `chunk_rows` are read one row chunk at a time. After
/// every chunk a [`ScanStage::Reading`] update carrying `(rows_read, total)` is
/// reported and `token` is checked, so a cancelled read stops within one chunk.
pub fn read_snapshot(
    adapter: &dyn SheetAdapter,
    address: &RangeAddress,
    chunk_rows: usize,
    progress: Option<&dyn ProgressReporter>,
    token: Option<&CancellationToken>,
) -> Result<Snapshot> {
    let total = address.row_count();
    let chunk_rows = chunk_rows.max(1);
    let check = || token.map_or(Ok(()), CancellationToken::check);

    check()?;

    if total <= chunk_rows {
        let data = read_checked(adapter, address)?;
        report(
            progress,
            ProgressUpdate::with_items(
                ScanStage::Reading,
                format!("Rows 1-{}", total),
                total,
                total,
                format!("Read {}", address),
            ),
        );
        return Snapshot::from_range_data(address.clone(), data);
    }

    let mut values = Vec::with_capacity(total);
    let mut formulas = Vec::with_capacity(total);
    let mut offset = 0;
    while let Some(chunk) = address.row_slice(offset, chunk_rows) {
        let data = read_checked(adapter, &chunk)?;
        offset += chunk.row_count();
        values.extend(data.values);
        formulas.extend(data.formulas);

        debug!("Read rows {}/{} of {}", offset, total, address);
        report(
            progress,
            ProgressUpdate::with_items(
                ScanStage::Reading,
                format!("Rows {}-{}", offset - chunk.row_count() + 1, offset),
                offset,
                total,
                format!("Reading {}", address),
            ),
        );
        check()?;
    }

    Snapshot::new(address.clone(), values, formulas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemorySheet;
    use crate::pipeline::progress::ClosureProgressReporter;
    use crate::snapshot::{CellAddress, CellValue};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn tall_sheet(rows: usize) -> MemorySheet {
        let grid = (0..rows)
            .map(|r| vec![CellValue::Number(r as f64), CellValue::text(format!("r{r}"))])
            .collect();
        MemorySheet::with_sheet("Data", grid)
    }

    #[test]
    fn test_small_range_single_read() {
        let sheet = tall_sheet(10);
        let address = RangeAddress::parse("Data!A1:B10").unwrap();
        let snapshot = read_snapshot(&sheet, &address, 1000, None, None).unwrap();
        assert_eq!(snapshot.row_count(), 10);
        assert_eq!(snapshot.value(9, 1), Some(&CellValue::text("r9")));
    }

    #[test]
    fn test_chunked_read_reports_progress() {
        let sheet = tall_sheet(2500);
        sheet
            .set_cell(
                Some("Data"),
                CellAddress::new(1500, 1),
                CellValue::text("r1500"),
                Some("=\"r\"&A1501".to_string()),
            )
            .unwrap();
        let address = RangeAddress::parse("Data!A1:B2500").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let reporter = ClosureProgressReporter::new(move |u: ProgressUpdate| {
            seen_clone.lock().push((u.items_processed, u.items_total));
        });

        let snapshot = read_snapshot(&sheet, &address, 1000, Some(&reporter), None).unwrap();

        assert_eq!(snapshot.row_count(), 2500);
        assert_eq!(
            snapshot.value(2499, 0),
            Some(&CellValue::Number(2499.0))
        );
        // formulas survive chunk boundaries
        assert_eq!(snapshot.formula(1500, 1), Some("=\"r\"&A1501"));
        assert_eq!(snapshot.formula(1499, 1), None);
        assert_eq!(
            *seen.lock(),
            vec![
                (Some(1000), Some(2500)),
                (Some(2000), Some(2500)),
                (Some(2500), Some(2500)),
            ]
        );
    }

    #[test]
    fn test_cancel_stops_between_chunks() {
        let sheet = tall_sheet(5000);
        let address = RangeAddress::parse("Data!A1:B5000").unwrap();
        let token = CancellationToken::new();
        let chunks = Arc::new(Mutex::new(0usize));
        let (token_clone, chunks_clone) = (token.clone(), chunks.clone());
        let reporter = ClosureProgressReporter::new(move |_u: ProgressUpdate| {
            *chunks_clone.lock() += 1;
            token_clone.cancel();
        });

        let result = read_snapshot(&sheet, &address, 1000, Some(&reporter), Some(&token));
        assert!(matches!(result, Err(QualityError::Cancelled)));
        assert_eq!(*chunks.lock(), 1);
    }

    #[test]
    fn test_unknown_sheet_is_read_failure() {
        let sheet = tall_sheet(3);
        let address = RangeAddress::parse("Other!A1:B3").unwrap();
        let err = read_snapshot(&sheet, &address, 1000, None, None).unwrap_err();
        assert!(matches!(
            err,
            QualityError::ReadFailure {
                source: AdapterError::SheetNotFound(_),
                ..
            }
        ));
    }

    struct ShortReads;

    impl SheetAdapter for ShortReads {
        fn read_range(&self, _address: &RangeAddress) -> std::result::Result<RangeData, AdapterError> {
            Ok(RangeData::from_values(vec![vec![CellValue::Empty]]))
        }

        fn write_range(
            &self,
            _address: &RangeAddress,
            _values: &[Vec<CellValue>],
            _formulas: Option<&[Vec<Option<String>>]>,
        ) -> std::result::Result<(), AdapterError> {
            Ok(())
        }

        fn select_cells(
            &self,
            _sheet: Option<&str>,
            _cells: &[CellAddress],
        ) -> std::result::Result<(), AdapterError> {
            Ok(())
        }

        fn navigate_to(
            &self,
            _sheet: Option<&str>,
            _cell: CellAddress,
        ) -> std::result::Result<(), AdapterError> {
            Ok(())
        }
    }

    #[test]
    fn test_wrong_shape_is_read_failure() {
        let address = RangeAddress::parse("A1:B2").unwrap();
        let err = read_snapshot(&ShortReads, &address, 1000, None, None).unwrap_err();
        assert!(matches!(
            err,
            QualityError::ReadFailure {
                source: AdapterError::ShapeMismatch { rows: 1, .. },
                ..
            }
        ));
    }
}
