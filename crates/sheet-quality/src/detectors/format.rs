//! Format consistency detection: mixed representations and inconsistent casing.

use super::{Detector, ScanContext};
use crate::config::QualityConfig;
use crate::error::Result;
use crate::pipeline::progress::ScanStage;
use crate::snapshot::{ClassifiedCell, RepresentationClass, Snapshot, classify_column};
use crate::types::{FormatExample, Finding, IssueDetail, Severity};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

fn of_class(classified: &[ClassifiedCell], class: RepresentationClass) -> Vec<&ClassifiedCell> {
    classified.iter().filter(|c| c.class == class).collect()
}

/// Checks each column for values stored in more than one representation, and
/// for text that differs only in letter case.
///
/// Two kinds of mix are reported, at most one per column:
/// - date serial numbers next to date text
/// - numbers next to numbers stored as text, when together they make up at
///   least `mixed_numeric_min_share` of the column
#[derive(Debug, Clone)]
pub struct FormatDetector {
    serial_range: (f64, f64),
    casing_text_share: f64,
    mixed_numeric_min_share: f64,
    max_examples: usize,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new(&QualityConfig::default())
    }
}

impl FormatDetector {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            serial_range: config.serial_range(),
            casing_text_share: config.casing_text_share,
            mixed_numeric_min_share: config.mixed_numeric_min_share,
            max_examples: config.max_examples,
        }
    }

    fn mixed_representation(
        &self,
        snapshot: &Snapshot,
        col: usize,
        classified: &[ClassifiedCell],
    ) -> Option<Finding> {
        let serials = of_class(classified, RepresentationClass::NumericDateSerial);
        let date_texts = of_class(classified, RepresentationClass::DateLikeText);

        // (native group, text group)
        let (native, text) = if !serials.is_empty() && !date_texts.is_empty() {
            (
                (RepresentationClass::NumericDateSerial, serials),
                (RepresentationClass::DateLikeText, date_texts),
            )
        } else {
            let numbers = of_class(classified, RepresentationClass::PlainNumber);
            let numeric_texts: Vec<&ClassifiedCell> =
                classified.iter().filter(|c| c.numeric_text).collect();
            if numbers.is_empty() || numeric_texts.is_empty() {
                return None;
            }
            let share = (numbers.len() + numeric_texts.len()) as f64 / classified.len() as f64;
            if share < self.mixed_numeric_min_share {
                return None;
            }
            (
                (RepresentationClass::PlainNumber, numbers),
                (RepresentationClass::PlainText, numeric_texts),
            )
        };

        let majority = match text.1.len().cmp(&native.1.len()) {
            Ordering::Greater => text.0,
            Ordering::Less => native.0,
            Ordering::Equal if native.0.is_native() => native.0,
            Ordering::Equal => text.0,
        };

        let mut groups = [native, text];
        groups.sort_by_key(|(class, _)| *class);
        let classes: Vec<RepresentationClass> = groups.iter().map(|(class, _)| *class).collect();

        let mut members: Vec<&ClassifiedCell> =
            groups.iter().flat_map(|(_, cells)| cells.iter().copied()).collect();
        members.sort_by_key(|c| c.row);

        let example = |cell: &ClassifiedCell| FormatExample {
            cell: snapshot.cell_address(cell.row, col),
            class: cell.class,
            text: snapshot
                .value(cell.row, col)
                .map(|v| v.display_text())
                .unwrap_or_default(),
        };
        let mut examples: Vec<FormatExample> =
            groups.iter().map(|(_, cells)| example(cells[0])).collect();
        for cell in &members {
            if examples.len() >= self.max_examples {
                break;
            }
            let address = snapshot.cell_address(cell.row, col);
            if !examples.iter().any(|e| e.cell == address) {
                examples.push(example(*cell));
            }
        }
        examples.truncate(self.max_examples);

        let column_name = snapshot.column_name(col);
        debug!(
            "Column '{}': {} cells mix {:?} (majority {:?})",
            column_name,
            members.len(),
            classes,
            majority
        );

        Some(Finding::new(
            Severity::Warning,
            snapshot.sheet().map(str::to_string),
            members.iter().map(|c| snapshot.cell_address(c.row, col)),
            IssueDetail::MixedFormat {
                column_name,
                classes,
                majority,
                examples,
            },
        ))
    }

    fn inconsistent_casing(
        &self,
        snapshot: &Snapshot,
        col: usize,
        classified: &[ClassifiedCell],
    ) -> Vec<Finding> {
        let plain: Vec<&ClassifiedCell> = classified
            .iter()
            .filter(|c| c.class == RepresentationClass::PlainText)
            .collect();
        if (plain.len() as f64) <= self.casing_text_share * classified.len() as f64 {
            return Vec::new();
        }

        struct Group {
            lower: String,
            variants: Vec<String>,
            rows: Vec<usize>,
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        for cell in plain {
            let Some(text) = snapshot.value(cell.row, col).and_then(|v| v.as_text()) else {
                continue;
            };
            let spelling = text.trim();
            let lower = spelling.to_lowercase();
            let idx = *index.entry(lower.clone()).or_insert_with(|| {
                groups.push(Group {
                    lower,
                    variants: Vec::new(),
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[idx];
            if !group.variants.iter().any(|v| v == spelling) {
                group.variants.push(spelling.to_string());
            }
            group.rows.push(cell.row);
        }

        let column_name = snapshot.column_name(col);
        groups
            .into_iter()
            .filter(|g| g.variants.len() >= 2)
            .map(|g| {
                debug!(
                    "Column '{}': {} spellings of '{}'",
                    column_name,
                    g.variants.len(),
                    g.lower
                );
                let cells: Vec<_> = g
                    .rows
                    .iter()
                    .map(|r| snapshot.cell_address(*r, col))
                    .collect();
                Finding::new(
                    Severity::Info,
                    snapshot.sheet().map(str::to_string),
                    cells.clone(),
                    IssueDetail::InconsistentCasing {
                        column_name: column_name.clone(),
                        canonical_lower: g.lower,
                        variants: g.variants,
                        cells,
                    },
                )
            })
            .collect()
    }
}

impl Detector for FormatDetector {
    fn name(&self) -> &'static str {
        "format_consistency"
    }

    fn stage(&self) -> ScanStage {
        ScanStage::FormatDetection
    }

    fn detect(&self, snapshot: &Snapshot, ctx: &mut ScanContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for col in 0..snapshot.col_count() {
            let mut cells = Vec::with_capacity(snapshot.data_row_count());
            for cell in snapshot.column(col) {
                ctx.tick()?;
                cells.push(cell);
            }
            let classified = classify_column(cells, self.serial_range);
            if classified.is_empty() {
                continue;
            }

            findings.extend(self.mixed_representation(snapshot, col, &classified));
            findings.extend(self.inconsistent_casing(snapshot, col, &classified));
        }

        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::test_support::*;
    use crate::snapshot::{CellAddress, CellValue};
    use crate::types::IssueKind;
    use pretty_assertions::assert_eq;

    fn detect(snapshot: &Snapshot) -> Vec<Finding> {
        FormatDetector::default()
            .detect(snapshot, &mut ScanContext::unbounded())
            .unwrap()
    }

    #[test]
    fn test_serials_mixed_with_date_text() {
        let snapshot = column_snapshot(
            "Date",
            vec![
                CellValue::text("2024-01-05"),
                CellValue::Number(45296.0),
                CellValue::text("2024-01-07"),
                CellValue::Number(45298.0),
            ],
        );
        let findings = detect(&snapshot);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].affected_cells.len(), 4);

        match &findings[0].detail {
            IssueDetail::MixedFormat {
                classes,
                majority,
                examples,
                ..
            } => {
                assert_eq!(
                    classes,
                    &vec![
                        RepresentationClass::NumericDateSerial,
                        RepresentationClass::DateLikeText
                    ]
                );
                // tie goes to the native class
                assert_eq!(*majority, RepresentationClass::NumericDateSerial);
                assert_eq!(examples.len(), 3);
                assert_eq!(examples[0].cell, CellAddress::new(2, 0));
                assert_eq!(examples[1].cell, CellAddress::new(1, 0));
                assert_eq!(examples[2].cell, CellAddress::new(3, 0));
            }
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_numbers_mixed_with_numeric_text() {
        let mut values = texts(&["10", "1,500", "12"]);
        values.extend(numbers(&[20.0, 30.0]));
        let snapshot = column_snapshot("Qty", values);
        let findings = detect(&snapshot);
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            &findings[0].detail,
            IssueDetail::MixedFormat { majority: RepresentationClass::PlainText, .. }
        ));
    }

    #[test]
    fn test_numeric_text_tie_goes_to_numbers() {
        let mut values = texts(&["10", "12"]);
        values.extend(numbers(&[20.0, 30.0]));
        let findings = detect(&column_snapshot("Qty", values));
        assert!(matches!(
            &findings[0].detail,
            IssueDetail::MixedFormat { majority: RepresentationClass::PlainNumber, .. }
        ));
    }

    #[test]
    fn test_stray_numeric_text_in_text_column_ignored() {
        let mut values = texts(&["Ann", "Bob", "Cho", "12"]);
        values.push(CellValue::Number(5.0));
        let snapshot = column_snapshot("Name", values);
        assert!(
            detect(&snapshot)
                .iter()
                .all(|f| f.kind() != IssueKind::MixedFormat)
        );
    }

    #[test]
    fn test_plain_numbers_are_consistent() {
        let snapshot = column_snapshot("Score", numbers(&[2.0, 2.0, 2.0, 50.0]));
        assert!(detect(&snapshot).is_empty());
    }

    #[test]
    fn test_inconsistent_casing() {
        let snapshot = column_snapshot(
            "Fruit",
            texts(&["Apple", "apple", "APPLE ", "Pear", "pear", "Kiwi"]),
        );
        let findings = detect(&snapshot);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Info));

        match &findings[0].detail {
            IssueDetail::InconsistentCasing {
                canonical_lower,
                variants,
                cells,
                ..
            } => {
                assert_eq!(canonical_lower, "apple");
                assert_eq!(variants, &vec!["Apple", "apple", "APPLE"]);
                assert_eq!(cells.len(), 3);
            }
            other => panic!("unexpected detail {:?}", other),
        }
        assert_eq!(findings[1].affected_cells.len(), 2);
    }

    #[test]
    fn test_casing_skipped_in_mostly_numeric_column() {
        let mut values = numbers(&[1.0, 2.0, 3.0]);
        values.extend(texts(&["n/a", "N/A"]));
        let snapshot = column_snapshot("Value", values);
        assert!(detect(&snapshot).is_empty());
    }
}
