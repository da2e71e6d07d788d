//! Fix actions: which fixes an issue offers, and what a fix writes.
//!
//! | Issue              | Actions                                    |
//! |--------------------|--------------------------------------------|
//! | Duplicate          | `RemoveDuplicates` (confirmed), `HighlightOnly` |
//! | MissingValue       | `GoToCell`                                 |
//! | MixedFormat        | `StandardizeFormat` to the majority class  |
//! | InconsistentCasing | `StandardizeFormat` to the first spelling  |
//! | Outlier            | `HighlightOnly`                            |
//!
//! Missing values and outliers need a human decision, so they never get a
//! mutating action.

pub mod convert;
mod plan;

pub use plan::{MutationPlan, plan_mutation};

use crate::types::{FixAction, FixKind, FixParams, Issue, IssueDetail, StandardizeTarget};

/// Candidate fix actions for `issue`, most useful first.
pub fn resolve_fix_actions(issue: &Issue) -> Vec<FixAction> {
    let action = |kind: FixKind, label: String, target: Option<StandardizeTarget>| FixAction {
        id: format!("{}:{}", issue.id, kind.slug()),
        issue_id: issue.id.clone(),
        kind,
        label,
        requires_confirmation: kind == FixKind::RemoveDuplicates,
        params: FixParams {
            sheet: issue.sheet.clone(),
            cells: issue.affected_cells.iter().copied().collect(),
            target,
        },
    };

    match &issue.detail {
        IssueDetail::Duplicate { value, count, .. } => vec![
            action(
                FixKind::RemoveDuplicates,
                format!(
                    "Remove {} later occurrence(s) of '{}'",
                    count.saturating_sub(1),
                    value.display_text().trim()
                ),
                None,
            ),
            action(
                FixKind::HighlightOnly,
                format!("Highlight {} cells", count),
                None,
            ),
        ],
        IssueDetail::MissingValue { cells, .. } => {
            let label = match cells.first() {
                Some(first) => format!("Go to {}", first),
                None => "Go to cell".to_string(),
            };
            vec![action(FixKind::GoToCell, label, None)]
        }
        IssueDetail::MixedFormat { majority, .. } => vec![action(
            FixKind::StandardizeFormat,
            format!("Convert all to {}", majority.display_name()),
            Some(StandardizeTarget::Representation { class: *majority }),
        )],
        IssueDetail::InconsistentCasing {
            canonical_lower,
            variants,
            ..
        } => {
            let canonical = variants
                .first()
                .cloned()
                .unwrap_or_else(|| canonical_lower.clone());
            vec![action(
                FixKind::StandardizeFormat,
                format!("Use '{}' everywhere", canonical),
                Some(StandardizeTarget::Casing {
                    canonical,
                    canonical_lower: canonical_lower.clone(),
                }),
            )]
        }
        IssueDetail::Outlier { value, .. } => vec![action(
            FixKind::HighlightOnly,
            format!("Highlight {}", crate::utils::format_number(*value)),
            None,
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Scanner;
    use crate::snapshot::test_support::*;
    use crate::snapshot::{CellAddress, CellValue, RepresentationClass};
    use crate::types::IssueKind;
    use pretty_assertions::assert_eq;

    fn first_issue(header: &str, values: Vec<CellValue>, kind: IssueKind) -> Issue {
        Scanner::default()
            .scan(&column_snapshot(header, values))
            .issues
            .into_iter()
            .find(|i| i.kind == kind)
            .unwrap()
    }

    #[test]
    fn test_duplicate_actions() {
        let issue = first_issue("Code", texts(&["X", "Y", "X"]), IssueKind::Duplicate);
        let actions = resolve_fix_actions(&issue);

        let kinds: Vec<FixKind> = actions.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![FixKind::RemoveDuplicates, FixKind::HighlightOnly]);
        assert!(actions[0].requires_confirmation);
        assert!(!actions[1].requires_confirmation);
        assert_eq!(actions[0].id, format!("{}:remove_duplicates", issue.id));
        assert_eq!(
            actions[0].params.cells,
            vec![CellAddress::new(1, 0), CellAddress::new(3, 0)]
        );
    }

    #[test]
    fn test_missing_and_outlier_never_mutate() {
        let missing = first_issue(
            "City",
            vec![CellValue::text("Oslo"), CellValue::Empty],
            IssueKind::MissingValue,
        );
        let actions = resolve_fix_actions(&missing);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, FixKind::GoToCell);
        assert_eq!(actions[0].label, "Go to A3");

        let mut values = vec![2.0; 10];
        values.push(50.0);
        let outlier = first_issue("Score", numbers(&values), IssueKind::Outlier);
        let actions = resolve_fix_actions(&outlier);
        assert!(actions.iter().all(|a| !a.kind.is_mutating()));
    }

    #[test]
    fn test_standardize_targets() {
        let mixed = first_issue(
            "Date",
            vec![
                CellValue::text("2024-01-05"),
                CellValue::text("2024-01-06"),
                CellValue::Number(45298.0),
            ],
            IssueKind::MixedFormat,
        );
        let actions = resolve_fix_actions(&mixed);
        assert_eq!(
            actions[0].params.target,
            Some(StandardizeTarget::Representation {
                class: RepresentationClass::DateLikeText
            })
        );

        let casing = first_issue(
            "Fruit",
            texts(&["apple", "Apple", "APPLE"]),
            IssueKind::InconsistentCasing,
        );
        let actions = resolve_fix_actions(&casing);
        assert_eq!(
            actions[0].params.target,
            Some(StandardizeTarget::Casing {
                canonical: "apple".to_string(),
                canonical_lower: "apple".to_string(),
            })
        );
    }
}
