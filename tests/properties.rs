use proptest::prelude::*;
use statement_tables::classify::{RowClassifier, RowRole};
use statement_tables::mapper::plan_columns;
use statement_tables::numeric::{CellValue, canonicalize};
use statement_tables::rectangularize::{RawRow, Rectangularizer, clean_cell};

fn raw_row() -> impl Strategy<Value = RawRow> {
    proptest::collection::vec(
        proptest::option::of("[ A-Za-z0-9,()\\-\n]{0,12}"),
        0..10,
    )
}

fn cell_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,7}",
        "\\([0-9]{1,3}(,[0-9]{3}){0,2}\\)",
        "\\([+\\-]?[0-9]{1,3}\\)",
        "[0-9]{1,3}( [0-9]{3}){0,2}\\.[0-9]{1,2}",
        "[ A-Za-z/()\\-]{0,10}",
        Just("\u{2013}".to_string()),
        Just("NaN".to_string()),
    ]
}

proptest! {
    #[test]
    fn normalized_rows_match_header_width(
        header in proptest::collection::vec("[A-Za-z0-9]{1,6}", 1..8),
        rows in proptest::collection::vec(raw_row(), 0..12)
    ) {
        let header_row = header.iter().cloned().map(Some).collect::<RawRow>();
        let rectangularizer = Rectangularizer::from_header(&header_row)
            .expect("non-blank header");
        let width = header.len();
        let result = rectangularizer.normalize_rows(&rows);
        prop_assert_eq!(result.rows.len() + result.blank_rows, rows.len());

        let kept = rows
            .iter()
            .filter(|raw| rectangularizer.normalize_row(raw).is_some())
            .collect::<Vec<_>>();
        prop_assert_eq!(kept.len(), result.rows.len());
        for (raw, row) in kept.iter().zip(&result.rows) {
            let preserved = raw.len().min(width);
            prop_assert_eq!(row.len(), width);
            for (idx, cell) in raw.iter().take(preserved).enumerate() {
                prop_assert_eq!(&row[idx], &clean_cell(cell.as_deref()));
            }
            prop_assert!(row[preserved..].iter().all(|cell| cell.is_empty()));
            prop_assert!(row.iter().any(|cell| !cell.is_empty()));
            prop_assert!(row.iter().all(|cell| !cell.contains('\n')));
        }
    }

    #[test]
    fn canonicalize_is_idempotent(text in cell_text()) {
        let once = canonicalize(Some(&text));
        let twice = once.clone().canonicalize();
        prop_assert_eq!(&once, &twice);
        if let CellValue::Number(n) = once {
            prop_assert!(!n.is_nan());
            prop_assert!(n != 0.0 || n.is_sign_positive());
            if text.trim().starts_with('(') {
                prop_assert!(n <= 0.0);
            }
        }
    }

    #[test]
    fn classification_depends_only_on_first_cell(
        label in "[ A-Za-z]{0,24}",
        tail_a in proptest::collection::vec("[ A-Za-z0-9]{0,8}", 0..5),
        tail_b in proptest::collection::vec("[ A-Za-z0-9]{0,8}", 0..5),
        position in 1usize..50
    ) {
        let classifier = RowClassifier::default();
        let mut row_a = vec![label.clone()];
        row_a.extend(tail_a);
        let mut row_b = vec![label.clone()];
        row_b.extend(tail_b);
        let role = classifier.classify(position, &row_a);
        prop_assert_eq!(role, classifier.classify(position, &row_b));
        prop_assert_eq!(role, classifier.classify_label(&label));
        prop_assert_ne!(role, RowRole::Header);
    }

    #[test]
    fn positional_plan_keeps_label_out_of_periods(
        row_len in 1usize..12,
        period_count in 1usize..=3
    ) {
        let plan = plan_columns(row_len, period_count);
        prop_assert_eq!(plan.periods.len(), period_count);
        prop_assert_eq!(plan.mapped_periods(), period_count.min(row_len - 1));
        prop_assert!(plan.periods.iter().flatten().all(|&idx| idx >= 1 && idx < row_len));
        prop_assert!(plan.dimensions.len() <= 4);
        if row_len > 1 {
            prop_assert_eq!(plan.periods[period_count - 1], Some(row_len - 1));
        }
    }
}
