use crate::khaapa::insights::model::{CellValue, RawRow, Table};

/// Builds a well-formed table from raw source rows.
///
/// The first row is the header. Shorter data rows are padded with
/// [`CellValue::Null`] and longer rows are truncated to the header width, so a
/// malformed sheet never fails the batch. An empty input produces a table with
/// no columns and no rows.
pub fn normalize(raw_rows: &[RawRow], source_name: &str) -> Table {
    let Some((header, body)) = raw_rows.split_first() else {
        return Table {
            source_name: source_name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        };
    };

    let columns: Vec<String> = header.iter().map(header_name).collect();
    let width = columns.len();

    let rows = body
        .iter()
        .map(|row| {
            let mut cells: Vec<CellValue> = row.iter().take(width).cloned().collect();
            cells.resize(width, CellValue::Null);
            cells
        })
        .collect();

    Table {
        source_name: source_name.to_string(),
        columns,
        rows,
    }
}

fn header_name(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_string())
    }

    #[test]
    fn empty_input_yields_empty_table() {
        let table = normalize(&[], "Empty.xlsx");
        assert!(table.columns.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(table.source_name, "Empty.xlsx");
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_truncated() {
        let raw = vec![
            vec![text("a"), text("b"), text("c")],
            vec![text("1")],
            vec![text("1"), text("2"), text("3"), text("4"), text("5")],
            vec![],
        ];
        let table = normalize(&raw, "Mixed");

        assert_eq!(table.columns, vec!["a", "b", "c"]);
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows.iter().all(|row| row.len() == 3));
        assert_eq!(table.rows[0], vec![text("1"), CellValue::Null, CellValue::Null]);
        assert_eq!(table.rows[1], vec![text("1"), text("2"), text("3")]);
        assert_eq!(table.rows[2], vec![CellValue::Null; 3]);
    }

    #[test]
    fn header_only_sheet_has_no_rows() {
        let table = normalize(&[vec![text("X")]], "B_Notes.xlsx");
        assert_eq!(table.columns, vec!["X"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn duplicate_and_blank_headers_stay_positional() {
        let raw = vec![
            vec![text("Day"), CellValue::Null, text("Day"), CellValue::Number(2024.0)],
            vec![text("Mon"), text("x"), text("Tue"), text("y")],
        ];
        let table = normalize(&raw, "Timetable");

        assert_eq!(table.columns, vec!["Day", "", "Day", "2024"]);
        assert_eq!(table.column_index("Day"), Some(0));
        assert_eq!(table.rows[0][2], text("Tue"));
    }

    #[test]
    fn row_order_follows_the_source() {
        let raw = vec![
            vec![text("n")],
            vec![text("3")],
            vec![text("1")],
            vec![text("2")],
        ];
        let table = normalize(&raw, "Order");
        let values: Vec<String> = table.rows.iter().map(|row| row[0].to_string()).collect();
        assert_eq!(values, vec!["3", "1", "2"]);
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let raw = vec![vec![text("दिन"), text("Größe")], vec![text("सोमवार")]];
        let table = normalize(&raw, "खापा Timetable");
        assert_eq!(table.columns, vec!["दिन", "Größe"]);
        assert_eq!(table.source_name, "खापा Timetable");
        assert_eq!(table.rows[0], vec![text("सोमवार"), CellValue::Null]);
    }

    fn arb_cell() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Null),
            "[A-Za-z0-9 ]{0,6}".prop_map(CellValue::Text),
            (-1_000.0f64..1_000.0).prop_map(CellValue::Number),
        ]
    }

    fn arb_raw_rows() -> impl Strategy<Value = Vec<RawRow>> {
        proptest::collection::vec(proptest::collection::vec(arb_cell(), 0..8), 0..12)
    }

    proptest! {
        #[test]
        fn every_row_matches_the_header_width(raw in arb_raw_rows()) {
            let table = normalize(&raw, "Ragged");
            let width = raw.first().map_or(0, Vec::len);

            prop_assert_eq!(table.columns.len(), width);
            prop_assert_eq!(table.rows.len(), raw.len().saturating_sub(1));
            for (row, source) in table.rows.iter().zip(raw.iter().skip(1)) {
                prop_assert_eq!(row.len(), width);
                let kept = source.len().min(width);
                prop_assert_eq!(&row[..kept], &source[..kept]);
                prop_assert!(row[kept..].iter().all(CellValue::is_null));
            }
        }
    }
}
