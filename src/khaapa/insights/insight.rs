use std::collections::HashSet;

use crate::khaapa::insights::classify::{Classification, classify};
use crate::khaapa::insights::model::{CellValue, Table};

/// Returned by [`summarize`] when no table was loaded.
pub const NO_DATA_MESSAGE: &str = "No data found.";

/// Derived figure reported for a classified sheet when its column is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statistic {
    Sum {
        column: &'static str,
        label: &'static str,
    },
    DistinctCount {
        column: &'static str,
        label: &'static str,
    },
}

/// Result of summing a column after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnSum {
    Total(f64),
    /// The column holds values but none of them is numeric.
    Unparseable,
}

fn profile(classification: Classification) -> Option<(&'static str, Statistic)> {
    match classification {
        Classification::Inventory => Some((
            "Appears to be an inventory sheet.",
            Statistic::Sum {
                column: "Total Profit",
                label: "Total Profit",
            },
        )),
        Classification::Fund => Some((
            "Appears to be a class fund sheet.",
            Statistic::Sum {
                column: "Amount Collection 1",
                label: "Total collected (round 1)",
            },
        )),
        Classification::Schedule => Some((
            "Likely a schedule or attendance sheet.",
            Statistic::DistinctCount {
                column: "Day",
                label: "Number of unique days",
            },
        )),
        Classification::Unclassified => None,
    }
}

/// Renders one summary block per table, separated by blank lines.
pub fn summarize(tables: &[Table]) -> String {
    if tables.is_empty() {
        return NO_DATA_MESSAGE.to_string();
    }

    tables
        .iter()
        .map(summarize_table)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Summary block for a single table: name, columns, row count, and any
/// classification-specific figures.
pub fn summarize_table(table: &Table) -> String {
    let mut lines = vec![
        format!("Sheet: {}", table.source_name),
        format!("Columns: {}", table.columns.join(", ")),
        format!("Rows: {}", table.row_count()),
    ];

    if let Some((description, statistic)) = profile(classify(&table.source_name)) {
        lines.push(format!("→ {description}"));
        if let Some(line) = render_statistic(table, statistic) {
            lines.push(line);
        }
    }

    lines.join("\n")
}

fn render_statistic(table: &Table, statistic: Statistic) -> Option<String> {
    match statistic {
        Statistic::Sum { column, label } => Some(match sum_column(table, column)? {
            ColumnSum::Total(total) => format!("→ {label}: {total}"),
            ColumnSum::Unparseable => format!("→ Couldn't parse {column}."),
        }),
        Statistic::DistinctCount { column, label } => {
            let count = distinct_count(table, column)?;
            Some(format!("→ {label}: {count}"))
        }
    }
}

/// Sums the named column, ignoring cells that do not coerce to a number.
/// Returns `None` when the column does not exist.
pub fn sum_column(table: &Table, column: &str) -> Option<ColumnSum> {
    let mut total = 0.0;
    let mut numeric = 0usize;
    let mut populated = 0usize;

    for cell in table.column_values(column)? {
        if is_blank(cell) {
            continue;
        }
        populated += 1;
        if let Some(value) = cell.as_number() {
            total += value;
            numeric += 1;
        }
    }

    if populated > 0 && numeric == 0 {
        Some(ColumnSum::Unparseable)
    } else {
        Some(ColumnSum::Total(total))
    }
}

/// Number of distinct non-blank values in the named column.
/// Returns `None` when the column does not exist.
pub fn distinct_count(table: &Table, column: &str) -> Option<usize> {
    let distinct: HashSet<String> = table
        .column_values(column)?
        .filter(|cell| !is_blank(cell))
        .map(CellValue::to_string)
        .collect();
    Some(distinct.len())
}

fn is_blank(cell: &CellValue) -> bool {
    match cell {
        CellValue::Null => true,
        CellValue::Text(value) => value.trim().is_empty(),
        CellValue::Number(_) => false,
    }
}
