use crate::khaapa::insights::classify::{Classification, classify};
use crate::khaapa::insights::model::Table;

/// Returned by [`recommend`] when no table was loaded.
pub const NO_RECOMMENDATIONS_MESSAGE: &str = "No data to generate recommendations.";

/// Returned by [`recommend`] when tables were loaded but none of them is classified.
pub const NOTHING_CLASSIFIED_MESSAGE: &str = "No recommendations for the loaded sheets.";

/// Fixed suggestion for each classified sheet type.
pub fn suggestion(classification: Classification) -> Option<(&'static str, &'static str)> {
    match classification {
        Classification::Inventory => Some(("📦", "Consider restocking items with zero quantity.")),
        Classification::Fund => Some(("💰", "Encourage members who haven't paid to contribute.")),
        Classification::Schedule => Some((
            "📅",
            "Consider filling the empty time slots or rotating team members.",
        )),
        Classification::Unclassified => None,
    }
}

/// One suggestion line per classified table, in collection order.
pub fn recommend(tables: &[Table]) -> String {
    if tables.is_empty() {
        return NO_RECOMMENDATIONS_MESSAGE.to_string();
    }

    let lines: Vec<String> = tables
        .iter()
        .filter_map(|table| {
            let (icon, text) = suggestion(classify(&table.source_name))?;
            Some(format!("{icon} {}: {text}", table.source_name))
        })
        .collect();

    if lines.is_empty() {
        NOTHING_CLASSIFIED_MESSAGE.to_string()
    } else {
        lines.join("\n")
    }
}
