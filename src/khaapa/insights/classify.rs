use std::fmt;

use serde::{Deserialize, Serialize};

/// Category a sheet falls into, derived from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Inventory,
    Fund,
    Schedule,
    Unclassified,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Inventory => write!(f, "inventory"),
            Classification::Fund => write!(f, "fund"),
            Classification::Schedule => write!(f, "schedule"),
            Classification::Unclassified => write!(f, "unclassified"),
        }
    }
}

/// Ordered `(marker, classification)` pairs. A source name is matched against
/// each marker in turn with a case-sensitive substring test; the first hit
/// wins, so a name containing both `Inventory` and `Fund` is an inventory sheet.
pub const CLASSIFICATION_RULES: &[(&str, Classification)] = &[
    ("Inventory", Classification::Inventory),
    ("Fund", Classification::Fund),
    ("Khapa", Classification::Schedule),
    ("Timetable", Classification::Schedule),
];

/// Classifies a sheet by its source name.
pub fn classify(source_name: &str) -> Classification {
    CLASSIFICATION_RULES
        .iter()
        .find(|(marker, _)| source_name.contains(marker))
        .map(|(_, classification)| *classification)
        .unwrap_or(Classification::Unclassified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_map_to_their_tags() {
        assert_eq!(classify("A_Inventory.xlsx"), Classification::Inventory);
        assert_eq!(classify("Class Fund 2024"), Classification::Fund);
        assert_eq!(classify("Khapa roster"), Classification::Schedule);
        assert_eq!(classify("Timetable"), Classification::Schedule);
        assert_eq!(classify("B_Notes.xlsx"), Classification::Unclassified);
        assert_eq!(classify(""), Classification::Unclassified);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(classify("inventory"), Classification::Unclassified);
        assert_eq!(classify("FUND"), Classification::Unclassified);
    }

    #[test]
    fn earlier_rules_win() {
        assert_eq!(classify("Fund Inventory"), Classification::Inventory);
        assert_eq!(classify("Khapa Fund"), Classification::Fund);
        assert_eq!(classify("Timetable Khapa"), Classification::Schedule);
    }
}
