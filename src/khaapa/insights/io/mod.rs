//! Adapters over the places spreadsheets come from.
//!
//! [`SpreadsheetSource`] is the single seam the loader talks to. The Google
//! implementation lives under [`google`], an offline directory-of-workbooks
//! implementation under [`local`], and the shared first-sheet reader in
//! [`excel_read`].

pub mod excel_read;
pub mod google;
pub mod local;
pub mod resolver;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::khaapa::insights::error::Result;
use crate::khaapa::insights::model::{FileRef, RawRow};

/// MIME type Drive assigns to folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
/// MIME type of native Google spreadsheets.
pub const NATIVE_SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
/// MIME type of uploaded Excel workbooks.
pub const WORKBOOK_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Which kind of spreadsheet a deployment reads. Chosen once in configuration;
/// it fixes both the listing filter and the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadsheetKind {
    /// Native spreadsheets read through the values API.
    #[default]
    Native,
    /// Workbook files downloaded and parsed locally (first sheet only).
    Workbook,
}

impl SpreadsheetKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            SpreadsheetKind::Native => NATIVE_SPREADSHEET_MIME,
            SpreadsheetKind::Workbook => WORKBOOK_MIME,
        }
    }
}

impl fmt::Display for SpreadsheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetKind::Native => write!(f, "native"),
            SpreadsheetKind::Workbook => write!(f, "workbook"),
        }
    }
}

/// Raw access to a spreadsheet store.
///
/// Implementations perform I/O only; resolving the first matching folder,
/// capping listings, and normalizing rows happen in the callers.
pub trait SpreadsheetSource: Send + Sync {
    /// All folders whose name equals `name` exactly, in source order.
    fn find_folders(&self, name: &str) -> Result<Vec<FileRef>>;

    /// Spreadsheet files of the given kind directly inside `folder_id`, at most `limit`.
    fn list_children(&self, folder_id: &str, kind: SpreadsheetKind, limit: usize)
    -> Result<Vec<FileRef>>;

    /// The full cell grid of one file. Workbooks yield their first sheet.
    fn read_cells(&self, file: &FileRef) -> Result<Vec<RawRow>>;
}

/// Reads the raw rows of one file. A file without data yields an empty vector.
#[instrument(level = "debug", skip(source), fields(file = %file.display_name()))]
pub fn read_table<S: SpreadsheetSource + ?Sized>(source: &S, file: &FileRef) -> Result<Vec<RawRow>> {
    let rows = source.read_cells(file)?;
    debug!(row_count = rows.len(), "read raw rows");
    Ok(rows)
}
