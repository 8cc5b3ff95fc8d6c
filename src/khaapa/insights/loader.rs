use tracing::{debug, info, instrument, warn};

use crate::khaapa::insights::error::Result;
use crate::khaapa::insights::io::resolver;
use crate::khaapa::insights::io::{SpreadsheetKind, SpreadsheetSource, read_table};
use crate::khaapa::insights::model::{LoadReport, SkippedFile};
use crate::khaapa::insights::normalize::normalize;

/// What one load pass reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub folder_name: String,
    pub kind: SpreadsheetKind,
    pub max_files: usize,
}

/// Resolves the folder, lists its spreadsheets, and reads and normalizes each
/// one in listing order.
///
/// A missing folder yields an empty report. A file that cannot be read is
/// logged, recorded in [`LoadReport::skipped`], and the batch continues.
/// Only failures to resolve or list the folder are returned as errors.
#[instrument(
    level = "info",
    skip_all,
    fields(folder = %options.folder_name, kind = %options.kind)
)]
pub fn load_all<S: SpreadsheetSource + ?Sized>(
    source: &S,
    options: &LoadOptions,
) -> Result<LoadReport> {
    let Some(folder_id) = resolver::resolve(source, &options.folder_name)? else {
        return Ok(LoadReport::folder_missing());
    };

    let files =
        resolver::list_spreadsheets(source, &folder_id, options.kind, options.max_files)?;
    info!(file_count = files.len(), "discovered spreadsheets");

    let mut report = LoadReport {
        folder_found: true,
        ..LoadReport::default()
    };

    for file in &files {
        let name = file.display_name();
        match read_table(source, file) {
            Ok(raw_rows) => {
                let table = normalize(&raw_rows, name);
                debug!(
                    file = name,
                    column_count = table.columns.len(),
                    row_count = table.rows.len(),
                    "normalized table"
                );
                report.tables.push(table);
            }
            Err(error) => {
                warn!(
                    file = name,
                    unavailable = error.is_source_unavailable(),
                    %error,
                    "skipping unreadable spreadsheet"
                );
                report.skipped.push(SkippedFile {
                    name: name.to_string(),
                    reason: error.to_string(),
                });
            }
        }
    }

    info!(
        table_count = report.tables.len(),
        skipped = report.skipped.len(),
        "load finished"
    );
    Ok(report)
}
