use tracing::{debug, info, instrument};

use crate::khaapa::insights::error::Result;
use crate::khaapa::insights::io::{SpreadsheetKind, SpreadsheetSource};
use crate::khaapa::insights::model::{FileRef, FolderId};

/// Maps a folder name to its source identifier. The first exact match wins;
/// `Ok(None)` means the folder does not exist, which callers treat as "no data".
#[instrument(level = "debug", skip(source))]
pub fn resolve<S: SpreadsheetSource + ?Sized>(
    source: &S,
    folder_name: &str,
) -> Result<Option<FolderId>> {
    let candidates = source.find_folders(folder_name)?;
    if candidates.len() > 1 {
        debug!(
            matches = candidates.len(),
            "several folders share the name; using the first"
        );
    }

    let folder = candidates
        .into_iter()
        .find(|candidate| candidate.name == folder_name)
        .map(|candidate| candidate.id);

    if folder.is_none() {
        info!(folder = folder_name, "folder not found");
    }
    Ok(folder)
}

/// Lists spreadsheet files in a folder, capped at `max_count`.
#[instrument(level = "debug", skip(source))]
pub fn list_spreadsheets<S: SpreadsheetSource + ?Sized>(
    source: &S,
    folder_id: &str,
    kind: SpreadsheetKind,
    max_count: usize,
) -> Result<Vec<FileRef>> {
    if max_count == 0 {
        return Ok(Vec::new());
    }
    let mut files = source.list_children(folder_id, kind, max_count)?;
    files.truncate(max_count);
    debug!(file_count = files.len(), "listed spreadsheets");
    Ok(files)
}
