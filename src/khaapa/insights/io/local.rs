use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::khaapa::insights::error::{Result, ToolError};
use crate::khaapa::insights::io::{SpreadsheetKind, SpreadsheetSource, excel_read};
use crate::khaapa::insights::model::{FileRef, RawRow};

/// Serves workbooks from a directory tree: each subdirectory of `root` is a
/// folder and each `.xlsx` file inside it a spreadsheet. Only the workbook
/// modality is available.
#[derive(Debug, Clone)]
pub struct LocalDirectorySource {
    root: PathBuf,
}

impl LocalDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(ToolError::MissingRoot(root));
        }
        Ok(Self { root })
    }
}

impl SpreadsheetSource for LocalDirectorySource {
    fn find_folders(&self, name: &str) -> Result<Vec<FileRef>> {
        let folders = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_str() == Some(name))
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .map(|path| FileRef::new(path.display().to_string(), name))
            .collect();
        Ok(folders)
    }

    #[instrument(level = "debug", skip(self))]
    fn list_children(
        &self,
        folder_id: &str,
        kind: SpreadsheetKind,
        limit: usize,
    ) -> Result<Vec<FileRef>> {
        if kind != SpreadsheetKind::Workbook {
            return Err(ToolError::InvalidConfig(format!(
                "local sources only hold workbooks, not {kind} spreadsheets"
            )));
        }

        let mut files: Vec<FileRef> = fs::read_dir(folder_id)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_workbook(path))
            .filter_map(|path| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(FileRef::new(path.display().to_string(), name))
            })
            .collect();

        files.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));
        files.truncate(limit);
        debug!(file_count = files.len(), "found local workbooks");
        Ok(files)
    }

    fn read_cells(&self, file: &FileRef) -> Result<Vec<RawRow>> {
        excel_read::read_first_sheet(Path::new(&file.id))
    }
}

fn is_workbook(path: &Path) -> bool {
    let is_xlsx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    // Excel lock files such as `~$Budget.xlsx` are not workbooks.
    let is_lock_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("~$"));
    is_xlsx && !is_lock_file
}
