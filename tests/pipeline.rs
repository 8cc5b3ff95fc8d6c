use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use khaapa_insights::cache::TableCache;
use khaapa_insights::insight::NO_DATA_MESSAGE;
use khaapa_insights::io::local::LocalDirectorySource;
use khaapa_insights::io::{SpreadsheetKind, SpreadsheetSource};
use khaapa_insights::loader::{LoadOptions, load_all};
use khaapa_insights::model::{CellValue, FileRef, RawRow};
use khaapa_insights::recommend::NO_RECOMMENDATIONS_MESSAGE;
use khaapa_insights::tools::InsightsService;
use khaapa_insights::{Result, ToolError};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

const FOLDER: &str = "Khaapa_Directory";

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

fn write_workbook(path: &Path, rows: &[&[Cell]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(value) => sheet
                    .write_string(row_idx as u32, col_idx as u16, *value)
                    .expect("string written"),
                Cell::Number(value) => sheet
                    .write_number(row_idx as u32, col_idx as u16, *value)
                    .expect("number written"),
            };
        }
    }
    workbook.save(path).expect("workbook saved");
}

fn workbook_options(max_files: usize) -> LoadOptions {
    LoadOptions {
        folder_name: FOLDER.to_string(),
        kind: SpreadsheetKind::Workbook,
        max_files,
    }
}

fn local_service(root: &Path, staleness: Duration) -> InsightsService {
    let source = LocalDirectorySource::new(root).expect("local source");
    InsightsService::new(Box::new(source), workbook_options(100), TableCache::new(staleness))
}

#[test]
fn inventory_and_notes_folder_end_to_end() {
    let root = tempdir().expect("temporary directory");
    let folder = root.path().join(FOLDER);
    fs::create_dir(&folder).expect("folder created");

    write_workbook(
        &folder.join("A_Inventory.xlsx"),
        &[
            &[Cell::Text("Item"), Cell::Text("Total Profit")],
            &[Cell::Text("Pen"), Cell::Number(10.0)],
            &[Cell::Text("Pad"), Cell::Text("x")],
        ],
    );
    write_workbook(&folder.join("B_Notes.xlsx"), &[&[Cell::Text("X")]]);

    let service = local_service(root.path(), Duration::from_secs(60));

    let insights = service.get_insights();
    assert!(insights.contains(
        "Sheet: A_Inventory.xlsx\nColumns: Item, Total Profit\nRows: 2\n\
         → Appears to be an inventory sheet.\n→ Total Profit: 10"
    ));
    assert!(insights.ends_with("Sheet: B_Notes.xlsx\nColumns: X\nRows: 0"));

    let recommendations = service.get_future_recommendations();
    let restock_lines = recommendations
        .lines()
        .filter(|line| line.contains("restocking"))
        .count();
    assert_eq!(restock_lines, 1);
    assert_eq!(recommendations.lines().count(), 1);
}

#[test]
fn missing_folder_yields_no_data_messages() {
    let root = tempdir().expect("temporary directory");
    let service = local_service(root.path(), Duration::ZERO);

    assert_eq!(service.get_insights(), NO_DATA_MESSAGE);
    assert_eq!(service.get_future_recommendations(), NO_RECOMMENDATIONS_MESSAGE);
}

#[test]
fn corrupt_workbook_is_skipped_with_a_warning() {
    let root = tempdir().expect("temporary directory");
    let folder = root.path().join(FOLDER);
    fs::create_dir(&folder).expect("folder created");

    write_workbook(
        &folder.join("Class Fund.xlsx"),
        &[
            &[Cell::Text("Name"), Cell::Text("Amount Collection 1")],
            &[Cell::Text("Asha"), Cell::Number(100.0)],
            &[Cell::Text("Ravi"), Cell::Text("50")],
        ],
    );
    fs::write(folder.join("Broken.xlsx"), b"not a zip archive").expect("corrupt file written");
    write_workbook(
        &folder.join("Timetable.xlsx"),
        &[
            &[Cell::Text("Day"), Cell::Text("Slot")],
            &[Cell::Text("Mon"), Cell::Number(1.0)],
            &[Cell::Text("Tue")],
            &[Cell::Text("Mon"), Cell::Number(3.0), Cell::Text("extra")],
        ],
    );

    let service = local_service(root.path(), Duration::ZERO);
    let insights = service.get_insights();

    assert!(insights.contains("→ Total collected (round 1): 150"));
    assert!(insights.contains("Sheet: Timetable.xlsx\nColumns: Day, Slot\nRows: 3"));
    assert!(insights.contains("→ Number of unique days: 2"));
    assert!(insights.contains("⚠ Skipped Broken.xlsx"));
    assert!(!insights.contains("Sheet: Broken.xlsx"));
}

#[test]
fn max_files_caps_the_batch() {
    let root = tempdir().expect("temporary directory");
    let folder = root.path().join(FOLDER);
    fs::create_dir(&folder).expect("folder created");
    for name in ["a.xlsx", "b.xlsx", "c.xlsx"] {
        write_workbook(&folder.join(name), &[&[Cell::Text("X")]]);
    }

    let source = LocalDirectorySource::new(root.path()).expect("local source");
    let report = load_all(&source, &workbook_options(2)).expect("load");
    let names: Vec<&str> = report
        .tables
        .iter()
        .map(|table| table.source_name.as_str())
        .collect();
    assert_eq!(names, vec!["a.xlsx", "b.xlsx"]);
}

/// In-memory source whose files either hold rows or fail to read.
struct ScriptedSource {
    folders: Vec<FileRef>,
    files: Vec<FileRef>,
    contents: HashMap<String, Option<Vec<RawRow>>>,
    reads: Arc<AtomicUsize>,
    offline: bool,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            folders: vec![FileRef::new("folder-1", FOLDER)],
            files: Vec::new(),
            contents: HashMap::new(),
            reads: Arc::new(AtomicUsize::new(0)),
            offline: false,
        }
    }

    fn with_file(mut self, id: &str, name: &str, rows: Option<Vec<RawRow>>) -> Self {
        self.files.push(FileRef::new(id, name));
        self.contents.insert(id.to_string(), rows);
        self
    }
}

impl SpreadsheetSource for ScriptedSource {
    fn find_folders(&self, name: &str) -> Result<Vec<FileRef>> {
        if self.offline {
            return Err(ToolError::SourceUnavailable("network down".into()));
        }
        Ok(self
            .folders
            .iter()
            .filter(|folder| folder.name == name)
            .cloned()
            .collect())
    }

    fn list_children(
        &self,
        folder_id: &str,
        _kind: SpreadsheetKind,
        limit: usize,
    ) -> Result<Vec<FileRef>> {
        assert_eq!(folder_id, "folder-1", "first matching folder is used");
        Ok(self.files.iter().take(limit).cloned().collect())
    }

    fn read_cells(&self, file: &FileRef) -> Result<Vec<RawRow>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.contents.get(&file.id) {
            Some(Some(rows)) => Ok(rows.clone()),
            _ => Err(ToolError::SourceUnavailable(format!(
                "could not fetch {}",
                file.id
            ))),
        }
    }
}

fn text_rows(rows: &[&[&str]]) -> Vec<RawRow> {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| CellValue::Text(cell.to_string()))
                .collect()
        })
        .collect()
}

fn native_options() -> LoadOptions {
    LoadOptions {
        folder_name: FOLDER.to_string(),
        kind: SpreadsheetKind::Native,
        max_files: 100,
    }
}

#[test]
fn one_failed_read_among_three_keeps_the_rest() {
    let source = ScriptedSource::new()
        .with_file(
            "1",
            "Shop Inventory",
            Some(text_rows(&[&["Item", "Total Profit"], &["Pen", "10"], &["Ink", "5"]])),
        )
        .with_file("2", "Missing Sheet", None)
        .with_file("3", "Notes", Some(text_rows(&[&["A", "B"], &["1"]])));

    let report = load_all(&source, &native_options()).expect("load");
    assert_eq!(report.tables.len(), 2);
    assert_eq!(report.tables[0].source_name, "Shop Inventory");
    assert_eq!(report.tables[1].source_name, "Notes");
    assert!(report.tables[1].rows.iter().all(|row| row.len() == 2));
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "Missing Sheet");
}

#[test]
fn first_matching_folder_wins() {
    let mut source = ScriptedSource::new().with_file("1", "Notes", Some(Vec::new()));
    source.folders.push(FileRef::new("folder-2", FOLDER));

    let report = load_all(&source, &native_options()).expect("load");
    assert!(report.folder_found);
    assert_eq!(report.tables.len(), 1);
    assert!(report.tables[0].columns.is_empty());
}

#[test]
fn unreachable_source_becomes_a_message() {
    let mut source = ScriptedSource::new();
    source.offline = true;
    let service = InsightsService::new(Box::new(source), native_options(), TableCache::default());

    let insights = service.get_insights();
    assert!(insights.starts_with("Could not load spreadsheets:"));
    assert!(insights.contains("network down"));
    assert!(
        service
            .get_future_recommendations()
            .starts_with("Could not load spreadsheets:")
    );
}

#[test]
fn cached_tables_are_reused_until_refreshed() {
    let source = ScriptedSource::new().with_file(
        "1",
        "Khapa Duty",
        Some(text_rows(&[&["Day"], &["Mon"], &["Sat"]])),
    );
    let reads = Arc::clone(&source.reads);
    let service = InsightsService::new(
        Box::new(source),
        native_options(),
        TableCache::new(Duration::from_secs(60)),
    );

    let first = service.get_insights();
    let second = service.get_insights();
    assert_eq!(first, second);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert!(first.contains("→ Number of unique days: 2"));

    let recommendations = service.get_future_recommendations();
    assert_eq!(
        recommendations,
        "📅 Khapa Duty: Consider filling the empty time slots or rotating team members."
    );

    let refreshed = service.refresh().expect("refresh");
    assert_eq!(refreshed.tables.len(), 1);
    assert_eq!(reads.load(Ordering::SeqCst), 2);
}
