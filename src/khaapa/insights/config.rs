use std::path::PathBuf;
use std::time::Duration;

use crate::khaapa::insights::cache::DEFAULT_STALENESS;
use crate::khaapa::insights::error::{Result, ToolError};
use crate::khaapa::insights::io::google::{Authenticator, GoogleDriveSource};
use crate::khaapa::insights::io::local::LocalDirectorySource;
use crate::khaapa::insights::io::{SpreadsheetKind, SpreadsheetSource};
use crate::khaapa::insights::loader::LoadOptions;

pub const DEFAULT_FOLDER_NAME: &str = "Khaapa_Directory";
pub const DEFAULT_MAX_FILES: usize = 100;
pub const DEFAULT_SHEET_RANGE: &str = "A1:Z1000";
pub const DEFAULT_CREDENTIALS_PATH: &str = "secrets.json";
pub const DEFAULT_SERVER_NAME: &str = "spreadsheet-analyzer";

/// Where spreadsheets are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSettings {
    /// Google Drive. A static access token takes precedence over the credential file.
    Google {
        credentials_path: PathBuf,
        access_token: Option<String>,
    },
    /// A local directory whose subdirectories act as folders.
    Local { root: PathBuf },
}

/// Runtime settings for the insights server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub folder_name: String,
    pub max_files: usize,
    pub sheet_range: String,
    pub modality: SpreadsheetKind,
    pub source: SourceSettings,
    pub server_name: String,
    pub server_version: String,
    pub cache_ttl: Duration,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            max_files: DEFAULT_MAX_FILES,
            sheet_range: DEFAULT_SHEET_RANGE.to_string(),
            modality: SpreadsheetKind::default(),
            source: SourceSettings::Google {
                credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
                access_token: None,
            },
            server_name: DEFAULT_SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            cache_ttl: DEFAULT_STALENESS,
            debug: false,
        }
    }
}

impl Settings {
    /// Rejects settings no load pass could work with.
    pub fn validate(&self) -> Result<()> {
        if self.folder_name.trim().is_empty() {
            return Err(ToolError::InvalidConfig(
                "folder name must not be empty".into(),
            ));
        }
        if self.max_files == 0 {
            return Err(ToolError::InvalidConfig(
                "maximum file count must be at least 1".into(),
            ));
        }
        if self.sheet_range.trim().is_empty() {
            return Err(ToolError::InvalidConfig("sheet range must not be empty".into()));
        }
        if matches!(self.source, SourceSettings::Local { .. })
            && self.modality != SpreadsheetKind::Workbook
        {
            return Err(ToolError::InvalidConfig(
                "local sources require the workbook modality".into(),
            ));
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            folder_name: self.folder_name.clone(),
            kind: self.modality,
            max_files: self.max_files,
        }
    }

    /// Builds the configured spreadsheet source.
    pub fn build_source(&self) -> Result<Box<dyn SpreadsheetSource>> {
        match &self.source {
            SourceSettings::Google {
                credentials_path,
                access_token,
            } => {
                let auth = match access_token.as_deref().filter(|token| !token.is_empty()) {
                    Some(token) => Authenticator::from_access_token(token),
                    None => Authenticator::from_credentials_file(credentials_path)?,
                };
                Ok(Box::new(GoogleDriveSource::new(
                    auth,
                    self.modality,
                    self.sheet_range.clone(),
                )?))
            }
            SourceSettings::Local { root } => Ok(Box::new(LocalDirectorySource::new(root)?)),
        }
    }
}
