//! Google Drive and Sheets backed spreadsheet source.
//!
//! Talks to Drive v3 for folder and file discovery, to Sheets v4 for native
//! spreadsheets, and downloads workbook files for local parsing. All requests
//! are blocking; async callers run them on a blocking thread.

pub mod auth;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

pub use auth::{Authenticator, CredentialFile, SCOPES};

use crate::khaapa::insights::error::{Result, ToolError};
use crate::khaapa::insights::io::{FOLDER_MIME, SpreadsheetKind, SpreadsheetSource, excel_read};
use crate::khaapa::insights::model::{CellValue, FileRef, RawRow};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const MAX_PAGE_SIZE: usize = 1000;

/// Backoff settings for retryable responses (408, 429, 5xx) and transport timeouts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(attempt: u32, policy: &RetryPolicy, retry_after: Option<&str>) -> Duration {
    if let Some(secs) = retry_after.and_then(|value| value.parse::<u64>().ok()) {
        return Duration::from_secs(secs.min(30));
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| u64::from(elapsed.subsec_nanos()))
        .unwrap_or(0)
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

fn send_with_retry(request: RequestBuilder, policy: &RetryPolicy) -> Result<Response> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return Ok(request.send()?);
        };

        match cloned.send() {
            Ok(response) if is_retryable(response.status()) && attempt < attempts => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok());
                let delay = retry_delay(attempt, policy, retry_after);
                warn!(attempt, attempts, status = %response.status(), ?delay, "retrying request");
                std::thread::sleep(delay);
            }
            Ok(response) => return Ok(response),
            Err(error) if (error.is_timeout() || error.is_connect()) && attempt < attempts => {
                let delay = retry_delay(attempt, policy, None);
                warn!(attempt, attempts, %error, ?delay, "retrying after transport error");
                std::thread::sleep(delay);
            }
            Err(error) => {
                return Err(ToolError::SourceUnavailable(format!("request failed: {error}")));
            }
        }
    }

    Err(ToolError::SourceUnavailable(
        "request exhausted retries".to_string(),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Escapes a value for use inside a single-quoted Drive query literal.
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Spreadsheet source backed by the Google Drive and Sheets REST APIs.
#[derive(Debug)]
pub struct GoogleDriveSource {
    client: Client,
    auth: Authenticator,
    kind: SpreadsheetKind,
    sheet_range: String,
    retry: RetryPolicy,
    drive_files_url: String,
    sheets_url: String,
}

impl GoogleDriveSource {
    /// Creates a source reading `kind` spreadsheets. `sheet_range` is the A1
    /// range requested from native spreadsheets.
    pub fn new(
        auth: Authenticator,
        kind: SpreadsheetKind,
        sheet_range: impl Into<String>,
    ) -> Result<Self> {
        Self::with_base_urls(auth, kind, sheet_range, DRIVE_FILES_URL, SHEETS_URL)
    }

    /// Same as [`new`](Self::new) but against other Drive `files` and Sheets
    /// `spreadsheets` endpoints.
    pub fn with_base_urls(
        auth: Authenticator,
        kind: SpreadsheetKind,
        sheet_range: impl Into<String>,
        drive_files_url: impl Into<String>,
        sheets_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            auth,
            kind,
            sheet_range: sheet_range.into(),
            retry: RetryPolicy::default(),
            drive_files_url: drive_files_url.into(),
            sheets_url: sheets_url.into(),
        })
    }

    fn get(&self, url: Url) -> Result<Response> {
        let token = self.auth.access_token(&self.client)?;
        let request = self.client.get(url).bearer_auth(token);
        let response = send_with_retry(request, &self.retry)?;
        self.check_status(response)
    }

    fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.auth.invalidate();
        }
        let message = response.text().unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ToolError::SourceUnavailable(format!(
                    "access denied ({status}); credentials need {}: {message}",
                    SCOPES.join(", ")
                )))
            }
            _ => Err(ToolError::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn list_files(&self, query: &str, limit: usize) -> Result<Vec<FileRef>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page_size = (limit - files.len()).min(MAX_PAGE_SIZE).to_string();
            let mut url = parse_url(&self.drive_files_url)?;
            url.query_pairs_mut()
                .append_pair("q", query)
                .append_pair("pageSize", &page_size)
                .append_pair("fields", "nextPageToken, files(id, name)")
                .append_pair("supportsAllDrives", "true")
                .append_pair("includeItemsFromAllDrives", "true");
            if let Some(token) = page_token.as_deref() {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let body: FileListResponse = self.get(url)?.json()?;
            files.extend(
                body.files
                    .into_iter()
                    .map(|file| FileRef::new(file.id, file.name)),
            );

            page_token = body.next_page_token;
            if page_token.is_none() || files.len() >= limit {
                break;
            }
        }

        files.truncate(limit);
        Ok(files)
    }

    fn read_values(&self, file: &FileRef) -> Result<Vec<RawRow>> {
        let mut url = parse_url(&self.sheets_url)?;
        url.path_segments_mut()
            .map_err(|_| ToolError::InvalidConfig("sheets URL cannot hold a path".into()))?
            .push(&file.id)
            .push("values")
            .push(&self.sheet_range);

        let body: ValueRangeResponse = self.get(url)?.json()?;
        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(CellValue::from_json).collect())
            .collect())
    }

    fn download_workbook(&self, file: &FileRef) -> Result<Vec<RawRow>> {
        let mut url = parse_url(&self.drive_files_url)?;
        url.path_segments_mut()
            .map_err(|_| ToolError::InvalidConfig("drive URL cannot hold a path".into()))?
            .push(&file.id);
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("supportsAllDrives", "true");

        let bytes = self.get(url)?.bytes()?;
        debug!(byte_count = bytes.len(), "downloaded workbook");
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        excel_read::read_first_sheet_bytes(bytes.to_vec())
    }
}

impl SpreadsheetSource for GoogleDriveSource {
    #[instrument(level = "debug", skip(self))]
    fn find_folders(&self, name: &str) -> Result<Vec<FileRef>> {
        let query = format!(
            "name = '{}' and mimeType = '{FOLDER_MIME}' and trashed = false",
            escape_query_literal(name)
        );
        self.list_files(&query, 10)
    }

    #[instrument(level = "debug", skip(self))]
    fn list_children(
        &self,
        folder_id: &str,
        kind: SpreadsheetKind,
        limit: usize,
    ) -> Result<Vec<FileRef>> {
        if kind != self.kind {
            return Err(ToolError::InvalidConfig(format!(
                "source configured for {} spreadsheets, asked to list {kind}",
                self.kind
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = format!(
            "'{}' in parents and mimeType = '{}' and trashed = false",
            escape_query_literal(folder_id),
            kind.mime_type()
        );
        self.list_files(&query, limit)
    }

    #[instrument(level = "debug", skip(self), fields(file = %file.display_name()))]
    fn read_cells(&self, file: &FileRef) -> Result<Vec<RawRow>> {
        match self.kind {
            SpreadsheetKind::Native => self.read_values(file),
            SpreadsheetKind::Workbook => self.download_workbook(file),
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|error| ToolError::InvalidConfig(format!("{raw}: {error}")))
}
