use std::sync::Arc;

use tracing::{error, instrument};

use crate::khaapa::insights::cache::TableCache;
use crate::khaapa::insights::error::Result;
use crate::khaapa::insights::insight::summarize;
use crate::khaapa::insights::io::SpreadsheetSource;
use crate::khaapa::insights::loader::{LoadOptions, load_all};
use crate::khaapa::insights::model::LoadReport;
use crate::khaapa::insights::recommend::recommend;

/// The operations exposed to tool callers, backed by a source and a cache.
///
/// Both tool operations always return text: load failures are rendered as a
/// message rather than returned as errors.
pub struct InsightsService {
    source: Box<dyn SpreadsheetSource>,
    options: LoadOptions,
    cache: TableCache,
}

impl InsightsService {
    pub fn new(source: Box<dyn SpreadsheetSource>, options: LoadOptions, cache: TableCache) -> Self {
        Self {
            source,
            options,
            cache,
        }
    }

    /// Current tables, from the cache while it is fresh.
    pub fn tables(&self) -> Result<Arc<LoadReport>> {
        self.cache
            .get_or_load(|| load_all(self.source.as_ref(), &self.options))
    }

    /// Reloads the tables regardless of cache age.
    pub fn refresh(&self) -> Result<Arc<LoadReport>> {
        self.cache
            .refresh(|| load_all(self.source.as_ref(), &self.options))
    }

    #[instrument(level = "info", skip(self))]
    pub fn get_insights(&self) -> String {
        self.render(|report| summarize(&report.tables))
    }

    #[instrument(level = "info", skip(self))]
    pub fn get_future_recommendations(&self) -> String {
        self.render(|report| recommend(&report.tables))
    }

    fn render(&self, engine: impl FnOnce(&LoadReport) -> String) -> String {
        match self.tables() {
            Ok(report) => with_warnings(engine(&report), &report),
            Err(err) => {
                error!(error = %err, "failed to load spreadsheets");
                format!("Could not load spreadsheets: {err}")
            }
        }
    }
}

fn with_warnings(body: String, report: &LoadReport) -> String {
    let warnings = report.warnings();
    if warnings.is_empty() {
        body
    } else {
        format!("{body}\n\n{}", warnings.join("\n"))
    }
}
