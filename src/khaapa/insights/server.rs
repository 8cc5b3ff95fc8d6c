//! MCP server exposing the insight tools over stdio.

use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ServerHandler, ServiceExt, tool};
use tracing::info;

use crate::khaapa::insights::error::{self, ToolError};
use crate::khaapa::insights::tools::InsightsService;

/// Tool handler. Cloned per request by the transport; the service is shared.
#[derive(Clone)]
pub struct InsightsServer {
    service: Arc<InsightsService>,
    name: String,
    version: String,
}

#[tool(tool_box)]
impl InsightsServer {
    pub fn new(
        service: Arc<InsightsService>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            service,
            name: name.into(),
            version: version.into(),
        }
    }

    #[tool(description = "Returns key insights from the spreadsheets in the configured Drive folder: each sheet's columns and row count, plus totals for inventory and fund sheets and distinct days for schedules.")]
    async fn get_insights(&self) -> String {
        let service = Arc::clone(&self.service);
        run_blocking(move || service.get_insights()).await
    }

    #[tool(description = "Returns future recommendations for the spreadsheets in the configured Drive folder, one suggestion per recognised inventory, fund, or schedule sheet.")]
    async fn get_future_recommendations(&self) -> String {
        let service = Arc::clone(&self.service);
        run_blocking(move || service.get_future_recommendations()).await
    }
}

#[tool(tool_box)]
impl ServerHandler for InsightsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
            },
            instructions: Some(
                "Spreadsheet analyzer. Use get_insights for a summary of every sheet in the \
                 configured folder and get_future_recommendations for suggested next steps."
                    .to_string(),
            ),
        }
    }
}

async fn run_blocking<F>(task: F) -> String
where
    F: FnOnce() -> String + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .unwrap_or_else(|err| format!("Tool task failed: {err}"))
}

/// Serves the tools on stdin/stdout until the client disconnects.
pub async fn serve_stdio(server: InsightsServer) -> error::Result<()> {
    info!(name = %server.name, version = %server.version, "starting MCP server on stdio");
    let running = server
        .serve(rmcp::transport::io::stdio())
        .await
        .map_err(|err| ToolError::Transport(err.to_string()))?;
    let reason = running
        .waiting()
        .await
        .map_err(|err| ToolError::Transport(err.to_string()))?;
    info!(?reason, "MCP server stopped");
    Ok(())
}
