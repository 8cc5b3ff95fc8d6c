use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use khaapa_insights::cache::{DEFAULT_STALENESS, TableCache};
use khaapa_insights::config::{
    DEFAULT_CREDENTIALS_PATH, DEFAULT_FOLDER_NAME, DEFAULT_MAX_FILES, DEFAULT_SERVER_NAME,
    DEFAULT_SHEET_RANGE, Settings, SourceSettings,
};
use khaapa_insights::io::{SpreadsheetKind, read_table, resolver};
use khaapa_insights::model::FileRef;
use khaapa_insights::server::{InsightsServer, serve_stdio};
use khaapa_insights::tools::InsightsService;
use khaapa_insights::{Result, ToolError};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Rows shown by `preview`.
const PREVIEW_ROWS: usize = 10;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = cli.source.into_settings();
    init_logging(settings.debug)?;
    settings.validate()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => execute_serve(settings),
        Command::Insights => {
            println!("{}", build_service(&settings)?.get_insights());
            Ok(())
        }
        Command::Recommend => {
            println!("{}", build_service(&settings)?.get_future_recommendations());
            Ok(())
        }
        Command::List => execute_list(&settings),
        Command::Preview(args) => execute_preview(&settings, args),
    }
}

/// Logs go to stderr; stdout carries the MCP stream.
fn init_logging(debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn build_service(settings: &Settings) -> Result<InsightsService> {
    let source = settings.build_source()?;
    Ok(InsightsService::new(
        source,
        settings.load_options(),
        TableCache::new(settings.cache_ttl),
    ))
}

fn execute_serve(settings: Settings) -> Result<()> {
    let service = Arc::new(build_service(&settings)?);
    if let Err(error) = service.refresh() {
        warn!(%error, "initial load failed; tools will retry on first call");
    }

    let server = InsightsServer::new(
        Arc::clone(&service),
        settings.server_name.clone(),
        settings.server_version.clone(),
    );
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(serve_stdio(server));
    // The blocking HTTP client must be dropped outside the async runtime.
    drop(runtime);
    drop(service);
    outcome
}

fn execute_list(settings: &Settings) -> Result<()> {
    let source = settings.build_source()?;
    let options = settings.load_options();
    let Some(folder_id) = resolver::resolve(source.as_ref(), &options.folder_name)? else {
        println!("Folder '{}' not found.", options.folder_name);
        return Ok(());
    };

    let files =
        resolver::list_spreadsheets(source.as_ref(), &folder_id, options.kind, options.max_files)?;
    if files.is_empty() {
        println!("No spreadsheets found.");
    }
    for file in files {
        println!("{} ({})", file.display_name(), file.id);
    }
    Ok(())
}

fn execute_preview(settings: &Settings, args: PreviewArgs) -> Result<()> {
    let source = settings.build_source()?;
    let name = args.name.unwrap_or_else(|| args.file_id.clone());
    let file = FileRef::new(args.file_id, name);
    let rows = read_table(source.as_ref(), &file)?;

    println!("Sheet: {}", file.display_name());
    println!("Preview:");
    for row in rows.iter().take(args.rows) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        println!("{}", cells.join(", "));
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Summarise the spreadsheets in a Drive folder and serve the results as MCP tools."
)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve get_insights and get_future_recommendations over MCP stdio (default).
    Serve,
    /// Print insights for the configured folder and exit.
    Insights,
    /// Print recommendations for the configured folder and exit.
    Recommend,
    /// List the spreadsheets found in the configured folder.
    List,
    /// Print the first rows of one spreadsheet.
    Preview(PreviewArgs),
}

#[derive(Args)]
struct PreviewArgs {
    /// Source identifier of the spreadsheet (Drive file id, or a path for local sources).
    #[arg(long)]
    file_id: String,

    /// Display name to print instead of the identifier.
    #[arg(long)]
    name: Option<String>,

    /// Number of rows to show.
    #[arg(long, default_value_t = PREVIEW_ROWS)]
    rows: usize,
}

#[derive(Args)]
struct SourceArgs {
    /// Name of the Drive folder holding the spreadsheets.
    #[arg(long, global = true, env = "SPREADSHEET_FOLDER_NAME", default_value = DEFAULT_FOLDER_NAME)]
    folder: String,

    /// Maximum number of spreadsheets to read from the folder.
    #[arg(long, global = true, env = "MAX_SHEETS", default_value_t = DEFAULT_MAX_FILES)]
    max_files: usize,

    /// Cell range requested from native spreadsheets.
    #[arg(long, global = true, env = "DEFAULT_SHEET_RANGE", default_value = DEFAULT_SHEET_RANGE)]
    range: String,

    /// Which kind of spreadsheet to discover and how to read it.
    #[arg(long, global = true, value_enum, env = "SPREADSHEET_MODALITY", default_value_t = Modality::Native)]
    modality: Modality,

    /// Google credential file: a service account key or authorized_user credentials.
    #[arg(long, global = true, env = "GOOGLE_CREDENTIALS_PATH", default_value = DEFAULT_CREDENTIALS_PATH)]
    credentials: PathBuf,

    /// Pre-issued access token; takes precedence over the credential file.
    #[arg(long, global = true, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Read workbooks from this local directory instead of Google Drive.
    #[arg(long, global = true, env = "SPREADSHEET_LOCAL_ROOT")]
    local_root: Option<PathBuf>,

    /// Seconds a loaded table set is reused; 0 reloads on every tool call.
    #[arg(long, global = true, env = "CACHE_TTL_SECS", default_value_t = DEFAULT_STALENESS.as_secs())]
    cache_ttl: u64,

    /// Server name reported to MCP clients.
    #[arg(long, global = true, env = "MCP_SERVER_NAME", default_value = DEFAULT_SERVER_NAME)]
    server_name: String,

    /// Server version reported to MCP clients.
    #[arg(long, global = true, env = "MCP_SERVER_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    server_version: String,

    /// Enable debug logging.
    #[arg(long, global = true, env = "DEBUG")]
    debug: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Modality {
    Native,
    Workbook,
}

impl From<Modality> for SpreadsheetKind {
    fn from(modality: Modality) -> Self {
        match modality {
            Modality::Native => SpreadsheetKind::Native,
            Modality::Workbook => SpreadsheetKind::Workbook,
        }
    }
}

impl SourceArgs {
    fn into_settings(self) -> Settings {
        let source = match self.local_root {
            Some(root) => SourceSettings::Local { root },
            None => SourceSettings::Google {
                credentials_path: self.credentials,
                access_token: self.access_token,
            },
        };

        Settings {
            folder_name: self.folder,
            max_files: self.max_files,
            sheet_range: self.range,
            modality: self.modality.into(),
            source,
            server_name: self.server_name,
            server_version: self.server_version,
            cache_ttl: Duration::from_secs(self.cache_ttl),
            debug: self.debug,
        }
    }
}
