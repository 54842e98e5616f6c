use std::fs::File;
use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use kestrace::TraceKind;
use kestrace::api::{EventStream, KesClient, StreamError};
use kestrace::core::action::Outcome;
use kestrace::core::config::{self, CliOverrides, ResolvedConfig};
use kestrace::{output, tui};
use simplelog::{ConfigBuilder, WriteLogger};
use tokio::runtime::Handle;

#[derive(Parser)]
#[command(name = "kestrace", about = "Trace the audit or error log of a KES server")]
struct Args {
    /// Log to trace
    #[arg(long = "type", default_value_t, value_enum)]
    kind: TraceKind,

    /// Print raw JSON lines instead of the table
    #[arg(long)]
    json: bool,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Server endpoint, e.g. https://127.0.0.1:7373
    #[arg(long)]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cli = CliOverrides {
        endpoint: args.server.clone(),
        insecure: args.insecure,
    };
    let config = config::resolve(&file_config, &cli);
    init_logging(&config);

    log::info!("kestrace starting: {} log from {}", args.kind, config.endpoint);

    let kind = args.kind;
    let stream = match connect(&config, kind).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: failed to connect to {kind} log: {e}");
            return ExitCode::FAILURE;
        }
    };

    let interactive = !args.json && std::io::stdout().is_terminal();
    let history = config.history;
    let runtime = Handle::current();
    let session = tokio::task::spawn_blocking(move || {
        if interactive {
            tui::run(stream, kind, history, &runtime).map_err(|e| e.to_string())
        } else {
            output::run(stream, &runtime).map_err(|e| format!("failed to write output: {e}"))
        }
    })
    .await;

    match session {
        Ok(Ok(Outcome::Cancelled)) => {
            log::info!("Trace cancelled by user");
            ExitCode::SUCCESS
        }
        Ok(Ok(Outcome::Completed)) => ExitCode::SUCCESS,
        Ok(Ok(Outcome::Failed(e))) => {
            eprintln!("Error: {kind} log stream closed with: {e}");
            ExitCode::FAILURE
        }
        Ok(Err(e)) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: trace session panicked: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn connect(
    config: &ResolvedConfig,
    kind: TraceKind,
) -> Result<Box<dyn EventStream>, StreamError> {
    let client = KesClient::new(config)?;
    let stream = client.trace(kind).await?;
    Ok(Box::new(stream))
}

/// File logger; stdout belongs to the table or the JSON lines.
fn init_logging(config: &ResolvedConfig) {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create(&config.log_file) {
        let _ = WriteLogger::init(config.log_level, log_config, log_file);
    }
}
