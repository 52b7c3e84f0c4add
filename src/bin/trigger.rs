use aws_config::BehaviorVersion;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use pregao::trigger::{GlueJobLauncher, handle_event};
use pregao::{JobConfig, init_tracing};

/// Handle a storage-write notification and dispatch the refine job.
///
/// Reads the event JSON from a file or stdin and prints the HTTP-style
/// response as JSON on stdout.
#[derive(Debug, Parser)]
#[command(name = "pregao-trigger", version)]
struct Cli {
    /// Path to the event JSON; reads stdin when omitted.
    event: Option<PathBuf>,

    /// Path to the YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refine job to start; overrides the configured name.
    #[arg(long)]
    job_name: Option<String>,

    /// Exit non-zero when the event could not be dispatched.
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match JobConfig::from_file(&path.to_string_lossy()) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Configuration error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => JobConfig::default(),
    };
    let job_name = cli.job_name.unwrap_or(config.job_name);

    let event_json = match read_event(&cli.event) {
        Ok(event_json) => event_json,
        Err(err) => {
            eprintln!("Failed to read event: {err}");
            return ExitCode::FAILURE;
        }
    };

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let launcher = GlueJobLauncher::new(&sdk_config);

    let response = handle_event(&event_json, &job_name, &launcher).await;
    match serde_json::to_string(&response) {
        Ok(body) => println!("{body}"),
        Err(err) => {
            eprintln!("Failed to serialize response: {err}");
            return ExitCode::FAILURE;
        }
    }

    if cli.strict && response.status_code != 200 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn read_event(path: &Option<PathBuf>) -> Result<String, std::io::Error> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut event_json = String::new();
            std::io::stdin().read_to_string(&mut event_json)?;
            Ok(event_json)
        }
    }
}
