//! `lspcheck` entry point: argument handling, settings-file defaults, and
//! the run loop gluing session, checker, and exit code together.

mod checker;
mod lang;
mod render;
mod settings;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, FromArgMatches, Parser};
use lspcheck_client::Session;

use crate::checker::Checker;
use crate::settings::{Settings, command_line_from_value, split_command_line};

/// Diagnostics were found in at least one checked file.
const EXIT_CODE_MATCHES_FOUND: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    about = "Check files for problems by handing them to an LSP language server",
    disable_version_flag = true
)]
struct Args {
    /// Command line that starts the language server, split on unescaped
    /// spaces (escape spaces inside a path with `\ `)
    #[arg(long, value_name = "COMMAND")]
    server_command_line: Option<String>,

    /// Working directory for the language server process
    #[arg(long, value_name = "DIR")]
    server_working_directory: Option<PathBuf>,

    /// JSON file answering the server's workspace/configuration requests
    #[arg(long, value_name = "FILE")]
    client_configuration: Option<PathBuf>,

    /// Omit suggestions that require executing a server command
    #[arg(long)]
    hide_commands: bool,

    /// Give up if the server takes longer than this to respond
    #[arg(long, value_name = "SECONDS")]
    server_timeout_seconds: Option<u64>,

    /// Log progress to standard error
    #[arg(short, long)]
    verbose: bool,

    /// Print version information as JSON and exit
    #[arg(short = 'V', long)]
    version: bool,

    /// Files or directories to check; `-` reads a document from stdin
    #[arg(value_name = "PATH", required_unless_present = "version")]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let settings = Settings::load()?;
    let args = parse_args(&settings);

    if args.version {
        println!("{}", build_version());
        return Ok(ExitCode::SUCCESS);
    }

    let verbose = args.verbose || settings_flag(&settings, "--verbose");
    init_tracing(verbose);

    let command_line = resolve_command_line(&args, &settings)?;
    let working_dir = resolve_working_dir(&args, &settings);
    let hide_commands = args.hide_commands || settings_flag(&settings, "--hide-commands");
    let response_timeout = args
        .server_timeout_seconds
        .or_else(|| {
            settings
                .default_value("--server-timeout-seconds")
                .and_then(serde_json::Value::as_u64)
        })
        .map(Duration::from_secs);

    let configuration_path = args.client_configuration.clone().or_else(|| {
        settings
            .default_value("--client-configuration")
            .and_then(|v| v.as_str())
            .map(PathBuf::from)
    });
    let configuration = load_configuration(configuration_path.as_deref())?;

    let session = Session::connect(
        &command_line,
        working_dir.as_deref(),
        configuration,
        response_timeout,
    )
    .await?;

    let checker = Checker::new(session, hide_commands);
    let result = checker.check_paths(&args.paths).await;
    checker.shutdown().await;

    let total = result?;
    tracing::info!(total, "check finished");
    if total > 0 {
        Ok(ExitCode::from(EXIT_CODE_MATCHES_FOUND))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Parse the command line, letting the settings file rename the program
/// for help output (wrapper scripts present themselves as the tool).
fn parse_args(settings: &Settings) -> Args {
    let mut command = Args::command();
    if let Some(name) = settings.program_name() {
        command = command.name(name.to_string()).bin_name(name.to_string());
    }
    let matches = command.get_matches();
    match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    }
}

fn settings_flag(settings: &Settings, option: &str) -> bool {
    settings
        .default_value(option)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false)
}

fn resolve_command_line(args: &Args, settings: &Settings) -> Result<Vec<String>> {
    let parts = if let Some(raw) = &args.server_command_line {
        split_command_line(raw)
    } else if let Some(value) = settings.default_value("--server-command-line") {
        command_line_from_value(value).with_context(|| {
            "defaultValues[\"--server-command-line\"] must be a string or an array of strings"
        })?
    } else {
        bail!("no server command line; pass --server-command-line or set it in the settings file");
    };

    if parts.is_empty() {
        bail!("server command line is empty");
    }
    Ok(parts)
}

/// Server working directory: explicit flag, then settings default, then
/// the settings file's own directory.
fn resolve_working_dir(args: &Args, settings: &Settings) -> Option<PathBuf> {
    args.server_working_directory
        .clone()
        .or_else(|| {
            settings
                .default_value("--server-working-directory")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
        })
        .or_else(|| settings.settings_dir().map(Path::to_path_buf))
}

fn load_configuration(path: Option<&Path>) -> Result<serde_json::Value> {
    let Some(path) = path else {
        return Ok(serde_json::json!({}));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading client configuration {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing client configuration {}", path.display()))
}

fn build_version() -> String {
    let info = serde_json::json!({
        "lspcheck": env!("CARGO_PKG_VERSION"),
        "host": format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS),
    });
    serde_json::to_string_pretty(&info).unwrap_or_default()
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(server_command_line: Option<&str>) -> Args {
        Args {
            server_command_line: server_command_line.map(String::from),
            server_working_directory: None,
            client_configuration: None,
            hide_commands: false,
            server_timeout_seconds: None,
            verbose: false,
            version: false,
            paths: vec![],
        }
    }

    fn settings_with(default_values: serde_json::Value) -> Settings {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lspcheck.json");
        std::fs::write(
            &path,
            serde_json::json!({ "defaultValues": default_values }).to_string(),
        )
        .unwrap();
        // Leak the tempdir so the settings file outlives the helper.
        std::mem::forget(dir);
        Settings::from_file(&path).unwrap()
    }

    #[test]
    fn explicit_flag_beats_settings_default() {
        let settings = settings_with(serde_json::json!({
            "--server-command-line": "other --stdio"
        }));
        let parts = resolve_command_line(&args(Some("srv --stdio")), &settings).unwrap();
        assert_eq!(parts, vec!["srv", "--stdio"]);
    }

    #[test]
    fn settings_default_fills_missing_flag() {
        let settings = settings_with(serde_json::json!({
            "--server-command-line": ["srv", "--stdio"],
            "--hide-commands": true
        }));
        let parts = resolve_command_line(&args(None), &settings).unwrap();
        assert_eq!(parts, vec!["srv", "--stdio"]);
        assert!(settings_flag(&settings, "--hide-commands"));
        assert!(!settings_flag(&settings, "--verbose"));
    }

    #[test]
    fn missing_command_line_is_an_error() {
        assert!(resolve_command_line(&args(None), &Settings::default()).is_err());
        assert!(resolve_command_line(&args(Some("   ")), &Settings::default()).is_err());
    }

    #[test]
    fn working_dir_falls_back_to_settings_dir() {
        let settings = settings_with(serde_json::json!({}));
        let dir = resolve_working_dir(&args(None), &settings);
        assert_eq!(dir.as_deref(), settings.settings_dir());
        assert!(dir.is_some());
    }

    #[test]
    fn configuration_defaults_to_empty_object() {
        assert_eq!(
            load_configuration(None).unwrap(),
            serde_json::json!({})
        );
    }

    #[test]
    fn version_blob_shape() {
        let value: serde_json::Value = serde_json::from_str(&build_version()).unwrap();
        assert_eq!(value["lspcheck"], env!("CARGO_PKG_VERSION"));
        assert!(value["host"].as_str().unwrap().contains('-'));
    }
}
