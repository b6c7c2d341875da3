use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use foresight_cli::commands;
use foresight_cli::readline;
use foresight_cli::state::AppState;
use tokio::sync::RwLock;
use tracing_subscriber::filter::EnvFilter;

/// Initialize logging, writing to FORESIGHT_LOG_PATH if set, otherwise stderr.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("FORESIGHT_LOG_PATH")
        && let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
    {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(file)
            .init();
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_logging();
    let state = Arc::new(RwLock::new(AppState::new()));

    // One-shot mode: `foresight replay -p capture.jsonl`
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        respond(args, Arc::clone(&state)).await?;
        return Ok(());
    }

    loop {
        let Some(line) = readline()? else {
            // End of input (Ctrl-D or a drained pipe)
            commands::exit();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match shlex::split(line) {
            Some(args) => respond(args, Arc::clone(&state)).await,
            None => Err("error: Invalid quoting".to_string()),
        };
        match result {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(version, about = "foresight console")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines message capture
    Replay {
        #[arg(short, long)]
        path: String,
        /// Keep the capture's original pacing
        #[arg(short, long)]
        realtime: bool,
        /// Stop at this session time (ms) and run timers up to it
        #[arg(short, long)]
        until: Option<u64>,
    },
    /// Diagnostic commands: ping, debug [skill|loc|abnormal], help
    Sp {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Block an abnormality, or make it override another one
    Rule {
        #[arg(short, long)]
        id: u32,
        #[arg(short, long)]
        overrides: Option<u32>,
    },
    ReloadRules,
    Config,
    Exit,
}

async fn respond(mut args: Vec<String>, state: Arc<RwLock<AppState>>) -> Result<bool, String> {
    args.insert(0, "foresight".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match &cli.command {
        Some(Commands::Replay {
            path,
            realtime,
            until,
        }) => commands::replay(path, *realtime, *until, Arc::clone(&state)).await?,
        Some(Commands::Sp { args }) => commands::sp(args, Arc::clone(&state)).await?,
        Some(Commands::Rule { id, overrides }) => {
            commands::add_rule(*id, *overrides, Arc::clone(&state)).await?
        }
        Some(Commands::ReloadRules) => commands::reload_rules(Arc::clone(&state)).await?,
        Some(Commands::Config) => commands::show_settings(Arc::clone(&state)).await?,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
