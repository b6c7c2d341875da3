//! `sp` diagnostic commands
//!
//! Parsed from the words following the `sp` prefix. Every command answers
//! with a single line of text for the user.

use foresight_types::DebugKind;

use crate::context::SessionContext;

pub const HELP_TEXT: &str = "Commands:\n\
    ping = Display ping statistics.\n\
    debug [skill|loc|abnormal] = Toggle debug modes.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Ping,
    Debug(DebugKind),
    Unknown(String),
}

impl Command {
    /// Parse the arguments of an `sp` command. No arguments means help.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let Some(name) = args.first() else {
            return Self::Help;
        };
        match name.as_ref().to_lowercase().as_str() {
            "help" => Self::Help,
            "ping" => Self::Ping,
            "debug" => {
                let kind = args.get(1).map_or("", |arg| arg.as_ref());
                Self::Debug(DebugKind::from_arg(kind))
            }
            _ => Self::Unknown(name.as_ref().to_string()),
        }
    }
}

/// Run a command against the session and return the reply.
pub fn execute(command: &Command, context: &mut SessionContext) -> String {
    match command {
        Command::Help => HELP_TEXT.to_string(),
        Command::Ping => context.latency().summary(),
        Command::Debug(kind) => {
            let enabled = context.toggle_debug(*kind);
            tracing::info!(kind = kind.label(), enabled, "Debug toggled");
            format!(
                "{} debug {}.",
                kind.label(),
                if enabled { "enabled" } else { "disabled" }
            )
        }
        Command::Unknown(name) => format!("Unknown command \"{}\".", name),
    }
}
