use serde::{Deserialize, Serialize};

/// Default delay between two latency probes, in milliseconds.
pub const DEFAULT_PING_INTERVAL_MS: u64 = 6_000;
/// Default time to wait for a probe reply before re-sending, in milliseconds.
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 30_000;
/// Default number of round-trip samples kept in the latency window.
pub const DEFAULT_PING_HISTORY: usize = 20;

/// User settings, persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ping: PingSettings,
    pub debug: DebugSettings,
}

/// Latency probe cadence and window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingSettings {
    /// Target wall-clock spacing between probes
    pub interval_ms: u64,
    /// Retry a probe that has not been answered within this delay
    pub timeout_ms: u64,
    /// Capacity of the round-trip sample window
    pub max_history: usize,
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_PING_INTERVAL_MS,
            timeout_ms: DEFAULT_PING_TIMEOUT_MS,
            max_history: DEFAULT_PING_HISTORY,
        }
    }
}

/// Diagnostic trace toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub skills: bool,
    pub loc: bool,
    pub abnormals: bool,
}

/// Which diagnostic trace a `debug` command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugKind {
    Skills,
    Location,
    Abnormals,
}

impl DebugKind {
    /// Resolve a command argument. Anything unrecognised selects skill tracing.
    pub fn from_arg(arg: &str) -> Self {
        match arg.to_lowercase().as_str() {
            "loc" | "location" => Self::Location,
            "abnormal" | "abnormals" | "abnormality" | "abnormalities" => Self::Abnormals,
            _ => Self::Skills,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Skills => "Skill",
            Self::Location => "Location",
            Self::Abnormals => "Abnormality",
        }
    }
}

impl DebugSettings {
    pub fn get(&self, kind: DebugKind) -> bool {
        match kind {
            DebugKind::Skills => self.skills,
            DebugKind::Location => self.loc,
            DebugKind::Abnormals => self.abnormals,
        }
    }

    /// Flip a trace flag and return its new value.
    pub fn toggle(&mut self, kind: DebugKind) -> bool {
        let flag = match kind {
            DebugKind::Skills => &mut self.skills,
            DebugKind::Location => &mut self.loc,
            DebugKind::Abnormals => &mut self.abnormals,
        };
        *flag = !*flag;
        *flag
    }
}
