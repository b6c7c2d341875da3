//! Shared configuration types for Foresight.
//!
//! Everything here is plain serde data: user settings persisted by the
//! console, suppression rules loaded from TOML, and the small formatting
//! helpers used by diagnostic output.

pub mod formatting;
mod settings;
mod suppression;

pub use settings::{DebugKind, DebugSettings, PingSettings, Settings};
pub use suppression::{AbnormalityId, RuleConfig, SuppressionRule};
