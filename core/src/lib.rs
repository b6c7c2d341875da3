//! Latency-compensated tracking of short-lived game state.
//!
//! The engine sits between a game client and its server. It measures the
//! round trip to the server and uses it to shorten every incoming duration,
//! so abnormalities and cooldowns end on the client about when they end on
//! the server. All time is supplied by the caller as [`Millis`].

pub mod abnormals;
pub mod commands;
pub mod config;
pub mod context;
pub mod cooldowns;
pub mod latency;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod timers;
pub mod tracking;

pub use abnormals::{AbnormalityKind, AbnormalityTracker, Reconciled, SuppressionTable};
pub use commands::Command;
pub use config::ConfigError;
pub use context::{Notice, SessionContext};
pub use cooldowns::CooldownTracker;
pub use latency::LatencyEstimator;
pub use protocol::{ClientMessage, Inbound, Outbound, Outbox, ServerMessage, Verdict};
pub use runtime::{Delivery, run_session};
pub use session::PlayerSession;
pub use timers::Millis;
pub use tracking::{EntryDuration, PERMANENT_DURATION};
