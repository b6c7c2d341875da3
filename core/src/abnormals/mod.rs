//! Abnormality (status effect) tracking
//!
//! This module provides:
//! - **Rules**: per-abnormality suppression and override rules (loaded from TOML)
//! - **Tracker**: reconciles authoritative abnormality messages with local
//!   predictions and keeps a latency-compensated countdown per abnormality
//!
//! # Flow
//!
//! ```text
//!   AbnormalityBegin / Refresh (server)       predict() (client side)
//!                │                                    │
//!        rule lookup: blocked? ── yes ──► Block       │
//!                │                                    │
//!        overrides tracked id? ── yes ──► remove it   │
//!                │                                    │
//!                └──── duration - min latency ◄───────┘
//!                              │
//!                begin or refresh the countdown
//!                              │
//!                              ▼
//!              Rewrite / synthetic message to client
//! ```

mod rules;
mod tracker;

#[cfg(test)]
mod tracker_tests;

pub use rules::{
    SuppressionTable, default_builtin_dir, default_custom_dir, load_file, load_rules, save_file,
};
pub use tracker::{AbnormalityKind, AbnormalityTracker, Reconciled, Reconciliation, Stacks};
