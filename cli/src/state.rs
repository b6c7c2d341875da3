use std::path::PathBuf;

use foresight_core::abnormals::{default_builtin_dir, default_custom_dir, load_rules};
use foresight_core::config::load_settings;
use foresight_core::{ConfigError, SessionContext, SuppressionTable};
use foresight_types::Settings;

/// Everything the console keeps between commands.
pub struct AppState {
    pub settings: Settings,
    pub rules: SuppressionTable,
    pub builtin_dir: Option<PathBuf>,
    pub custom_dir: Option<PathBuf>,
    /// Session of the last replay, kept so `sp` commands can inspect it
    pub session: SessionContext,
}

impl AppState {
    pub fn new() -> Self {
        let settings = load_settings();
        let builtin_dir = default_builtin_dir();
        let custom_dir = default_custom_dir();

        let rules = load_rules(builtin_dir.as_deref(), custom_dir.as_deref()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load suppression rules, starting without any");
            SuppressionTable::new()
        });
        tracing::info!(rules = rules.len(), "Console state initialised");

        Self {
            session: SessionContext::new(settings, rules.clone()),
            settings,
            rules,
            builtin_dir,
            custom_dir,
        }
    }

    /// A fresh session with the current settings and rules.
    pub fn new_session(&self) -> SessionContext {
        SessionContext::new(self.settings, self.rules.clone())
    }

    /// Re-read every rule file and hand the result to the live session.
    pub fn reload_rules(&mut self) -> Result<usize, ConfigError> {
        self.rules = load_rules(self.builtin_dir.as_deref(), self.custom_dir.as_deref())?;
        self.session.set_rules(self.rules.clone());
        Ok(self.rules.len())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
