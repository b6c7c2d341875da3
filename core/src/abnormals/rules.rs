//! Suppression rule loading
//!
//! Rules are loaded from TOML files in two locations:
//! - **Builtin**: shipped next to the executable (read-only)
//! - **Custom**: user-created rules (editable)
//!
//! Custom rules are loaded last, so a custom rule replaces a builtin rule
//! for the same abnormality id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use foresight_types::{AbnormalityId, RuleConfig, SuppressionRule};

use crate::config::ConfigError;

/// Per-abnormality suppression rules, keyed by abnormality id.
#[derive(Debug, Clone, Default)]
pub struct SuppressionTable {
    rules: HashMap<AbnormalityId, SuppressionRule>,
}

impl SuppressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = SuppressionRule>) -> Self {
        let mut table = Self::new();
        table.add_config(RuleConfig {
            rules: rules.into_iter().collect(),
        });
        table
    }

    /// Add rules from a config, returns ids that replaced an existing rule
    pub fn add_config(&mut self, config: RuleConfig) -> Vec<AbnormalityId> {
        let mut replaced = Vec::new();
        for rule in config.rules {
            if self.rules.insert(rule.id, rule).is_some() {
                replaced.push(rule.id);
            }
        }
        replaced
    }

    /// Rule for `id`. Unknown ids have no rule.
    pub fn get(&self, id: AbnormalityId) -> Option<&SuppressionRule> {
        self.rules.get(&id)
    }

    pub fn is_blocked(&self, id: AbnormalityId) -> bool {
        self.get(id).is_some_and(|rule| rule.blocked)
    }

    pub fn overrides(&self, id: AbnormalityId) -> Option<AbnormalityId> {
        self.get(id).and_then(|rule| rule.overrides)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules sorted by id, for saving
    pub fn to_config(&self) -> RuleConfig {
        let mut rules: Vec<SuppressionRule> = self.rules.values().copied().collect();
        rules.sort_by_key(|rule| rule.id);
        RuleConfig { rules }
    }
}

/// Load rules from builtin and custom rule directories.
///
/// Missing directories are skipped. A directory that exists but cannot be
/// read is an error; a single malformed file is logged and skipped.
pub fn load_rules(
    builtin_dir: Option<&Path>,
    custom_dir: Option<&Path>,
) -> Result<SuppressionTable, ConfigError> {
    let mut table = SuppressionTable::new();

    if let Some(dir) = builtin_dir
        && dir.exists()
    {
        load_directory(&mut table, dir, "builtin")?;
    }

    if let Some(dir) = custom_dir
        && dir.exists()
    {
        load_directory(&mut table, dir, "custom")?;
    }

    tracing::debug!(count = table.len(), "Loaded suppression rules");
    Ok(table)
}

/// Load all TOML files from a directory, in file name order
fn load_directory(table: &mut SuppressionTable, dir: &Path, source: &str) -> Result<(), ConfigError> {
    let entries = fs::read_dir(dir).map_err(|e| ConfigError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path) {
            Ok(config) => {
                let replaced = table.add_config(config);
                if !replaced.is_empty() {
                    tracing::debug!(source, file = ?path.file_name(), ?replaced, "Rules replaced earlier definitions");
                }
            }
            Err(e) => {
                tracing::warn!(source, error = %e, "Failed to load rule file, skipping");
            }
        }
    }

    Ok(())
}

/// Load a single TOML rule file
pub fn load_file(path: &Path) -> Result<RuleConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Save rules to a TOML file
pub fn save_file(path: &Path, config: &RuleConfig) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::write(path, contents).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Get the default builtin rules directory
pub fn default_builtin_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("rules")))
}

/// Get the default custom rules directory
pub fn default_custom_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("foresight").join("rules"))
}
