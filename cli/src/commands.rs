use std::path::Path;
use std::sync::Arc;

use foresight_core::Millis;
use foresight_core::abnormals::{load_file, save_file};
use foresight_core::commands::{self as diagnostics, Command};
use foresight_core::config::{settings_path, store_settings};
use foresight_types::formatting::format_seconds;
use foresight_types::{AbnormalityId, RuleConfig, SuppressionRule};
use tokio::sync::RwLock;

use crate::replay::{read_replay, replay_offline, replay_realtime};
use crate::state::AppState;

const CUSTOM_RULES_FILE: &str = "custom.toml";

/// Replay a capture into a fresh session, which then becomes the live one.
pub async fn replay(
    path: &str,
    realtime: bool,
    until: Option<Millis>,
    state: Arc<RwLock<AppState>>,
) -> Result<(), String> {
    let entries = read_replay(Path::new(path)).map_err(|e| e.to_string())?;
    let count = entries.len();
    let mut session = state.read().await.new_session();

    let timer = std::time::Instant::now();
    if realtime {
        replay_realtime(&mut session, entries, until).await;
    } else {
        for line in replay_offline(&mut session, &entries, until) {
            println!("{line}");
        }
    }

    println!(
        "Replayed {} messages in {:.2}ms, {} abnormalities and {} cooldowns still active",
        count,
        timer.elapsed().as_secs_f64() * 1000.0,
        session.abnormals().len(),
        session.cooldowns().len(),
    );
    state.write().await.session = session;
    Ok(())
}

/// Run an `sp` diagnostic command against the live session.
pub async fn sp(args: &[String], state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let command = Command::parse(args);
    let mut s = state.write().await;
    println!("{}", diagnostics::execute(&command, &mut s.session));

    if matches!(command, Command::Debug(_)) {
        s.settings = *s.session.settings();
        store_settings(&s.settings).map_err(|e| e.to_string())?;
    }
    Ok(())
}

pub async fn show_settings(state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let s = state.read().await;

    println!("Settings file: {:?}", settings_path());
    println!(
        "Ping: interval={} timeout={} history={}",
        format_seconds(s.settings.ping.interval_ms),
        format_seconds(s.settings.ping.timeout_ms),
        s.settings.ping.max_history
    );
    println!(
        "Debug: skills={} loc={} abnormals={}",
        s.settings.debug.skills, s.settings.debug.loc, s.settings.debug.abnormals
    );
    println!("Builtin rules: {:?}", s.builtin_dir);
    println!("Custom rules: {:?}", s.custom_dir);
    println!("Rules loaded: {}", s.rules.len());
    Ok(())
}

/// Add or replace a rule in the custom rule file, then reload every rule.
pub async fn add_rule(
    id: AbnormalityId,
    overrides: Option<AbnormalityId>,
    state: Arc<RwLock<AppState>>,
) -> Result<(), String> {
    let mut s = state.write().await;
    let dir = s
        .custom_dir
        .clone()
        .ok_or("No config directory on this platform")?;
    std::fs::create_dir_all(&dir).map_err(|e| e.to_string())?;

    let path = dir.join(CUSTOM_RULES_FILE);
    let mut config = if path.exists() {
        load_file(&path).map_err(|e| e.to_string())?
    } else {
        RuleConfig::default()
    };

    let rule = match overrides {
        Some(target) => SuppressionRule::overriding(id, target),
        None => SuppressionRule::blocked(id),
    };
    config.rules.retain(|existing| existing.id != id);
    config.rules.push(rule);
    save_file(&path, &config).map_err(|e| e.to_string())?;

    let count = s.reload_rules().map_err(|e| e.to_string())?;
    println!("Saved rule for {} to {:?} ({} rules loaded)", id, path, count);
    Ok(())
}

pub async fn reload_rules(state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let count = state
        .write()
        .await
        .reload_rules()
        .map_err(|e| e.to_string())?;
    println!("{count} rules loaded");
    Ok(())
}

pub fn exit() {
    tracing::info!("Console exiting");
    println!("Exiting...");
}
