use foresight_types::formatting::trace_stamp;
use foresight_types::{DebugKind, Settings};

use crate::abnormals::{AbnormalityKind, AbnormalityTracker, SuppressionTable};
use crate::cooldowns::CooldownTracker;
use crate::latency::LatencyEstimator;
use crate::protocol::{AbnormalityId, Inbound, Outbound, Outbox, Verdict};
use crate::session::PlayerSession;
use crate::timers::Millis;
use crate::tracking::{AddOutcome, EntryDuration};

/// A line of text meant for the user, such as ping statistics.
pub type Notice = String;

/// Components that own timers. Declaration order breaks ties between
/// timers due at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TimerOwner {
    Latency,
    Abnormals,
    Cooldowns,
}

/// One game session's worth of tracked state.
///
/// Owns one of each component and routes every intercepted message to the
/// right one. Synthetic messages and notices pile up until the owner drains
/// them with [`take_outbound`](Self::take_outbound) and
/// [`take_notices`](Self::take_notices).
#[derive(Debug)]
pub struct SessionContext {
    settings: Settings,
    player: PlayerSession,
    latency: LatencyEstimator,
    abnormals: AbnormalityTracker,
    cooldowns: CooldownTracker,
    outbox: Outbox,
    notices: Vec<Notice>,
    /// Latest time seen by `handle`/`advance`
    now: Millis,
}

impl SessionContext {
    pub fn new(settings: Settings, rules: SuppressionTable) -> Self {
        let mut context = Self {
            latency: LatencyEstimator::new(settings.ping),
            player: PlayerSession::new(),
            abnormals: AbnormalityTracker::new(rules),
            cooldowns: CooldownTracker::new(),
            outbox: Outbox::new(),
            notices: Vec::new(),
            now: 0,
            settings,
        };
        context.apply_debug();
        context
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn player(&self) -> &PlayerSession {
        &self.player
    }

    pub fn latency(&self) -> &LatencyEstimator {
        &self.latency
    }

    pub fn abnormals(&self) -> &AbnormalityTracker {
        &self.abnormals
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    /// Replace the suppression rules, keeping tracked abnormalities.
    pub fn set_rules(&mut self, rules: SuppressionTable) {
        tracing::info!(rules = rules.len(), "Suppression rules replaced");
        self.abnormals.set_rules(rules);
    }

    /// Flip one debug flag and return its new state.
    pub fn toggle_debug(&mut self, kind: DebugKind) -> bool {
        let enabled = self.settings.debug.toggle(kind);
        self.apply_debug();
        enabled
    }

    fn apply_debug(&mut self) {
        self.abnormals.set_debug(self.settings.debug.abnormals);
        self.cooldowns.set_debug(self.settings.debug.skills);
    }

    // ─── Message routing ────────────────────────────────────────────────────

    /// Handle one intercepted message at `now`.
    ///
    /// Timers due at or before `now` fire first, so the message sees the
    /// state the client would see at that instant.
    pub fn handle(&mut self, message: &Inbound, now: Millis) -> Verdict {
        self.advance(now);
        let now = self.now;

        match message {
            Inbound::Login {
                game_id,
                template_id,
            } => {
                self.player.on_login(*game_id, *template_id);
                Verdict::Pass
            }
            Inbound::SpawnMe => {
                self.latency.start_probing(now);
                Verdict::Pass
            }
            Inbound::LoadTopo => {
                self.latency.stop_probing();
                self.cooldowns.reset();
                Verdict::Pass
            }
            Inbound::ReturnToLobby => {
                self.latency.stop_probing();
                // Ends are addressed to the player, so clear before forgetting them
                self.abnormals
                    .remove_all(&self.player, now, &mut self.outbox);
                self.player.reset();
                Verdict::Pass
            }
            Inbound::CreatureLife { game_id, alive } => {
                if !*alive && self.player.is_local(*game_id) {
                    let removed = self
                        .abnormals
                        .remove_all(&self.player, now, &mut self.outbox);
                    tracing::debug!(removed, "Local player died, abnormalities cleared");
                }
                Verdict::Pass
            }
            Inbound::AbnormalityBegin(update) => {
                self.abnormals
                    .reconcile(
                        AbnormalityKind::Begin,
                        update,
                        &self.player,
                        &self.latency,
                        now,
                        &mut self.outbox,
                    )
                    .verdict
            }
            Inbound::AbnormalityRefresh(update) => {
                self.abnormals
                    .reconcile(
                        AbnormalityKind::Refresh,
                        update,
                        &self.player,
                        &self.latency,
                        now,
                        &mut self.outbox,
                    )
                    .verdict
            }
            Inbound::AbnormalityEnd(end) => {
                self.abnormals.reconcile_end(end, &self.player, now).verdict
            }
            Inbound::StartCooltimeSkill(cooltime) => {
                self.cooldowns.on_cooldown(cooltime, &self.latency, now)
            }
            Inbound::NotifyLocation { x, y, z } => {
                if self.settings.debug.loc {
                    tracing::debug!("{} -> NotifyLocation {:.2} {:.2} {:.2}", trace_stamp(now), x, y, z);
                }
                Verdict::Pass
            }
            Inbound::ResponseGamestatPong => {
                // Every pong answers our own probe; the client's are answered locally
                self.latency.on_response(now);
                Verdict::Block
            }
            Inbound::RequestGamestatPing => {
                if self.latency.intercept_client_probe(&mut self.outbox) {
                    self.notices.push(self.latency.summary());
                }
                Verdict::Block
            }
        }
    }

    /// Show an abnormality ahead of the server.
    pub fn predict_abnormality(
        &mut self,
        id: AbnormalityId,
        duration: EntryDuration,
        stacks: u32,
        now: Millis,
    ) -> AddOutcome {
        self.advance(now);
        self.abnormals.predict(
            id,
            duration,
            stacks,
            &self.player,
            &self.latency,
            self.now,
            &mut self.outbox,
        )
    }

    // ─── Timers ─────────────────────────────────────────────────────────────

    /// Earliest pending timer across every component.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.deadlines().map(|(deadline, _)| deadline).min()
    }

    /// Fire every timer due at or before `now`, in global deadline order.
    ///
    /// Each timer fires at its own deadline, so anything it schedules is
    /// relative to when it was due rather than when it was noticed. Time
    /// never goes backwards: an earlier `now` than last seen is ignored.
    pub fn advance(&mut self, now: Millis) {
        while let Some((deadline, owner)) = self
            .deadlines()
            .filter(|(deadline, _)| *deadline <= now)
            .min()
        {
            let at = deadline.max(self.now);
            match owner {
                TimerOwner::Latency => self.latency.fire_due(at, &mut self.outbox),
                TimerOwner::Abnormals => {
                    self.abnormals.expire_due(at, &self.player, &mut self.outbox);
                }
                TimerOwner::Cooldowns => {
                    self.cooldowns.expire_due(at);
                }
            }
            self.now = at;
        }
        self.now = self.now.max(now);
    }

    fn deadlines(&self) -> impl Iterator<Item = (Millis, TimerOwner)> + use<> {
        [
            (self.latency.next_deadline(), TimerOwner::Latency),
            (self.abnormals.next_deadline(), TimerOwner::Abnormals),
            (self.cooldowns.next_deadline(), TimerOwner::Cooldowns),
        ]
        .into_iter()
        .filter_map(|(deadline, owner)| deadline.map(|d| (d, owner)))
    }

    // ─── Draining ───────────────────────────────────────────────────────────

    pub fn take_outbound(&mut self) -> Vec<Outbound> {
        self.outbox.take()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}
