//! Abnormality tracker
//!
//! Keeps a countdown for every abnormality on the local player and decides
//! how each authoritative abnormality message reaches the game client.
//! Durations are shortened by the minimum observed round trip so the local
//! expiry lands close to the server's.

use std::collections::HashSet;

use foresight_types::formatting::trace_stamp;

use crate::latency::LatencyEstimator;
use crate::protocol::{
    AbnormalityEnd, AbnormalityId, AbnormalityUpdate, ClientMessage, GameId, Outbox, Verdict,
};
use crate::session::PlayerSession;
use crate::timers::Millis;
use crate::tracking::{AddOutcome, EntryDuration, TimedTracker};

use super::SuppressionTable;

/// Stack count carried by an abnormality.
pub type Stacks = u32;

/// Begin or refresh, as a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbnormalityKind {
    Begin,
    Refresh,
}

impl AbnormalityKind {
    /// The message type the client expects given whether the abnormality is
    /// already shown.
    pub fn for_existing(existed: bool) -> Self {
        if existed { Self::Refresh } else { Self::Begin }
    }

    pub fn message(self, update: AbnormalityUpdate) -> ClientMessage {
        match self {
            Self::Begin => ClientMessage::AbnormalityBegin(update),
            Self::Refresh => ClientMessage::AbnormalityRefresh(update),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Begin => "AbnormalityBegin",
            Self::Refresh => "AbnormalityRefresh",
        }
    }
}

/// What reconciliation did with an authoritative message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Target is not the local player; left alone
    NotLocal,
    /// Blocked by a suppression rule
    Suppressed,
    /// Abnormality was not tracked and now is
    Began,
    /// Abnormality was already tracked (possibly predicted) and was refreshed
    Refreshed,
    /// Abnormality was tracked and has ended
    Ended,
    /// End for an abnormality that was not tracked
    Untracked,
}

/// Outcome of reconciling one message, plus what to do with the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub outcome: Reconciled,
    pub verdict: Verdict,
}

impl Reconciliation {
    fn pass(outcome: Reconciled) -> Self {
        Self {
            outcome,
            verdict: Verdict::Pass,
        }
    }

    fn block(outcome: Reconciled) -> Self {
        Self {
            outcome,
            verdict: Verdict::Block,
        }
    }
}

/// Latency-compensated abnormality state of the local player.
#[derive(Debug, Clone, Default)]
pub struct AbnormalityTracker {
    entries: TimedTracker<AbnormalityId, Stacks>,
    rules: SuppressionTable,
    /// Emit a trace line for every message seen or sent
    debug: bool,
}

impl AbnormalityTracker {
    pub fn new(rules: SuppressionTable) -> Self {
        Self {
            entries: TimedTracker::new(),
            rules,
            debug: false,
        }
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn rules(&self) -> &SuppressionTable {
        &self.rules
    }

    /// Swap the rule table (e.g. after a reload). Tracked entries are kept.
    pub fn set_rules(&mut self, rules: SuppressionTable) {
        self.rules = rules;
    }

    pub fn exists(&self, id: AbnormalityId) -> bool {
        self.entries.exists(id)
    }

    pub fn stacks(&self, id: AbnormalityId) -> Option<Stacks> {
        self.entries.get(id).map(|entry| entry.metadata)
    }

    pub fn remaining(&self, id: AbnormalityId, now: Millis) -> Option<EntryDuration> {
        self.entries.remaining(id, now)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<AbnormalityId> {
        self.entries.ids()
    }

    /// Whether any tracked abnormality is in `set`.
    pub fn any_in(&self, set: &HashSet<AbnormalityId>) -> bool {
        self.entries.any(|id| set.contains(&id))
    }

    pub fn live_timers(&self) -> usize {
        self.entries.live_timers()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.entries.next_deadline()
    }

    // ─── Authoritative messages ─────────────────────────────────────────────

    /// Reconcile an authoritative begin/refresh.
    ///
    /// When the server's message type matches local state, the original is
    /// forwarded with its compensated duration. When it does not (a refresh
    /// for something never shown, or a begin for something already predicted)
    /// the original is blocked and the correctly typed message is sent instead.
    pub fn reconcile(
        &mut self,
        kind: AbnormalityKind,
        update: &AbnormalityUpdate,
        player: &PlayerSession,
        latency: &LatencyEstimator,
        now: Millis,
        outbox: &mut Outbox,
    ) -> Reconciliation {
        if !player.is_local(update.target) {
            return Reconciliation::pass(Reconciled::NotLocal);
        }

        let id = update.id;
        let blocked = self.rules.is_blocked(id);
        self.trace(now, if blocked { "<X" } else { "<-" }, || {
            format!("{} {} {} {}", kind.name(), id, update.duration, update.stacks)
        });
        if blocked {
            return Reconciliation::block(Reconciled::Suppressed);
        }

        if let Some(target) = self.rules.overrides(id)
            && self.entries.exists(target)
        {
            self.remove(target, player, now, outbox);
        }

        let duration = EntryDuration::from_wire(update.duration).compensate(latency.min());
        let adjusted = AbnormalityUpdate {
            duration: duration.to_wire(),
            ..*update
        };

        let existed = self.entries.exists(id);
        let outcome = if existed {
            Reconciled::Refreshed
        } else {
            Reconciled::Began
        };

        if kind == AbnormalityKind::for_existing(existed) {
            self.entries.add(id, duration, update.stacks, now);
            Reconciliation {
                outcome,
                verdict: Verdict::Rewrite(kind.message(adjusted)),
            }
        } else {
            self.announce(adjusted, duration, now, outbox);
            Reconciliation::block(outcome)
        }
    }

    /// Reconcile an authoritative end.
    pub fn reconcile_end(
        &mut self,
        end: &AbnormalityEnd,
        player: &PlayerSession,
        now: Millis,
    ) -> Reconciliation {
        if !player.is_local(end.target) {
            return Reconciliation::pass(Reconciled::NotLocal);
        }

        let blocked = self.rules.is_blocked(end.id);
        self.trace(now, if blocked { "<X" } else { "<-" }, || {
            format!("AbnormalityEnd {}", end.id)
        });
        if blocked {
            return Reconciliation::block(Reconciled::Suppressed);
        }
        if self.entries.remove(end.id).is_none() {
            return Reconciliation::block(Reconciled::Untracked);
        }
        Reconciliation::pass(Reconciled::Ended)
    }

    // ─── Local changes (each one tells the client) ──────────────────────────

    /// Predict an abnormality ahead of the server and show it immediately.
    ///
    /// The later authoritative message reconciles as a refresh.
    pub fn predict(
        &mut self,
        id: AbnormalityId,
        duration: EntryDuration,
        stacks: Stacks,
        player: &PlayerSession,
        latency: &LatencyEstimator,
        now: Millis,
        outbox: &mut Outbox,
    ) -> AddOutcome {
        let duration = duration.compensate(latency.min());
        let game_id = local_id(player);
        let update = AbnormalityUpdate {
            target: game_id,
            source: game_id,
            id,
            duration: duration.to_wire(),
            stacks,
        };
        self.announce(update, duration, now, outbox)
    }

    /// Remove an abnormality and tell the client it ended.
    pub fn remove(
        &mut self,
        id: AbnormalityId,
        player: &PlayerSession,
        now: Millis,
        outbox: &mut Outbox,
    ) -> bool {
        if self.entries.remove(id).is_none() {
            return false;
        }
        self.notify_end(id, local_id(player), now, outbox);
        true
    }

    /// Remove everything (session ended or local player died).
    pub fn remove_all(&mut self, player: &PlayerSession, now: Millis, outbox: &mut Outbox) -> usize {
        let removed = self.entries.remove_all();
        let game_id = local_id(player);
        for (id, _) in &removed {
            self.notify_end(*id, game_id, now, outbox);
        }
        removed.len()
    }

    /// Expire every countdown due at `now`, telling the client for each.
    pub fn expire_due(&mut self, now: Millis, player: &PlayerSession, outbox: &mut Outbox) -> usize {
        let expired = self.entries.expire_due(now);
        let game_id = local_id(player);
        for (id, _) in &expired {
            self.notify_end(*id, game_id, now, outbox);
        }
        expired.len()
    }

    fn announce(
        &mut self,
        update: AbnormalityUpdate,
        duration: EntryDuration,
        now: Millis,
        outbox: &mut Outbox,
    ) -> AddOutcome {
        let kind = AbnormalityKind::for_existing(self.entries.exists(update.id));
        self.trace(now, "<*", || {
            format!("{} {} {} {}", kind.name(), update.id, update.duration, update.stacks)
        });
        outbox.to_client(kind.message(update));
        self.entries.add(update.id, duration, update.stacks, now)
    }

    fn notify_end(&self, id: AbnormalityId, target: GameId, now: Millis, outbox: &mut Outbox) {
        self.trace(now, "<*", || format!("AbnormalityEnd {}", id));
        outbox.to_client(ClientMessage::AbnormalityEnd(AbnormalityEnd { target, id }));
    }

    fn trace(&self, now: Millis, marker: &str, line: impl FnOnce() -> String) {
        if self.debug {
            tracing::debug!("{} {} {}", trace_stamp(now), marker, line());
        }
    }
}

fn local_id(player: &PlayerSession) -> GameId {
    player.game_id().unwrap_or_default()
}
