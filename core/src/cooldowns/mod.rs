//! Cooldown tracker
//!
//! Tracks the local player's skill cooldowns. Expiry is silent: the client
//! runs its own cooldown display, so nothing is sent when one ends.

use foresight_types::formatting::trace_stamp;

use crate::latency::LatencyEstimator;
use crate::protocol::{ClientMessage, CooltimeSkill, SkillId, Verdict};
use crate::timers::Millis;
use crate::tracking::{EntryDuration, TimedTracker};

#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    entries: TimedTracker<SkillId, ()>,
    debug: bool,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn is_on_cooldown(&self, skill: SkillId) -> bool {
        self.entries.exists(skill)
    }

    pub fn remaining(&self, skill: SkillId, now: Millis) -> Option<EntryDuration> {
        self.entries.remaining(skill, now)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn live_timers(&self) -> usize {
        self.entries.live_timers()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.entries.next_deadline()
    }

    /// Apply a server cooldown message.
    ///
    /// A non-positive cooldown ends the skill's cooldown and the original
    /// passes through untouched. Anything else is shortened by the minimum
    /// round trip and forwarded with the shortened value.
    pub fn on_cooldown(
        &mut self,
        message: &CooltimeSkill,
        latency: &LatencyEstimator,
        now: Millis,
    ) -> Verdict {
        let skill = message.skill;
        self.trace(now, || format!("<- StartCooltimeSkill {} {}", skill, message.cooldown));

        if message.cooldown <= 0 {
            self.entries.remove(skill);
            return Verdict::Pass;
        }

        // Cooldowns have no permanent form; every positive value counts down
        let remaining = message
            .cooldown
            .unsigned_abs()
            .saturating_sub(u64::from(latency.min()));
        if remaining == 0 {
            // Already over by the time the client sees it
            self.entries.remove(skill);
        } else {
            self.entries
                .add(skill, EntryDuration::Finite(remaining), (), now);
        }

        Verdict::Rewrite(ClientMessage::StartCooltimeSkill(CooltimeSkill {
            skill,
            cooldown: i64::try_from(remaining).unwrap_or(i64::MAX),
        }))
    }

    /// Forget every cooldown (zone change).
    pub fn reset(&mut self) -> usize {
        let cleared = self.entries.remove_all().len();
        if cleared > 0 {
            tracing::debug!(cleared, "Cooldowns reset");
        }
        cleared
    }

    /// Drop every cooldown due at `now`.
    pub fn expire_due(&mut self, now: Millis) -> usize {
        let expired = self.entries.expire_due(now);
        for (skill, ()) in &expired {
            self.trace(now, || format!("-- cooldown ready {}", skill));
        }
        expired.len()
    }

    fn trace(&self, now: Millis, line: impl FnOnce() -> String) {
        if self.debug {
            tracing::debug!("{} {}", trace_stamp(now), line());
        }
    }
}
