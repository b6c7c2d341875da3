//! Timed-entry engine
//!
//! Entries live in a map keyed by identifier; each finite entry holds the
//! token of its countdown in the tracker's own [`TimerQueue`]. A countdown
//! only expires its entry if the entry still carries that exact token, so a
//! timer that outlived its entry can never remove a newer one.

use std::fmt::Debug;
use std::hash::Hash;

use hashbrown::HashMap;

use crate::timers::{Millis, TimerQueue, TimerToken};

use super::EntryDuration;

/// When an entry goes away on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Finite { deadline: Millis, token: TimerToken },
    Permanent,
}

#[derive(Debug, Clone)]
pub struct TimedEntry<M> {
    pub expiry: Expiry,
    pub metadata: M,
}

/// Whether an add created an entry or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Began,
    Refreshed,
}

/// Identifier-keyed set of entries with cancellable countdowns.
#[derive(Debug, Clone)]
pub struct TimedTracker<K, M> {
    entries: HashMap<K, TimedEntry<M>>,
    timers: TimerQueue<K>,
}

impl<K, M> Default for TimedTracker<K, M>
where
    K: Copy + Eq + Hash + Ord + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, M> TimedTracker<K, M>
where
    K: Copy + Eq + Hash + Ord + Debug,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            timers: TimerQueue::new(),
        }
    }

    pub fn exists(&self, id: K) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: K) -> Option<&TimedEntry<M>> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked identifiers in ascending order.
    pub fn ids(&self) -> Vec<K> {
        let mut ids: Vec<K> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether any tracked identifier satisfies `pred`.
    pub fn any(&self, mut pred: impl FnMut(K) -> bool) -> bool {
        self.entries.keys().any(|&id| pred(id))
    }

    /// Number of armed countdowns. Never exceeds the number of finite entries.
    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    /// Time left before `id` expires, if tracked.
    pub fn remaining(&self, id: K, now: Millis) -> Option<EntryDuration> {
        self.entries.get(&id).map(|entry| match entry.expiry {
            Expiry::Finite { deadline, .. } => EntryDuration::Finite(deadline.saturating_sub(now)),
            Expiry::Permanent => EntryDuration::Permanent,
        })
    }

    /// Add `id`, or refresh it in place if already tracked.
    ///
    /// Any existing countdown for `id` is cancelled before the new one is
    /// armed. Permanent entries get no countdown.
    pub fn add(&mut self, id: K, duration: EntryDuration, metadata: M, now: Millis) -> AddOutcome {
        let outcome = match self.entries.remove(&id) {
            Some(previous) => {
                self.disarm(previous.expiry);
                AddOutcome::Refreshed
            }
            None => AddOutcome::Began,
        };

        let expiry = match duration {
            EntryDuration::Permanent => Expiry::Permanent,
            EntryDuration::Finite(ms) => {
                let deadline = now.saturating_add(ms);
                let token = self.timers.schedule(deadline, id);
                Expiry::Finite { deadline, token }
            }
        };

        self.entries.insert(
            id,
            TimedEntry { expiry, metadata },
        );
        outcome
    }

    /// Remove `id` and cancel its countdown. No-op for unknown ids.
    pub fn remove(&mut self, id: K) -> Option<M> {
        let entry = self.entries.remove(&id)?;
        self.disarm(entry.expiry);
        Some(entry.metadata)
    }

    /// Remove every entry, leaving no armed countdown behind.
    pub fn remove_all(&mut self) -> Vec<(K, M)> {
        self.timers.clear();
        let mut removed: Vec<(K, M)> = self
            .entries
            .drain()
            .map(|(id, entry)| (id, entry.metadata))
            .collect();
        removed.sort_unstable_by_key(|(id, _)| *id);
        removed
    }

    /// Fire every countdown due at `now`, in deadline order.
    ///
    /// Each expired entry is returned exactly once.
    pub fn expire_due(&mut self, now: Millis) -> Vec<(K, M)> {
        let mut expired = Vec::new();
        while let Some((token, id)) = self.timers.pop_due(now) {
            let is_current = matches!(
                self.entries.get(&id),
                Some(TimedEntry { expiry: Expiry::Finite { token: live, .. }, .. }) if *live == token
            );
            if !is_current {
                tracing::debug!(?id, "Stale countdown fired, ignoring");
                continue;
            }
            if let Some(entry) = self.entries.remove(&id) {
                expired.push((id, entry.metadata));
            }
        }
        expired
    }

    fn disarm(&mut self, expiry: Expiry) {
        if let Expiry::Finite { token, .. } = expiry {
            self.timers.cancel(token);
        }
    }
}
