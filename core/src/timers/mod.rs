//! Cancellable deadline queue
//!
//! Every countdown in the engine is an entry in a [`TimerQueue`]. Scheduling
//! returns a [`TimerToken`]; cancelling with that token removes the timer
//! outright, so a cancelled timer can never fire, even when its deadline has
//! already passed and nobody has polled the queue yet.
//!
//! The queue never reads a clock. Callers pass `now` to [`TimerQueue::pop_due`]
//! and receive due timers in deadline order (FIFO among equal deadlines).

use std::collections::BTreeMap;

use hashbrown::HashMap;

/// Milliseconds on the session clock.
pub type Millis = u64;

/// Handle to one scheduled timer. Tokens are never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

#[derive(Debug, Clone)]
pub struct TimerQueue<K> {
    /// Ordered by (deadline, token); the token's sequence breaks ties FIFO
    pending: BTreeMap<(Millis, TimerToken), K>,
    /// Token -> deadline, so cancellation does not need a scan
    deadlines: HashMap<TimerToken, Millis>,
    next_seq: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            deadlines: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Arm a timer that becomes due at `deadline`.
    pub fn schedule(&mut self, deadline: Millis, key: K) -> TimerToken {
        let token = TimerToken(self.next_seq);
        self.next_seq += 1;
        self.pending.insert((deadline, token), key);
        self.deadlines.insert(token, deadline);
        token
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        match self.deadlines.remove(&token) {
            Some(deadline) => self.pending.remove(&(deadline, token)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.deadlines.contains_key(&token)
    }

    /// Earliest deadline still armed.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerToken, K)> {
        let (&(deadline, token), _) = self.pending.first_key_value()?;
        if deadline > now {
            return None;
        }
        let key = self.pending.remove(&(deadline, token))?;
        self.deadlines.remove(&token);
        Some((token, key))
    }

    /// Cancel every armed timer.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
