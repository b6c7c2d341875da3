use foresight_types::PingSettings;
use foresight_types::formatting::format_ping_summary;

use crate::protocol::{ClientMessage, Outbox, ServerMessage};
use crate::timers::{Millis, TimerQueue, TimerToken};

use super::LatencyWindow;

/// Where the probe cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// No probe in flight
    Idle,
    /// A probe was sent and its reply has not arrived yet
    ProbeSent { sent_at: Millis },
}

/// What the pending probe timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeTimer {
    /// Regular cadence: time for the next probe
    Next,
    /// The in-flight probe went unanswered; send it again
    Retry,
}

/// Measures round-trip latency with its own probe cycle.
#[derive(Debug, Clone)]
pub struct LatencyEstimator {
    window: LatencyWindow,
    interval_ms: u64,
    timeout_ms: u64,

    state: ProbeState,
    /// Send time of the latest probe, kept after the reply so a late
    /// duplicate reply can still be measured against it
    last_sent: Option<Millis>,
    probing: bool,

    timers: TimerQueue<ProbeTimer>,
    pending: Option<TimerToken>,

    /// Set once the ping summary has been shown for the current cycle
    stats_shown: bool,
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::new(PingSettings::default())
    }
}

impl LatencyEstimator {
    pub fn new(settings: PingSettings) -> Self {
        Self {
            window: LatencyWindow::new(settings.max_history),
            interval_ms: settings.interval_ms.max(1),
            timeout_ms: settings.timeout_ms.max(1),
            state: ProbeState::Idle,
            last_sent: None,
            probing: false,
            timers: TimerQueue::new(),
            pending: None,
            stats_shown: false,
        }
    }

    // ─── Read-only state for trackers and diagnostics ───────────────────────

    /// Smallest round trip in the window; 0 until the first sample.
    pub fn min(&self) -> u32 {
        self.window.min()
    }

    pub fn max(&self) -> u32 {
        self.window.max()
    }

    pub fn avg(&self) -> f64 {
        self.window.avg()
    }

    pub fn jitter(&self) -> u32 {
        self.window.jitter()
    }

    pub fn count(&self) -> usize {
        self.window.count()
    }

    pub fn window(&self) -> &LatencyWindow {
        &self.window
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn is_probing(&self) -> bool {
        self.probing
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    /// One-line statistics for the `ping` command.
    pub fn summary(&self) -> String {
        format_ping_summary(self.avg(), self.min(), self.max(), self.count())
    }

    // ─── Probe cycle ────────────────────────────────────────────────────────

    /// Begin probing: the first probe goes out one interval from now.
    pub fn start_probing(&mut self, now: Millis) {
        self.probing = true;
        self.arm(now + self.interval_ms, ProbeTimer::Next);
        tracing::trace!(first_probe_in = self.interval_ms, "Latency probing started");
    }

    /// Halt probing and cancel any pending probe timer.
    pub fn stop_probing(&mut self) {
        self.probing = false;
        self.disarm();
        tracing::trace!("Latency probing stopped");
    }

    /// Send a probe to the server and arm the retry timer.
    pub fn send_probe(&mut self, now: Millis, outbox: &mut Outbox) {
        outbox.to_server(ServerMessage::RequestGamestatPing);
        self.state = ProbeState::ProbeSent { sent_at: now };
        self.last_sent = Some(now);
        self.arm(now + self.timeout_ms, ProbeTimer::Retry);
    }

    /// Handle a probe reply. Returns the measured round trip, or `None` if no
    /// probe was ever sent this session.
    ///
    /// A reply that arrives while no probe is in flight is a duplicate or late
    /// answer to a probe that was already retried. The previous sample was
    /// then measured against the wrong send, so it is replaced instead of a
    /// new sample being added.
    pub fn on_response(&mut self, now: Millis) -> Option<u32> {
        let sent_at = self.last_sent?;
        let rtt = u32::try_from(now.saturating_sub(sent_at)).unwrap_or(u32::MAX);

        self.disarm();
        self.stats_shown = false;

        match self.state {
            ProbeState::ProbeSent { .. } => {
                self.record_sample(rtt);
                tracing::trace!(rtt, min = self.min(), samples = self.count(), "Probe reply");
            }
            ProbeState::Idle => {
                let replaced = self.window.correct_last(rtt);
                tracing::trace!(rtt, ?replaced, "Unexpected probe reply, corrected last sample");
            }
        }
        self.state = ProbeState::Idle;

        if self.probing {
            // Keep the wall-clock cadence close to one probe per interval
            let delay = self.interval_ms.saturating_sub(u64::from(rtt)).max(1);
            self.arm(now + delay, ProbeTimer::Next);
        }
        Some(rtt)
    }

    /// Commit a round-trip sample to the window.
    pub fn record_sample(&mut self, rtt: u32) {
        self.window.record(rtt);
    }

    /// Answer the game client's own probe locally so only this estimator
    /// probes the server.
    ///
    /// Returns true once per reply cycle, when the ping summary should be
    /// shown to the user.
    pub fn intercept_client_probe(&mut self, outbox: &mut Outbox) -> bool {
        outbox.to_client(ClientMessage::ResponseGamestatPong);
        if self.stats_shown {
            return false;
        }
        self.stats_shown = true;
        true
    }

    /// Fire every probe timer due at `now`.
    pub fn fire_due(&mut self, now: Millis, outbox: &mut Outbox) {
        while let Some((token, timer)) = self.timers.pop_due(now) {
            if self.pending == Some(token) {
                self.pending = None;
            }
            if timer == ProbeTimer::Retry {
                tracing::trace!(timeout = self.timeout_ms, "Probe unanswered, retrying");
            }
            self.send_probe(now, outbox);
        }
    }

    fn arm(&mut self, deadline: Millis, timer: ProbeTimer) {
        self.disarm();
        self.pending = Some(self.timers.schedule(deadline, timer));
    }

    fn disarm(&mut self) {
        if let Some(token) = self.pending.take() {
            self.timers.cancel(token);
        }
    }
}
