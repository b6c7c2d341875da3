//! Tokio session driver
//!
//! Feeds intercepted messages into a [`SessionContext`] and wakes it when its
//! next timer is due. Session time is milliseconds since the driver started,
//! offset by whatever time the context had already reached.

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::context::{Notice, SessionContext};
use crate::protocol::{Inbound, Outbound, Verdict};
use crate::timers::Millis;

/// Something the transport has to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Forward the original message unchanged
    Forward(Inbound),
    /// Send a replacement or synthetic message
    Send(Outbound),
    /// Show a line of text to the user
    Notice(Notice),
}

/// Maps tokio instants onto session milliseconds.
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    epoch: Instant,
    base: Millis,
}

impl SessionClock {
    fn start(base: Millis) -> Self {
        Self {
            epoch: Instant::now(),
            base,
        }
    }

    fn now(&self) -> Millis {
        let elapsed = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.base.saturating_add(elapsed)
    }

    fn instant_of(&self, at: Millis) -> Instant {
        self.epoch + Duration::from_millis(at.saturating_sub(self.base))
    }
}

/// Drive `context` until `inbound` closes or nobody listens on `outbound`.
///
/// Returns the number of inbound messages handled.
pub async fn run_session(
    context: &mut SessionContext,
    mut inbound: mpsc::Receiver<Inbound>,
    outbound: mpsc::UnboundedSender<Delivery>,
) -> usize {
    let clock = SessionClock::start(context.now());
    let mut handled = 0;
    tracing::info!(base = context.now(), "Session driver started");

    loop {
        let next = context.next_deadline();

        tokio::select! {
            message = inbound.recv() => {
                let Some(message) = message else {
                    break;
                };
                handled += 1;
                let verdict = context.handle(&message, clock.now());
                // Synthetic messages queued by the handler go out ahead of the original
                if !flush(context, &outbound) {
                    break;
                }
                let delivery = match verdict {
                    Verdict::Pass => Delivery::Forward(message),
                    Verdict::Rewrite(replacement) => Delivery::Send(Outbound::Client(replacement)),
                    Verdict::Block => continue,
                };
                if outbound.send(delivery).is_err() {
                    break;
                }
            }
            () = sleep_until_due(next.map(|at| clock.instant_of(at))) => {
                // Fire at least up to the deadline we slept for
                let now = clock.now().max(next.unwrap_or_default());
                context.advance(now);
                if !flush(context, &outbound) {
                    break;
                }
            }
        }
    }

    tracing::info!(handled, "Session driver stopped");
    handled
}

/// Hand every pending synthetic message and notice to the transport.
/// Returns false once the receiving side is gone.
fn flush(context: &mut SessionContext, outbound: &mpsc::UnboundedSender<Delivery>) -> bool {
    let messages = context.take_outbound().into_iter().map(Delivery::Send);
    let notices = context.take_notices().into_iter().map(Delivery::Notice);
    for delivery in messages.chain(notices) {
        if outbound.send(delivery).is_err() {
            tracing::warn!("Outbound channel closed, stopping session driver");
            return false;
        }
    }
    true
}

async fn sleep_until_due(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
