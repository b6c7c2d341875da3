//! Round-trip latency estimation
//!
//! The estimator owns the probe cycle: it sends its own ping requests to the
//! server, measures the round trip of each reply, and keeps a bounded window
//! of samples. Trackers only ever read [`LatencyEstimator::min`], the best
//! available estimate of the network delay already elapsed when a message
//! arrives.
//!
//! ```text
//!   SpawnMe ──► IDLE ──(interval)──► PROBE_SENT ──pong──► IDLE (sample recorded)
//!                                        │
//!                                    (timeout)
//!                                        └──► probe re-sent
//! ```

mod estimator;
mod window;

pub use estimator::{LatencyEstimator, ProbeState};
pub use window::LatencyWindow;
