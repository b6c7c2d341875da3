//! Generic timed-entry tracking
//!
//! [`TimedTracker`] is the shared engine behind the abnormality and cooldown
//! trackers: a set of identifier-keyed entries, each either counting down to
//! an expiry or permanent. Re-adding an identifier refreshes it in place;
//! there is never more than one live countdown per identifier.

mod duration;
mod tracker;

pub use duration::{EntryDuration, PERMANENT_DURATION};
pub use tracker::{AddOutcome, Expiry, TimedEntry, TimedTracker};
