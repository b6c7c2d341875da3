//! Tests for the abnormality tracker
//!
//! Covers suppression, overrides, begin/refresh reconciliation and the
//! interplay between predictions and authoritative messages.

use foresight_types::SuppressionRule;

use super::tracker::{AbnormalityKind, AbnormalityTracker, Reconciled};
use super::SuppressionTable;
use crate::latency::LatencyEstimator;
use crate::protocol::{
    AbnormalityEnd, AbnormalityUpdate, ClientMessage, GameId, Outbound, Outbox, Verdict,
};
use crate::session::PlayerSession;
use crate::tracking::{AddOutcome, EntryDuration, PERMANENT_DURATION};

const ME: GameId = 0x1000;
const SOMEONE_ELSE: GameId = 0x2000;

fn make_player() -> PlayerSession {
    let mut player = PlayerSession::new();
    player.on_login(ME, 10_101);
    player
}

fn make_latency(min_rtt: Option<u32>) -> LatencyEstimator {
    let mut latency = LatencyEstimator::default();
    if let Some(rtt) = min_rtt {
        latency.record_sample(rtt);
    }
    latency
}

fn make_tracker(rules: Vec<SuppressionRule>) -> AbnormalityTracker {
    AbnormalityTracker::new(SuppressionTable::from_rules(rules))
}

fn update(id: u32, duration: i64, stacks: u32) -> AbnormalityUpdate {
    AbnormalityUpdate {
        target: ME,
        source: ME,
        id,
        duration,
        stacks,
    }
}

fn end_msg(id: u32) -> Outbound {
    Outbound::Client(ClientMessage::AbnormalityEnd(AbnormalityEnd { target: ME, id }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authoritative begin / refresh
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_begin_is_compensated_and_forwarded() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(Some(80));
    let mut outbox = Outbox::new();

    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(100, 5_000, 1),
        &player,
        &latency,
        1_000,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Began);
    assert_eq!(
        result.verdict,
        Verdict::Rewrite(ClientMessage::AbnormalityBegin(update(100, 4_920, 1)))
    );
    assert!(outbox.is_empty(), "matching message type needs no synthetic message");
    assert_eq!(tracker.remaining(100, 1_000), Some(EntryDuration::Finite(4_920)));
    assert_eq!(tracker.stacks(100), Some(1));
}

#[test]
fn test_refresh_of_tracked_abnormality_is_forwarded() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.reconcile(AbnormalityKind::Begin, &update(100, 5_000, 1), &player, &latency, 0, &mut outbox);
    let result = tracker.reconcile(
        AbnormalityKind::Refresh,
        &update(100, 5_000, 2),
        &player,
        &latency,
        2_000,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Refreshed);
    assert!(matches!(result.verdict, Verdict::Rewrite(ClientMessage::AbnormalityRefresh(_))));
    assert_eq!(tracker.stacks(100), Some(2));
    assert_eq!(tracker.live_timers(), 1);
    assert_eq!(tracker.remaining(100, 2_000), Some(EntryDuration::Finite(5_000)));
}

#[test]
fn test_begin_for_tracked_abnormality_becomes_refresh() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.reconcile(AbnormalityKind::Begin, &update(100, 5_000, 1), &player, &latency, 0, &mut outbox);
    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(100, 3_000, 1),
        &player,
        &latency,
        100,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Refreshed);
    assert_eq!(result.verdict, Verdict::Block);
    assert_eq!(
        outbox.take(),
        vec![Outbound::Client(ClientMessage::AbnormalityRefresh(update(100, 3_000, 1)))]
    );
    assert_eq!(tracker.live_timers(), 1);
}

#[test]
fn test_refresh_for_untracked_abnormality_becomes_begin() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(Some(20));
    let mut outbox = Outbox::new();

    let result = tracker.reconcile(
        AbnormalityKind::Refresh,
        &update(7, 1_000, 3),
        &player,
        &latency,
        0,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Began);
    assert_eq!(result.verdict, Verdict::Block);
    assert_eq!(
        outbox.take(),
        vec![Outbound::Client(ClientMessage::AbnormalityBegin(update(7, 980, 3)))]
    );
    assert!(tracker.exists(7));
}

#[test]
fn test_permanent_duration_is_not_compensated() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(Some(80));
    let mut outbox = Outbox::new();

    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(9, PERMANENT_DURATION, 1),
        &player,
        &latency,
        0,
        &mut outbox,
    );

    assert_eq!(
        result.verdict,
        Verdict::Rewrite(ClientMessage::AbnormalityBegin(update(9, PERMANENT_DURATION, 1)))
    );
    assert_eq!(tracker.live_timers(), 0);
    assert_eq!(tracker.expire_due(u64::MAX / 2, &player, &mut outbox), 0);
    assert!(tracker.exists(9));
}

#[test]
fn test_short_duration_floors_at_zero() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(Some(200));
    let mut outbox = Outbox::new();

    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(3, 150, 1),
        &player,
        &latency,
        500,
        &mut outbox,
    );
    assert_eq!(
        result.verdict,
        Verdict::Rewrite(ClientMessage::AbnormalityBegin(update(3, 0, 1)))
    );
    assert_eq!(tracker.expire_due(500, &player, &mut outbox), 1);
    assert_eq!(outbox.take(), vec![end_msg(3)]);
}

#[test]
fn test_other_targets_pass_through_untouched() {
    let mut tracker = make_tracker(vec![SuppressionRule::blocked(100)]);
    let player = make_player();
    let latency = make_latency(Some(50));
    let mut outbox = Outbox::new();

    let mut foreign = update(100, 5_000, 1);
    foreign.target = SOMEONE_ELSE;

    let result = tracker.reconcile(AbnormalityKind::Begin, &foreign, &player, &latency, 0, &mut outbox);
    assert_eq!(result.outcome, Reconciled::NotLocal);
    assert_eq!(result.verdict, Verdict::Pass);
    assert!(tracker.is_empty());

    let result = tracker.reconcile_end(&AbnormalityEnd { target: SOMEONE_ELSE, id: 100 }, &player, 0);
    assert_eq!(result.verdict, Verdict::Pass);
}

// ─────────────────────────────────────────────────────────────────────────────
// Suppression and overrides
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_blocked_abnormality_is_suppressed() {
    let mut tracker = make_tracker(vec![SuppressionRule::blocked(666)]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(666, 5_000, 1),
        &player,
        &latency,
        0,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Suppressed);
    assert_eq!(result.verdict, Verdict::Block);
    assert!(!tracker.exists(666));
    assert!(outbox.is_empty());

    let result = tracker.reconcile_end(&AbnormalityEnd { target: ME, id: 666 }, &player, 10);
    assert_eq!(result.outcome, Reconciled::Suppressed);
    assert_eq!(result.verdict, Verdict::Block);
}

#[test]
fn test_override_removes_target_first() {
    let mut tracker = make_tracker(vec![SuppressionRule::overriding(200, 100)]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.reconcile(AbnormalityKind::Begin, &update(100, 10_000, 1), &player, &latency, 0, &mut outbox);
    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(200, 10_000, 1),
        &player,
        &latency,
        100,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Began);
    assert!(!tracker.exists(100));
    assert!(tracker.exists(200));
    assert_eq!(outbox.take(), vec![end_msg(100)]);
    assert_eq!(tracker.live_timers(), 1);
}

#[test]
fn test_override_with_absent_target_is_plain_begin() {
    let mut tracker = make_tracker(vec![SuppressionRule::overriding(200, 100)]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(200, 1_000, 1),
        &player,
        &latency,
        0,
        &mut outbox,
    );
    assert_eq!(result.outcome, Reconciled::Began);
    assert!(outbox.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Authoritative end
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_end_of_tracked_abnormality_passes() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.reconcile(AbnormalityKind::Begin, &update(5, 1_000, 1), &player, &latency, 0, &mut outbox);
    let result = tracker.reconcile_end(&AbnormalityEnd { target: ME, id: 5 }, &player, 200);

    assert_eq!(result.outcome, Reconciled::Ended);
    assert_eq!(result.verdict, Verdict::Pass);
    assert!(!tracker.exists(5));
    assert_eq!(tracker.live_timers(), 0);
    assert_eq!(tracker.expire_due(5_000, &player, &mut outbox), 0, "no late expiry");
    assert!(outbox.is_empty(), "the forwarded end is enough");
}

#[test]
fn test_end_of_untracked_abnormality_is_blocked() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();

    let result = tracker.reconcile_end(&AbnormalityEnd { target: ME, id: 5 }, &player, 0);
    assert_eq!(result.outcome, Reconciled::Untracked);
    assert_eq!(result.verdict, Verdict::Block);
}

// ─────────────────────────────────────────────────────────────────────────────
// Prediction
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_prediction_expires_after_compensated_duration() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(Some(120));
    let mut outbox = Outbox::new();

    let outcome = tracker.predict(
        42,
        EntryDuration::Finite(3_000),
        1,
        &player,
        &latency,
        10_000,
        &mut outbox,
    );
    assert_eq!(outcome, AddOutcome::Began);
    assert_eq!(
        outbox.take(),
        vec![Outbound::Client(ClientMessage::AbnormalityBegin(update(42, 2_880, 1)))]
    );

    assert_eq!(tracker.expire_due(12_879, &player, &mut outbox), 0);
    assert!(tracker.exists(42));
    assert_eq!(tracker.expire_due(12_880, &player, &mut outbox), 1);
    assert!(!tracker.exists(42));
    assert_eq!(outbox.take(), vec![end_msg(42)]);
}

#[test]
fn test_authoritative_begin_after_prediction_is_a_refresh() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(Some(60));
    let mut outbox = Outbox::new();

    tracker.predict(42, EntryDuration::Finite(3_000), 1, &player, &latency, 0, &mut outbox);
    outbox.take();

    let result = tracker.reconcile(
        AbnormalityKind::Begin,
        &update(42, 3_000, 1),
        &player,
        &latency,
        90,
        &mut outbox,
    );

    assert_eq!(result.outcome, Reconciled::Refreshed);
    assert_eq!(result.verdict, Verdict::Block);
    assert_eq!(
        outbox.take(),
        vec![Outbound::Client(ClientMessage::AbnormalityRefresh(update(42, 2_940, 1)))]
    );
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.live_timers(), 1);
}

#[test]
fn test_second_prediction_is_a_refresh() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.predict(1, EntryDuration::Finite(1_000), 1, &player, &latency, 0, &mut outbox);
    let outcome = tracker.predict(1, EntryDuration::Permanent, 2, &player, &latency, 10, &mut outbox);

    assert_eq!(outcome, AddOutcome::Refreshed);
    assert_eq!(
        outbox.take()[1],
        Outbound::Client(ClientMessage::AbnormalityRefresh(update(1, PERMANENT_DURATION, 2)))
    );
    assert_eq!(tracker.live_timers(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Bulk removal
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_remove_all_notifies_and_leaves_no_timers() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.reconcile(AbnormalityKind::Begin, &update(3, 1_000, 1), &player, &latency, 0, &mut outbox);
    tracker.reconcile(AbnormalityKind::Begin, &update(1, 2_000, 1), &player, &latency, 0, &mut outbox);
    tracker.reconcile(
        AbnormalityKind::Begin,
        &update(2, PERMANENT_DURATION, 1),
        &player,
        &latency,
        0,
        &mut outbox,
    );

    assert_eq!(tracker.remove_all(&player, 500, &mut outbox), 3);
    assert!(tracker.is_empty());
    assert_eq!(tracker.live_timers(), 0);
    assert_eq!(outbox.take(), vec![end_msg(1), end_msg(2), end_msg(3)]);

    assert_eq!(tracker.expire_due(u64::MAX / 2, &player, &mut outbox), 0);
    assert!(outbox.is_empty());
}

#[test]
fn test_remove_is_noop_for_unknown_id() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let mut outbox = Outbox::new();

    assert!(!tracker.remove(77, &player, 0, &mut outbox));
    assert!(outbox.is_empty());
}

#[test]
fn test_any_in_set() {
    let mut tracker = make_tracker(vec![]);
    let player = make_player();
    let latency = make_latency(None);
    let mut outbox = Outbox::new();

    tracker.reconcile(AbnormalityKind::Begin, &update(10, 1_000, 1), &player, &latency, 0, &mut outbox);

    assert!(tracker.any_in(&[5, 10].into_iter().collect()));
    assert!(!tracker.any_in(&[5, 11].into_iter().collect()));
}
