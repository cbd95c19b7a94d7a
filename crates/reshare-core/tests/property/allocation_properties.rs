use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use reshare_core::allocation::{fairness_multiplier, window_pace};
use reshare_core::{
    AgentIdentity, AllocationConfig, AllocationEngine, QuotaSnapshot, QuotaWindow, UsageHistory,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap()
}

fn reset_text(offset_minutes: Option<i64>) -> Option<String> {
    offset_minutes.map(|m| (now() + Duration::minutes(m)).to_rfc3339())
}

fn snapshot(
    session: u8,
    week: u8,
    session_reset: Option<i64>,
    week_reset: Option<i64>,
) -> QuotaSnapshot {
    QuotaSnapshot {
        session_percent_used: session,
        week_percent_used: week,
        week_sonnet_percent_used: None,
        session_reset: reset_text(session_reset),
        week_reset: reset_text(week_reset),
        observed_at: now(),
    }
}

fn history(own: f64, peers: &[f64]) -> UsageHistory {
    let mut history = UsageHistory::new();
    history.set("me", own);
    for (i, usage) in peers.iter().enumerate() {
        history.set(format!("peer-{i}"), *usage);
    }
    history
}

fn usage() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.0),
        0.0f64..1_000.0,
        Just(f64::NAN),
        Just(-5.0),
        Just(f64::INFINITY),
    ]
}

proptest! {
    #[test]
    fn interval_always_within_bounds(
        current in proptest::option::of(any::<u32>()),
        session in any::<u8>(),
        week in any::<u8>(),
        session_reset in proptest::option::of(-600i64..20_000),
        week_reset in proptest::option::of(-600i64..20_000),
        pref in 0u8..=100,
        own in usage(),
        peers in proptest::collection::vec(usage(), 0..5),
        has_snapshot in any::<bool>(),
        has_identity in any::<bool>(),
    ) {
        let engine = AllocationEngine::default();
        let snap = snapshot(session, week, session_reset, week_reset);
        let identity = AgentIdentity::new("me", 3.0, pref).unwrap();
        let rec = engine.recommend(
            "me",
            current,
            has_snapshot.then_some(&snap),
            has_identity.then_some(&identity),
            &history(own, &peers),
            now(),
        );
        prop_assert!(rec.interval_seconds >= 900);
        prop_assert!(rec.interval_seconds <= 7200);
        prop_assert!(rec.multipliers.combined.is_finite());
    }

    #[test]
    fn identical_inputs_give_identical_output(
        current in 0u32..20_000,
        session in 0u8..=100,
        week in 0u8..=100,
        session_reset in proptest::option::of(-600i64..20_000),
        pref in 0u8..=100,
        own in 0.0f64..100.0,
        peers in proptest::collection::vec(0.0f64..100.0, 0..5),
    ) {
        let engine = AllocationEngine::default();
        let snap = snapshot(session, week, session_reset, Some(3 * 24 * 60));
        let identity = AgentIdentity::new("me", 3.0, pref).unwrap();
        let usage = history(own, &peers);
        let first = engine.recommend("me", Some(current), Some(&snap), Some(&identity), &usage, now());
        let second = engine.recommend("me", Some(current), Some(&snap), Some(&identity), &usage, now());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn interval_never_shrinks_as_usage_grows(
        a in 0u8..=100,
        b in 0u8..=100,
        reset_minutes in 1i64..300,
        pref in 0u8..=100,
        current in 900u32..7200,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let engine = AllocationEngine::default();
        let identity = AgentIdentity::new("me", 3.0, pref).unwrap();
        let usage = history(0.0, &[]);
        let at_low = engine.recommend(
            "me", Some(current),
            Some(&snapshot(low, 50, Some(reset_minutes), Some(3 * 24 * 60))),
            Some(&identity), &usage, now(),
        );
        let at_high = engine.recommend(
            "me", Some(current),
            Some(&snapshot(high, 50, Some(reset_minutes), Some(3 * 24 * 60))),
            Some(&identity), &usage, now(),
        );
        prop_assert!(at_low.interval_seconds <= at_high.interval_seconds);
    }

    #[test]
    fn interval_never_shrinks_as_weekly_usage_grows(
        a in 0u8..=100,
        b in 0u8..=100,
        week_reset_minutes in 1i64..(7 * 24 * 60),
        pref in 0u8..=100,
        current in 900u32..7200,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let engine = AllocationEngine::default();
        let identity = AgentIdentity::new("me", 3.0, pref).unwrap();
        let usage = history(0.0, &[]);
        let at_low = engine.recommend(
            "me", Some(current),
            Some(&snapshot(40, low, Some(150), Some(week_reset_minutes))),
            Some(&identity), &usage, now(),
        );
        let at_high = engine.recommend(
            "me", Some(current),
            Some(&snapshot(40, high, Some(150), Some(week_reset_minutes))),
            Some(&identity), &usage, now(),
        );
        prop_assert!(at_low.multipliers.week <= at_high.multipliers.week);
        prop_assert!(at_low.interval_seconds <= at_high.interval_seconds);
    }

    #[test]
    fn pace_never_drops_as_usage_grows_in_either_window(
        a in 0u8..=100,
        b in 0u8..=100,
        reset_minutes in 1i64..(7 * 24 * 60),
        pref in 0u8..=100,
        weekly in any::<bool>(),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let window = if weekly { QuotaWindow::Week } else { QuotaWindow::Session };
        let config = AllocationConfig::default();
        let reset = reset_text(Some(reset_minutes));
        let at_low = window_pace(window, low, reset.as_deref(), pref, now(), &config);
        let at_high = window_pace(window, high, reset.as_deref(), pref, now(), &config);
        prop_assert!(at_low.multiplier <= at_high.multiplier);
    }

    #[test]
    fn least_active_agent_is_not_slowed(
        peers in proptest::collection::vec(0.01f64..1_000.0, 1..6),
    ) {
        let lowest = peers.iter().copied().fold(f64::INFINITY, f64::min);
        let (multiplier, _) = fairness_multiplier("me", &history(lowest, &peers), &AllocationConfig::default());
        prop_assert_eq!(multiplier, 1.0);
    }

    #[test]
    fn fairness_stays_between_floor_and_ceiling(
        own in 0.0f64..1_000.0,
        peers in proptest::collection::vec(0.0f64..1_000.0, 0..6),
    ) {
        let (multiplier, _) = fairness_multiplier("me", &history(own, &peers), &AllocationConfig::default());
        prop_assert!((0.5..=2.0).contains(&multiplier));
    }

    #[test]
    fn all_zero_usage_is_neutral(agents in 1usize..8) {
        let (multiplier, _) = fairness_multiplier(
            "me",
            &history(0.0, &vec![0.0; agents]),
            &AllocationConfig::default(),
        );
        prop_assert_eq!(multiplier, 1.0);
    }

    #[test]
    fn idle_agent_among_active_peers_is_encouraged(
        peers in proptest::collection::vec(0.01f64..1_000.0, 1..6),
    ) {
        let (multiplier, _) = fairness_multiplier("me", &history(0.0, &peers), &AllocationConfig::default());
        prop_assert_eq!(multiplier, 0.5);
    }

    #[test]
    fn window_not_yet_started_is_neutral(
        percent in 0u8..=100,
        pref in 0u8..=100,
        extra_minutes in 0i64..10_000,
    ) {
        let reset = now() + Duration::hours(5) + Duration::minutes(extra_minutes);
        let pace = window_pace(
            QuotaWindow::Session,
            percent,
            Some(&reset.to_rfc3339()),
            pref,
            now(),
            &AllocationConfig::default(),
        );
        prop_assert_eq!(pace.multiplier, 1.0);
    }

    #[test]
    fn past_reset_is_neutral_and_flagged(
        percent in 0u8..=100,
        pref in 0u8..=100,
        minutes_ago in 1i64..100_000,
        window in prop_oneof![Just(QuotaWindow::Session), Just(QuotaWindow::Week)],
    ) {
        let reset = now() - Duration::minutes(minutes_ago);
        let pace = window_pace(
            window,
            percent,
            Some(&reset.to_rfc3339()),
            pref,
            now(),
            &AllocationConfig::default(),
        );
        prop_assert_eq!(pace.multiplier, 1.0);
        prop_assert!(pace.reason.contains("reset time has passed"));
    }
}
