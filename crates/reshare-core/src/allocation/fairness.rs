//! Cross-agent fairness.
//!
//! Verbose agents naturally spend more per turn. Comparing each agent's
//! trailing usage against the least active peer keeps them from crowding
//! terse agents out of the shared pool.

use crate::usage::UsageHistory;

use super::config::AllocationConfig;

/// Fairness multiplier for `agent`, with a reason for the trail.
///
/// - nobody has used anything: `1.0`
/// - this agent is idle while peers are not: the idle encouragement (`0.5`)
/// - otherwise own usage relative to the least active peer, clamped to the
///   configured floor and ceiling, so the agent at the floor gets `1.0` and
///   heavy users are slowed by at most the ceiling
pub fn fairness_multiplier(
    agent: &str,
    history: &UsageHistory,
    config: &AllocationConfig,
) -> (f64, String) {
    let lowest = match history.lowest_positive() {
        Some(lowest) if !history.all_zero() => lowest,
        _ => return (1.0, "Fairness: no usage recorded yet".to_string()),
    };

    let own = history.get(agent);
    if own <= 0.0 {
        return (
            config.idle_encouragement,
            format!("Fairness: {agent} has no recent usage - encouraging activity"),
        );
    }

    // own >= lowest > 0, so the ratio is finite and at least 1
    let ratio = (own / lowest).clamp(config.fairness_floor, config.fairness_ceiling);
    let reason = if ratio <= 1.0 {
        format!("Fairness: {agent} is the least active ({own:.2}) - no adjustment")
    } else {
        format!(
            "Fairness: {agent} used {own:.2} vs lowest {lowest:.2} - slowing {ratio:.2}x"
        )
    };
    (ratio, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(entries: &[(&str, f64)]) -> UsageHistory {
        entries.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_all_zero_is_neutral() {
        let config = AllocationConfig::default();
        let h = UsageHistory::with_agents(["a", "b", "c"]);
        assert_eq!(fairness_multiplier("a", &h, &config).0, 1.0);
        assert_eq!(fairness_multiplier("unknown", &h, &config).0, 1.0);
    }

    #[test]
    fn test_empty_history_is_neutral() {
        let config = AllocationConfig::default();
        assert_eq!(fairness_multiplier("a", &UsageHistory::new(), &config).0, 1.0);
    }

    #[test]
    fn test_idle_agent_among_active_peers() {
        let config = AllocationConfig::default();
        let h = history(&[("a", 0.0), ("b", 3.0)]);
        let (m, reason) = fairness_multiplier("a", &h, &config);
        assert_eq!(m, 0.5);
        assert!(reason.contains("no recent usage"));
    }

    #[test]
    fn test_agent_absent_from_history_counts_as_idle() {
        let config = AllocationConfig::default();
        let h = history(&[("b", 3.0)]);
        assert_eq!(fairness_multiplier("a", &h, &config).0, 0.5);
    }

    #[test]
    fn test_floor_agent_is_unchanged() {
        let config = AllocationConfig::default();
        let h = history(&[("a", 2.0), ("b", 3.0), ("c", 0.0)]);
        let (m, reason) = fairness_multiplier("a", &h, &config);
        assert_eq!(m, 1.0);
        assert!(reason.contains("least active"));
    }

    #[test]
    fn test_heavier_agent_is_slowed() {
        let config = AllocationConfig::default();
        let h = history(&[("a", 2.0), ("b", 3.0)]);
        assert_eq!(fairness_multiplier("b", &h, &config).0, 1.5);
    }

    #[test]
    fn test_slowdown_is_capped() {
        let config = AllocationConfig::default();
        let h = history(&[("a", 1.0), ("b", 10.0)]);
        assert_eq!(fairness_multiplier("b", &h, &config).0, 2.0);
    }

    #[test]
    fn test_extreme_magnitudes_never_diverge() {
        let config = AllocationConfig::default();
        let h = history(&[("a", 1e-300), ("b", 1e300)]);
        let (m, _) = fairness_multiplier("a", &h, &config);
        assert_eq!(m, 1.0);
        let (m, _) = fairness_multiplier("b", &h, &config);
        assert!(m.is_finite());
        assert_eq!(m, 2.0);
    }

    #[test]
    fn test_custom_bounds() {
        let config = AllocationConfig {
            fairness_floor: 0.8,
            fairness_ceiling: 1.25,
            idle_encouragement: 0.75,
            ..AllocationConfig::default()
        };
        let h = history(&[("a", 1.0), ("b", 10.0), ("c", 0.0)]);
        assert_eq!(fairness_multiplier("b", &h, &config).0, 1.25);
        assert_eq!(fairness_multiplier("c", &h, &config).0, 0.75);
    }
}
