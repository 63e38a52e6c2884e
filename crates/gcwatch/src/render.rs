//! Plain-text rendering of statistics trees.

use std::collections::BTreeMap;

use gcwatch_core::fmt::{format_bytes, format_millis};
use gcwatch_core::stats::{CounterDelta, StatisticsTree};

/// Per-collector table followed by the grand totals.
pub fn render_tree(tree: &StatisticsTree) -> String {
    let mut out = String::new();
    for (name, stats) in &tree.collectors {
        out.push_str(&format!(
            "{}: {} collections, {}\n",
            name,
            stats.count,
            format_millis(stats.time)
        ));
        for (pool, p) in &stats.pools {
            out.push_str(&format!(
                "  {:<24} used {:>11}  committed {:>11}  max {:>11}  peak {:>11}  last {:>11}\n",
                pool,
                format_bytes(p.used),
                format_bytes(p.committed),
                format_bytes(p.max),
                format_bytes(p.peak_used),
                format_bytes(p.last_used),
            ));
        }
    }
    let t = &tree.totals;
    out.push_str(&format!(
        "total: {} collections, {}, used {}, committed {}",
        t.count,
        format_millis(t.time),
        format_bytes(t.usage.used),
        format_bytes(t.usage.committed),
    ));
    out
}

/// `"Young: +3 (12ms), Old: +0 (0ms)"`.
pub fn describe_delta(delta: &BTreeMap<String, CounterDelta>) -> String {
    delta
        .iter()
        .map(|(name, d)| format!("{}: +{} ({}ms)", name, d.count, d.time))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcwatch_core::Aggregator;
    use gcwatch_core::telemetry::MockRuntime;

    #[test]
    fn render_tree_lists_collectors_and_totals() {
        let tree = Aggregator::new(MockRuntime::single_young_eden()).snapshot();
        let text = render_tree(&tree);
        assert!(text.starts_with("Young: 5 collections, 0.120s\n"));
        assert!(text.contains("Eden"));
        assert!(text.contains("used      1000 B"));
        assert!(text.ends_with("total: 5 collections, 0.120s, used 1000 B, committed 0 B"));
    }

    #[test]
    fn describe_delta_joins_collectors() {
        let mut delta = BTreeMap::new();
        delta.insert("Old".to_string(), CounterDelta { count: 0, time: 0 });
        delta.insert("Young".to_string(), CounterDelta { count: 3, time: 12 });
        assert_eq!(describe_delta(&delta), "Old: +0 (0ms), Young: +3 (12ms)");
    }
}
