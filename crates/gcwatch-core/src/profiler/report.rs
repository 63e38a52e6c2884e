//! Text rendering of buffered GC events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::event::GcEvent;

/// Column header, repeated every `ReportConfig::header_interval` rows.
pub const HEADER: &str = "   ID  Type                      Timestamp(sec)    Before(kB)     After(kB)    Delta(kB)        Heap(kB)          GC Time(ms) ";

/// Rows printed between two headers by default.
pub const DEFAULT_HEADER_INTERVAL: usize = 20;

/// Report layout options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of rows between header lines; 0 disables headers.
    pub header_interval: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            header_interval: DEFAULT_HEADER_INTERVAL,
        }
    }
}

/// Event count per collector, in order of first appearance.
pub fn summarize(events: &[GcEvent]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for event in events {
        match counts.iter_mut().find(|(name, _)| *name == event.collector_name) {
            Some((_, n)) => *n += 1,
            None => counts.push((event.collector_name.clone(), 1)),
        }
    }
    counts
}

/// `"3 Young, 1 Old"`.
pub fn summary_line(events: &[GcEvent]) -> String {
    summarize(events)
        .iter()
        .map(|(name, n)| format!("{} {}", n, name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One report row. Memory columns are KiB, rounded toward negative infinity.
pub fn format_row(event: &GcEvent) -> String {
    let mem = event.memory();
    format!(
        "{:5}  {:<20} {:19.4} {:13} {:13} {:12} {:15} {:20.10}",
        event.id,
        event.collector_name,
        event.start_secs(),
        mem.before.div_euclid(1024),
        mem.after.div_euclid(1024),
        (mem.before - mem.after).div_euclid(1024),
        mem.committed.div_euclid(1024),
        event.duration_ms(),
    )
}

/// Full report: summary line, then rows with periodic headers.
pub fn render(events: &[GcEvent], config: &ReportConfig) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(events.len() + 1);
    for (i, event) in events.iter().enumerate() {
        if config.header_interval > 0 && i % config.header_interval == 0 {
            lines.push(HEADER.to_string());
        }
        lines.push(format_row(event));
    }
    format!("GC: {}\n{}", summary_line(events), lines.join("\n"))
}

/// Per-collector event counts as a map, for structured output.
pub fn counts_by_collector(events: &[GcEvent]) -> BTreeMap<String, usize> {
    summarize(events).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64, collector: &str) -> GcEvent {
        let mut e = GcEvent {
            id,
            collector_name: collector.to_string(),
            start_time_nanos: 1_500_000_000,
            duration_nanos: 12_500_000,
            ..Default::default()
        };
        e.used_before.insert("Eden".into(), 2048 * 1024);
        e.used_after.insert("Eden".into(), 512 * 1024);
        e.committed_after.insert("Eden".into(), 4096 * 1024);
        e
    }

    #[test]
    fn test_format_row_columns() {
        let row = format_row(&event(1, "Young"));
        let fields: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(
            fields,
            vec!["1", "Young", "1.5000", "2048", "512", "1536", "4096", "12.5000000000"]
        );
    }

    #[test]
    fn test_format_row_floors_negative_delta() {
        let mut e = event(2, "Young");
        e.used_before.insert("Eden".into(), 0);
        e.used_after.insert("Eden".into(), 1536);
        let row = format_row(&e);
        let fields: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(&fields[3..6], &["0", "1", "-2"]);
    }

    #[test]
    fn test_format_row_pads_collector_name() {
        let row = format_row(&event(7, "Old"));
        assert!(row.starts_with("    7  Old "));
        assert_eq!(row[7..27].trim_end(), "Old");
    }

    #[test]
    fn test_summary_preserves_first_appearance() {
        let events = vec![
            event(1, "Young"),
            event(1, "Old"),
            event(2, "Young"),
            event(3, "Young"),
        ];
        assert_eq!(summary_line(&events), "3 Young, 1 Old");
        assert_eq!(counts_by_collector(&events)["Old"], 1);
    }

    #[test]
    fn test_header_repeats_every_interval() {
        let events: Vec<GcEvent> = (1..=41).map(|i| event(i, "Young")).collect();
        let report = render(&events, &ReportConfig::default());
        let headers = report.lines().filter(|l| *l == HEADER).count();
        assert_eq!(headers, 3);
        assert_eq!(report.lines().count(), 1 + 3 + 41);
        assert_eq!(report.lines().nth(1), Some(HEADER));
    }

    #[test]
    fn test_header_interval_zero_disables_headers() {
        let events = vec![event(1, "Young")];
        let report = render(&events, &ReportConfig { header_interval: 0 });
        assert!(!report.contains("Timestamp(sec)"));
        assert_eq!(report.lines().count(), 2);
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(render(&[], &ReportConfig::default()), "GC: \n");
    }
}
