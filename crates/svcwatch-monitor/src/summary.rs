//! Per-service heartbeat summaries for status reporting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use svcwatch_protocols::Heartbeat;

use crate::engine::median_interval_secs;

/// Only heartbeats this recent are summarised.
pub const STATUS_WINDOW_DAYS: i64 = 7;

/// What the heartbeat history says about one service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartbeatSummary {
    pub last_heartbeat: DateTime<Utc>,
    pub time_since_last_heartbeat_seconds: f64,
    /// Median gap in seconds, once two heartbeats exist.
    pub median_interval: Option<f64>,
    pub heartbeat_count: usize,
}

/// Group heartbeats by service and summarise each group as of `now`.
pub fn summarize_heartbeats(
    heartbeats: &[Heartbeat],
    now: DateTime<Utc>,
) -> BTreeMap<String, HeartbeatSummary> {
    let mut grouped: BTreeMap<&str, Vec<DateTime<Utc>>> = BTreeMap::new();
    for hb in heartbeats {
        grouped
            .entry(hb.service_key.as_str())
            .or_default()
            .push(hb.timestamp);
    }

    grouped
        .into_iter()
        .filter_map(|(key, mut stamps)| {
            stamps.sort_by(|a, b| b.cmp(a));
            let last = *stamps.first()?;
            let summary = HeartbeatSummary {
                last_heartbeat: last,
                time_since_last_heartbeat_seconds: (now - last).num_milliseconds() as f64 / 1000.0,
                median_interval: median_interval_secs(&stamps),
                heartbeat_count: stamps.len(),
            };
            Some((key.to_string(), summary))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_summarize_groups_by_service() {
        let now = Utc::now();
        let heartbeats = vec![
            Heartbeat::new("api", now - Duration::seconds(30)),
            Heartbeat::new("job", now - Duration::seconds(90)),
            Heartbeat::new("api", now - Duration::seconds(90)),
            Heartbeat::new("api", now - Duration::seconds(150)),
        ];

        let summaries = summarize_heartbeats(&heartbeats, now);
        assert_eq!(summaries.len(), 2);

        let api = &summaries["api"];
        assert_eq!(api.heartbeat_count, 3);
        assert_eq!(api.median_interval, Some(60.0));
        assert_eq!(api.time_since_last_heartbeat_seconds, 30.0);

        let job = &summaries["job"];
        assert_eq!(job.heartbeat_count, 1);
        assert_eq!(job.median_interval, None);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize_heartbeats(&[], Utc::now()).is_empty());
    }
}
