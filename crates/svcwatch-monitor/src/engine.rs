//! Status inference.
//!
//! Two strategies, picked by whether the service has an `expected_period`:
//!
//! - **Config threshold**: compare the time since the last heartbeat (or since
//!   registration, if none arrived) against `2 × expected_period` (down) and
//!   `dead_after` (dead).
//! - **Heartbeat statistics**: learn the cadence from the median gap between
//!   recent heartbeats and compare the silence since the latest one against
//!   `2 × median` (down) and 7 days (dead).

use chrono::{DateTime, Utc};
use serde::Serialize;

use svcwatch_protocols::{Heartbeat, Service, ServiceStatus, DEAD_CEILING_SECS};

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

/// Silence beyond this multiple of the expected cadence means down.
pub const GRACE_FACTOR: f64 = 2.0;

/// Heartbeats needed before the statistics strategy trusts a median.
pub const MIN_SAMPLES: usize = 4;

/// Which rule set produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStrategy {
    ConfigThreshold,
    HeartbeatStatistics,
}

impl InferenceStrategy {
    /// Configured services use thresholds; everything else is learned.
    pub fn for_service(service: &Service) -> Self {
        if service.expected_period.is_some() {
            InferenceStrategy::ConfigThreshold
        } else {
            InferenceStrategy::HeartbeatStatistics
        }
    }
}

/// Result of one inference, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub status: ServiceStatus,
    pub strategy: InferenceStrategy,
    /// Heartbeats considered.
    pub sample_size: usize,
    /// Median gap in seconds, when at least two heartbeats were considered.
    pub median_interval: Option<f64>,
    /// Statistics mode with 1..=3 recent samples: too early to judge.
    pub warming_up: bool,
}

/// Pure status classifier.
#[derive(Debug, Clone)]
pub struct StatusEngine {
    heartbeat_window: usize,
}

impl Default for StatusEngine {
    fn default() -> Self {
        Self::new(100)
    }
}

impl StatusEngine {
    pub fn new(heartbeat_window: usize) -> Self {
        Self {
            heartbeat_window: heartbeat_window.max(MIN_SAMPLES),
        }
    }

    /// How many recent heartbeats the statistics strategy reads.
    pub fn heartbeat_window(&self) -> usize {
        self.heartbeat_window
    }

    /// Infer the status of `service` at `now`.
    pub fn infer(&self, service: &Service, recent: &[Heartbeat], now: DateTime<Utc>) -> ServiceStatus {
        self.assess(service, recent, now).status
    }

    /// Infer the status and report how it was reached.
    pub fn assess(&self, service: &Service, recent: &[Heartbeat], now: DateTime<Utc>) -> Assessment {
        match InferenceStrategy::for_service(service) {
            InferenceStrategy::ConfigThreshold => Self::assess_config(service, now),
            InferenceStrategy::HeartbeatStatistics => self.assess_heartbeats(recent, now),
        }
    }

    fn assess_config(service: &Service, now: DateTime<Utc>) -> Assessment {
        // Status changes move updated_at, so it only stands in until a heartbeat arrives.
        let baseline = service.last_seen.or(service.updated_at);
        let status = match (baseline, service.expected_period) {
            (Some(baseline), Some(period)) => {
                let elapsed = seconds_between(baseline, now);
                if elapsed > service.dead_after_secs() as f64 {
                    ServiceStatus::Dead
                } else if elapsed > period as f64 * GRACE_FACTOR {
                    ServiceStatus::Down
                } else {
                    ServiceStatus::Alive
                }
            }
            _ => ServiceStatus::Down,
        };

        Assessment {
            status,
            strategy: InferenceStrategy::ConfigThreshold,
            sample_size: 0,
            median_interval: None,
            warming_up: false,
        }
    }

    fn assess_heartbeats(&self, recent: &[Heartbeat], now: DateTime<Utc>) -> Assessment {
        let mut timestamps: Vec<DateTime<Utc>> = recent.iter().map(|hb| hb.timestamp).collect();
        timestamps.sort_by(|a, b| b.cmp(a));
        timestamps.truncate(self.heartbeat_window);

        let sample_size = timestamps.len();
        let median_interval = median_interval_secs(&timestamps);
        let mut assessment = Assessment {
            status: ServiceStatus::Unknown,
            strategy: InferenceStrategy::HeartbeatStatistics,
            sample_size,
            median_interval,
            warming_up: false,
        };

        let Some(&latest) = timestamps.first() else {
            return assessment;
        };
        let silence = seconds_between(latest, now);
        let expired = silence > DEAD_CEILING_SECS as f64;

        if sample_size < MIN_SAMPLES {
            if expired {
                assessment.status = ServiceStatus::Dead;
            } else {
                assessment.warming_up = true;
            }
            return assessment;
        }

        assessment.status = match median_interval {
            _ if expired => ServiceStatus::Dead,
            Some(median) if silence > GRACE_FACTOR * median => ServiceStatus::Down,
            _ => ServiceStatus::Alive,
        };
        assessment
    }
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Median gap in seconds between consecutive timestamps sorted newest first.
///
/// `None` with fewer than two timestamps. An even number of gaps averages the
/// two middle values.
pub fn median_interval_secs(newest_first: &[DateTime<Utc>]) -> Option<f64> {
    if newest_first.len() < 2 {
        return None;
    }

    let mut gaps: Vec<f64> = newest_first
        .windows(2)
        .map(|pair| seconds_between(pair[1], pair[0]))
        .collect();
    gaps.sort_by(|a, b| a.total_cmp(b));

    let mid = gaps.len() / 2;
    if gaps.len() % 2 == 0 {
        Some((gaps[mid - 1] + gaps[mid]) / 2.0)
    } else {
        Some(gaps[mid])
    }
}
