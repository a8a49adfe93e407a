//! Periodic reconciliation of every registered service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use svcwatch_protocols::{Service, ServiceStatus, Store};

use crate::engine::{Assessment, StatusEngine};
use crate::error::MonitorError;
use crate::recorder::TransitionRecorder;

#[cfg(test)]
#[path = "monitor_loop_tests.rs"]
mod tests;

/// Outcome of one pass over all services.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub evaluated: usize,
    pub changed: Vec<(String, ServiceStatus, ServiceStatus)>,
    pub failed: Vec<(String, String)>,
}

/// The only writer of service status.
pub struct MonitorLoop {
    store: Arc<dyn Store>,
    engine: StatusEngine,
    recorder: TransitionRecorder,
    interval: Duration,
}

impl MonitorLoop {
    pub fn new(store: Arc<dyn Store>, engine: StatusEngine) -> Self {
        Self {
            recorder: TransitionRecorder::new(store.clone()),
            store,
            engine,
            interval: Duration::from_secs(60),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Status to persist given an assessment and the stored status.
    ///
    /// A warming-up service that is currently alive stays alive, so a fresh
    /// registration is not demoted to unknown before its cadence is known.
    pub fn settle(assessment: &Assessment, stored: ServiceStatus) -> ServiceStatus {
        if assessment.warming_up && stored == ServiceStatus::Alive {
            ServiceStatus::Alive
        } else {
            assessment.status
        }
    }

    /// Run until `cancel` flips to true. A tick in progress always finishes.
    pub async fn run(self: Arc<Self>, mut cancel: watch::Receiver<bool>) {
        info!("Monitor loop started (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *cancel.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(report) if !report.changed.is_empty() || !report.failed.is_empty() => {
                            info!(
                                evaluated = report.evaluated,
                                changed = report.changed.len(),
                                failed = report.failed.len(),
                                "Monitor tick finished"
                            );
                        }
                        Ok(report) => debug!(evaluated = report.evaluated, "Monitor tick finished"),
                        Err(e) => error!("Monitor tick failed: {}", e),
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Monitor loop shutting down");
    }

    /// Evaluate every service once, as of now.
    pub async fn tick(&self) -> Result<TickReport, MonitorError> {
        self.tick_at(Utc::now()).await
    }

    /// Evaluate every service once, as of `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport, MonitorError> {
        let services = self
            .store
            .list_services()
            .await
            .map_err(|e| MonitorError::store("list_services", "*", e))?;

        let mut report = TickReport {
            evaluated: services.len(),
            ..Default::default()
        };

        for service in services {
            match self.evaluate(&service, now).await {
                Ok(Some(target)) => {
                    report
                        .changed
                        .push((service.service_key.clone(), service.status, target));
                }
                Ok(None) => {}
                Err(e) => {
                    let operation = match &e {
                        MonitorError::Store { operation, .. } => *operation,
                        _ => "evaluate",
                    };
                    warn!(
                        service_key = %service.service_key,
                        operation,
                        error = %e,
                        "Service evaluation failed"
                    );
                    report.failed.push((service.service_key.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Returns the new status when it changed.
    async fn evaluate(
        &self,
        service: &Service,
        now: DateTime<Utc>,
    ) -> Result<Option<ServiceStatus>, MonitorError> {
        let recent = self
            .store
            .recent_heartbeats(&service.service_key, self.engine.heartbeat_window())
            .await
            .map_err(|e| MonitorError::store("recent_heartbeats", &service.service_key, e))?;

        let assessment = self.engine.assess(service, &recent, now);
        let target = Self::settle(&assessment, service.status);
        debug!(
            service_key = %service.service_key,
            strategy = ?assessment.strategy,
            samples = assessment.sample_size,
            median = ?assessment.median_interval,
            stored = %service.status,
            target = %target,
            "Service evaluated"
        );

        if target == service.status {
            return Ok(None);
        }
        self.recorder.reconcile(service, target, now).await?;
        Ok(Some(target))
    }
}
