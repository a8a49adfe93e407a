//! Delivers unalerted transitions and acknowledges them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use svcwatch_protocols::TransitionFilter;

use crate::alert_manager::AlertManager;
use crate::alerts::Alert;
use crate::error::MonitorError;
use crate::recorder::TransitionRecorder;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Alerts delivered by at least one channel.
    pub sent: usize,
    /// Services whose transitions were acknowledged.
    pub acknowledged: usize,
    /// Services left pending for the next pass.
    pub failed: Vec<String>,
}

/// Built-in consumer of the transition log.
pub struct AlertDispatcher {
    recorder: TransitionRecorder,
    manager: AlertManager,
    interval: Duration,
}

impl AlertDispatcher {
    pub fn new(recorder: TransitionRecorder, manager: AlertManager) -> Self {
        Self {
            recorder,
            manager,
            interval: Duration::from_secs(60),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until `cancel` flips to true.
    pub async fn run(self: Arc<Self>, mut cancel: watch::Receiver<bool>) {
        info!(
            "Alert dispatcher started (interval: {:?}, channels: {:?})",
            self.interval,
            self.manager.channel_names()
        );

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *cancel.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    match self.dispatch_once().await {
                        Ok(report) if report.sent > 0 || !report.failed.is_empty() => {
                            info!(
                                sent = report.sent,
                                acknowledged = report.acknowledged,
                                failed = report.failed.len(),
                                "Alert dispatch finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => error!("Alert dispatch failed: {}", e),
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Alert dispatcher shutting down");
    }

    /// Send the newest unalerted transition of each service.
    ///
    /// A service is acknowledged once any channel took its alert. Transitions
    /// without a message are acknowledged without sending anything.
    pub async fn dispatch_once(&self) -> Result<DispatchReport, MonitorError> {
        let pending = self.recorder.latest(&TransitionFilter::not_alerted()).await?;
        let mut report = DispatchReport::default();

        for (service_key, transition) in pending {
            if let Some(alert) = Alert::from_transition(&transition) {
                let errors = self.manager.send(&alert).await;
                if errors.len() >= self.manager.channel_count() {
                    warn!(service_key = %service_key, "No alert channel accepted the alert");
                    report.failed.push(service_key);
                    continue;
                }
                report.sent += 1;
            } else {
                debug!(service_key = %service_key, "Acknowledging transition without message");
            }

            match self.recorder.acknowledge(&service_key).await {
                Ok(_) => report.acknowledged += 1,
                Err(e) => {
                    error!(service_key = %service_key, operation = "acknowledge", "{}", e);
                    report.failed.push(service_key);
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertChannel;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use svcwatch_protocols::{Service, ServiceStatus, ServiceStore, Store};
    use svcwatch_store::MemoryStore;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    struct RecordingChannel(Arc<Recording>);

    #[async_trait]
    impl AlertChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, alert: &Alert) -> Result<(), MonitorError> {
            self.0.sent.lock().unwrap().push(alert.message.clone());
            Ok(())
        }
    }

    struct FailingChannel;

    #[async_trait]
    impl AlertChannel for FailingChannel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn send(&self, _alert: &Alert) -> Result<(), MonitorError> {
            Err(MonitorError::Alert("unreachable".to_string()))
        }
    }

    async fn store_with_transition(to: ServiceStatus) -> (Arc<dyn Store>, TransitionRecorder) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let now = Utc::now();
        store.insert_service(Service::new("api", now)).await.unwrap();
        let recorder = TransitionRecorder::new(store.clone());
        let service = store.get_service("api").await.unwrap().unwrap();
        recorder.reconcile(&service, to, now).await.unwrap();
        (store, recorder)
    }

    #[tokio::test]
    async fn test_dispatch_sends_and_acknowledges() {
        let (_store, recorder) = store_with_transition(ServiceStatus::Down).await;
        let recording = Arc::new(Recording::default());
        let manager = AlertManager::with_channels(vec![Box::new(RecordingChannel(recording.clone()))]);
        let dispatcher = AlertDispatcher::new(recorder.clone(), manager);

        let report = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.acknowledged, 1);
        assert!(recording.sent.lock().unwrap()[0].starts_with("api is down."));

        let report = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(report.sent, 0);
        assert!(recorder.latest(&TransitionFilter::not_alerted()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_keeps_pending_when_all_channels_fail() {
        let (_store, recorder) = store_with_transition(ServiceStatus::Dead).await;
        let manager = AlertManager::with_channels(vec![Box::new(FailingChannel)]);
        let dispatcher = AlertDispatcher::new(recorder.clone(), manager);

        let report = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, vec!["api".to_string()]);
        assert_eq!(
            recorder.latest(&TransitionFilter::not_alerted()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_dispatch_partial_failure_still_acknowledges() {
        let (_store, recorder) = store_with_transition(ServiceStatus::Down).await;
        let recording = Arc::new(Recording::default());
        let manager = AlertManager::with_channels(vec![
            Box::new(FailingChannel),
            Box::new(RecordingChannel(recording.clone())),
        ]);
        let dispatcher = AlertDispatcher::new(recorder, manager);

        let report = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(report.acknowledged, 1);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_acknowledges_silent_transition() {
        let (_store, recorder) = store_with_transition(ServiceStatus::Unknown).await;
        let recording = Arc::new(Recording::default());
        let manager = AlertManager::with_channels(vec![Box::new(RecordingChannel(recording.clone()))]);
        let dispatcher = AlertDispatcher::new(recorder, manager);

        let report = dispatcher.dispatch_once().await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.acknowledged, 1);
        assert!(recording.sent.lock().unwrap().is_empty());
    }
}
