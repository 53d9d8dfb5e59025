// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign trigger events, the worker that runs them, and the scheduler
//! that emits them for due campaigns.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use beacon_core::{BeaconError, CampaignStore};

use crate::dispatcher::Dispatcher;
use crate::timestamp_now;

/// Request to start (or resume) sending one campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub campaign_id: String,
}

/// Cloneable sender side of the trigger queue.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<TriggerEvent>,
}

impl TriggerHandle {
    /// A handle and the receiver it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TriggerEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues a trigger, waiting while the queue is full.
    pub async fn trigger(&self, campaign_id: &str) -> Result<(), BeaconError> {
        self.tx
            .send(TriggerEvent {
                campaign_id: campaign_id.to_string(),
            })
            .await
            .map_err(|_| BeaconError::Internal("trigger worker is not running".into()))
    }
}

/// Default grace period for running dispatches at shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Removes a campaign from the in-flight set when its dispatch task ends,
/// including by panic or abort.
struct InFlightGuard {
    in_flight: Arc<DashMap<String, ()>>,
    campaign_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.campaign_id);
    }
}

/// Consumes trigger events and runs one dispatch task per campaign.
pub struct TriggerWorker {
    rx: mpsc::Receiver<TriggerEvent>,
    dispatcher: Arc<Dispatcher>,
    in_flight: Arc<DashMap<String, ()>>,
    drain_timeout: Duration,
}

impl TriggerWorker {
    /// Creates the worker and the handle that feeds it.
    pub fn new(dispatcher: Arc<Dispatcher>, capacity: usize) -> (Self, TriggerHandle) {
        let (handle, rx) = TriggerHandle::channel(capacity);
        let worker = Self {
            rx,
            dispatcher,
            in_flight: Arc::new(DashMap::new()),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        };
        (worker, handle)
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Runs until `cancel` fires or every handle is dropped, then waits up
    /// to the drain timeout for running dispatches. Dispatches still running
    /// after that are aborted and resume from their journal on the next start.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut tasks = JoinSet::new();
        info!("trigger worker started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => self.spawn_dispatch(&mut tasks, event),
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "dispatch task panicked");
                    }
                }
            }
        }

        self.rx.close();
        if tasks.is_empty() {
            info!("trigger worker stopped");
            return;
        }

        info!(count = tasks.len(), "waiting for running dispatches");
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                count = tasks.len(),
                "drain timeout reached, aborting dispatches"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
        info!("trigger worker stopped");
    }

    fn spawn_dispatch(&self, tasks: &mut JoinSet<()>, event: TriggerEvent) {
        let campaign_id = event.campaign_id;
        if self.in_flight.insert(campaign_id.clone(), ()).is_some() {
            debug!(campaign_id = %campaign_id, "dispatch already running, trigger dropped");
            return;
        }

        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            campaign_id: campaign_id.clone(),
        };
        let dispatcher = self.dispatcher.clone();
        tasks.spawn(async move {
            let _guard = guard;
            match dispatcher.dispatch(&campaign_id).await {
                Ok(report) => info!(
                    campaign_id = %campaign_id,
                    total = report.total,
                    success = report.success_count,
                    "dispatch finished"
                ),
                Err(e) => warn!(campaign_id = %campaign_id, error = %e, "dispatch failed"),
            }
        });
    }
}

/// Emits triggers for SCHEDULED campaigns whose time has come, and for
/// SENDING campaigns whose dispatcher stopped renewing its lease.
pub struct Scheduler {
    store: Arc<dyn CampaignStore>,
    trigger: TriggerHandle,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<dyn CampaignStore>, trigger: TriggerHandle, poll_interval: Duration) -> Self {
        Self {
            store,
            trigger,
            poll_interval,
        }
    }

    /// Triggers every due or orphaned campaign once. Returns how many were
    /// triggered.
    pub async fn poll_once(&self) -> Result<usize, BeaconError> {
        let now = timestamp_now();
        let due = self.store.due_scheduled_campaigns(&now).await?;
        for campaign in &due {
            debug!(campaign_id = %campaign.id, "scheduled campaign due");
            self.trigger.trigger(&campaign.id).await?;
        }
        let orphaned = self.store.orphaned_sending_campaigns(&now).await?;
        for campaign in &orphaned {
            info!(campaign_id = %campaign.id, "resuming dispatch without a live lease");
            self.trigger.trigger(&campaign.id).await?;
        }
        Ok(due.len() + orphaned.len())
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.poll_interval.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(0) => {}
                        Ok(n) => info!(count = n, "triggered scheduled campaigns"),
                        Err(e) => warn!(error = %e, "scheduler poll failed"),
                    }
                }
            }
        }
        info!("scheduler stopped");
    }
}
