// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon serve`: the long-running process.
//!
//! Wires storage, the Cloud API client, the trigger worker, the scheduler,
//! and the HTTP gateway, then runs until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use beacon_config::BeaconConfig;
use beacon_core::{BeaconError, CampaignStore, MessagingGateway, PluginAdapter};
use beacon_dispatch::{
    CampaignService, DispatchSettings, Dispatcher, JournalOrchestrator, Reconciler, Scheduler,
    TriggerWorker,
};
use beacon_gateway::{AuthConfig, GatewayState, HealthState, WebhookSecrets};
use beacon_storage::SqliteStore;
use beacon_whatsapp::WhatsAppGateway;

use crate::shutdown::install_signal_handler;

pub async fn run_serve(config: BeaconConfig) -> Result<(), BeaconError> {
    info!("starting beacon serve");

    let store: Arc<dyn CampaignStore> = Arc::new(SqliteStore::open(config.storage.clone()).await?);
    let gateway: Arc<dyn MessagingGateway> = Arc::new(WhatsAppGateway::new(&config.whatsapp)?);

    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        gateway.clone(),
        Arc::new(JournalOrchestrator::new(store.clone())),
        DispatchSettings::from(&config.dispatch),
    ));
    let (worker, trigger) = TriggerWorker::new(dispatcher, config.dispatch.trigger_queue_capacity);

    let cancel = install_signal_handler();
    let worker_task = tokio::spawn(worker.run(cancel.clone()));

    let scheduler_task = if config.scheduler.enabled {
        let scheduler = Scheduler::new(
            store.clone(),
            trigger.clone(),
            Duration::from_secs(config.scheduler.poll_interval_secs),
        );
        Some(tokio::spawn(scheduler.run(cancel.clone())))
    } else {
        info!("scheduler disabled by configuration");
        None
    };

    let service = Arc::new(CampaignService::new(
        store.clone(),
        trigger,
        config.dispatch.default_country_code.clone(),
    ));
    match service.resume_interrupted().await {
        Ok(0) => {}
        Ok(n) => info!(count = n, "resuming interrupted campaigns"),
        Err(e) => warn!(error = %e, "failed to resume interrupted campaigns"),
    }

    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        gateway.clone(),
        config.whatsapp.unsubscribe_reply.clone(),
        config.dispatch.default_country_code.clone(),
    ));

    let state = GatewayState {
        store: store.clone(),
        gateway: gateway.clone(),
        service,
        reconciler,
        webhook: WebhookSecrets {
            verify_token: config.whatsapp.verify_token.clone(),
            app_secret: config.whatsapp.app_secret.clone(),
        },
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        health: HealthState::default(),
    };

    let served = beacon_gateway::start_server(&config.gateway, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway stopped with an error");
    }
    // Stop background tasks whichever way the server ended.
    cancel.cancel();

    if let Some(task) = scheduler_task {
        if let Err(e) = task.await {
            error!(error = %e, "scheduler task panicked");
        }
    }
    if let Err(e) = worker_task.await {
        error!(error = %e, "trigger worker panicked");
    }

    close_adapter(gateway.as_ref()).await;
    close_adapter(store.as_ref()).await;

    info!("beacon serve stopped");
    served
}

async fn close_adapter<A: PluginAdapter + ?Sized>(adapter: &A) {
    if let Err(e) = adapter.shutdown().await {
        warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
    }
}
