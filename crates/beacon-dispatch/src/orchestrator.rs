// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Step orchestrator backed by the store's step journal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use beacon_core::{BeaconError, CampaignStore, StepOrchestrator};

/// Journal record of a started sleep.
#[derive(Debug, Serialize, Deserialize)]
struct SleepRecord {
    wake_at: chrono::DateTime<chrono::Utc>,
}

/// Checkpoints every completed step in the `dispatch_steps` journal.
///
/// A step output is written only after the step succeeds, so a step that
/// fails or is interrupted runs again on the next attempt. Step bodies must
/// therefore tolerate re-execution; the dispatcher's chunk step does this by
/// skipping contacts that already hold a log row.
pub struct JournalOrchestrator {
    store: Arc<dyn CampaignStore>,
}

impl JournalOrchestrator {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StepOrchestrator for JournalOrchestrator {
    async fn run_step(
        &self,
        run_id: &str,
        step: &str,
        work: BoxFuture<'_, Result<serde_json::Value, BeaconError>>,
    ) -> Result<serde_json::Value, BeaconError> {
        if let Some(output) = self.store.get_step(run_id, step).await? {
            debug!(run_id, step, "replaying checkpointed step");
            return Ok(output);
        }

        let output = work.await?;
        self.store.put_step(run_id, step, &output).await?;
        debug!(run_id, step, "step checkpointed");
        Ok(output)
    }

    async fn sleep(
        &self,
        run_id: &str,
        step: &str,
        duration: Duration,
    ) -> Result<(), BeaconError> {
        if duration.is_zero() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let wake_at = match self.store.get_step(run_id, step).await? {
            Some(value) => {
                serde_json::from_value::<SleepRecord>(value)
                    .map_err(|e| {
                        BeaconError::Internal(format!("sleep `{step}` checkpoint does not decode: {e}"))
                    })?
                    .wake_at
            }
            None => {
                let delta = chrono::Duration::from_std(duration)
                    .map_err(|e| BeaconError::Internal(format!("sleep duration out of range: {e}")))?;
                let record = SleepRecord {
                    wake_at: now + delta,
                };
                let value = serde_json::to_value(&record)
                    .map_err(|e| BeaconError::Internal(format!("sleep record: {e}")))?;
                self.store.put_step(run_id, step, &value).await?;
                record.wake_at
            }
        };

        // A negative remainder means the sleep already elapsed.
        if let Ok(remaining) = (wake_at - now).to_std() {
            debug!(run_id, step, remaining_ms = remaining.as_millis() as u64, "sleeping");
            tokio::time::sleep(remaining).await;
        }
        Ok(())
    }
}
