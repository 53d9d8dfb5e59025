// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable step orchestration.
//!
//! A long-running job is written as a sequence of named steps. The
//! orchestrator executes each step at most once per run: a step whose output
//! is already checkpointed returns that output instead of running again, so a
//! restarted job only re-executes the steps it never finished.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::BeaconError;

/// Execute-once-and-checkpoint step runner.
#[async_trait]
pub trait StepOrchestrator: Send + Sync {
    /// Runs `work` as step `step` of run `run_id`, or returns its recorded output.
    ///
    /// A failed step is not checkpointed and runs again on the next attempt.
    async fn run_step(
        &self,
        run_id: &str,
        step: &str,
        work: BoxFuture<'_, Result<serde_json::Value, BeaconError>>,
    ) -> Result<serde_json::Value, BeaconError>;

    /// Suspends the run for `duration`. A resumed run only waits for whatever
    /// remains of a sleep that was already started.
    async fn sleep(
        &self,
        run_id: &str,
        step: &str,
        duration: Duration,
    ) -> Result<(), BeaconError>;
}

/// Typed wrapper over [`StepOrchestrator::run_step`].
pub async fn run_typed_step<'a, T, F>(
    orchestrator: &'a dyn StepOrchestrator,
    run_id: &'a str,
    step: &'a str,
    work: F,
) -> Result<T, BeaconError>
where
    T: Serialize + DeserializeOwned + Send + 'a,
    F: Future<Output = Result<T, BeaconError>> + Send + 'a,
{
    let value = orchestrator
        .run_step(
            run_id,
            step,
            Box::pin(async move {
                let output = work.await?;
                serde_json::to_value(&output).map_err(|e| {
                    BeaconError::Internal(format!("step `{step}` output not serializable: {e}"))
                })
            }),
        )
        .await?;

    serde_json::from_value(value).map_err(|e| {
        BeaconError::Internal(format!("step `{step}` checkpoint does not decode: {e}"))
    })
}
