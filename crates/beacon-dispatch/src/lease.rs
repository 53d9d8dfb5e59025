// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ownership lease on a campaign for the duration of one dispatch.
//!
//! The lease lives in the store, so it excludes concurrent dispatchers in
//! other tasks and other processes alike. A background heartbeat renews it
//! every third of its lifetime. A dispatcher that dies stops renewing, and
//! its campaign can be taken over once the lease expires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use beacon_core::{BeaconError, CampaignStatus, CampaignStore};

use crate::format_timestamp;

/// A held dispatch lease. Dropping it stops the heartbeat without releasing
/// the row; call [`DispatchLease::release`] on every normal exit.
pub struct DispatchLease {
    store: Arc<dyn CampaignStore>,
    campaign_id: String,
    owner: String,
    ttl: Duration,
    lost: Arc<AtomicBool>,
    _heartbeat: DropGuard,
}

impl DispatchLease {
    /// Takes the lease on `campaign_id` under a fresh owner token.
    ///
    /// Fails with `InvalidTransition` from SENDING while another dispatcher
    /// holds a live lease.
    pub async fn acquire(
        store: Arc<dyn CampaignStore>,
        campaign_id: &str,
        ttl: Duration,
    ) -> Result<Self, BeaconError> {
        let owner = uuid::Uuid::new_v4().to_string();
        let (now, expires_at) = deadline(ttl)?;
        if !store
            .acquire_dispatch_lease(campaign_id, &owner, &now, &expires_at)
            .await?
        {
            debug!(campaign_id, "dispatch lease held elsewhere");
            return Err(held_elsewhere());
        }

        let lost = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();
        tokio::spawn(heartbeat(
            store.clone(),
            campaign_id.to_string(),
            owner.clone(),
            ttl,
            lost.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            store,
            campaign_id: campaign_id.to_string(),
            owner,
            ttl,
            lost,
            _heartbeat: cancel.drop_guard(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Renews the lease now, failing if it was taken over.
    pub async fn confirm(&self) -> Result<(), BeaconError> {
        if self.lost.load(Ordering::SeqCst) {
            return Err(held_elsewhere());
        }
        let (_, expires_at) = deadline(self.ttl)?;
        if self
            .store
            .renew_dispatch_lease(&self.campaign_id, &self.owner, &expires_at)
            .await?
        {
            Ok(())
        } else {
            self.lost.store(true, Ordering::SeqCst);
            warn!(campaign_id = %self.campaign_id, "dispatch lease lost");
            Err(held_elsewhere())
        }
    }

    /// Stops the heartbeat and deletes the lease row.
    pub async fn release(self) {
        if let Err(e) = self
            .store
            .release_dispatch_lease(&self.campaign_id, &self.owner)
            .await
        {
            warn!(campaign_id = %self.campaign_id, error = %e, "failed to release dispatch lease");
        }
    }
}

async fn heartbeat(
    store: Arc<dyn CampaignStore>,
    campaign_id: String,
    owner: String,
    ttl: Duration,
    lost: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval((ttl / 3).max(Duration::from_millis(10)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick is immediate and the lease was just written.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let renewed = match deadline(ttl) {
                    Ok((_, expires_at)) => {
                        store.renew_dispatch_lease(&campaign_id, &owner, &expires_at).await
                    }
                    Err(e) => Err(e),
                };
                match renewed {
                    Ok(true) => debug!(campaign_id = %campaign_id, "dispatch lease renewed"),
                    Ok(false) => {
                        warn!(campaign_id = %campaign_id, "dispatch lease lost");
                        lost.store(true, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => warn!(campaign_id = %campaign_id, error = %e, "lease renewal failed"),
                }
            }
        }
    }
}

fn deadline(ttl: Duration) -> Result<(String, String), BeaconError> {
    let now = chrono::Utc::now();
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| BeaconError::Internal(format!("lease ttl out of range: {e}")))?;
    Ok((format_timestamp(now), format_timestamp(now + ttl)))
}

fn held_elsewhere() -> BeaconError {
    BeaconError::InvalidTransition {
        from: CampaignStatus::Sending,
        to: CampaignStatus::Sending,
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::TemplateStatus;
    use beacon_test_utils::TestHarness;

    use super::*;

    async fn sending_campaign(harness: &TestHarness) -> String {
        harness.seed_template("tpl-1", TemplateStatus::Approved).await.unwrap();
        harness
            .seed_campaign("tpl-1", CampaignStatus::Sending, &[])
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn second_holder_is_rejected_until_release() {
        let harness = TestHarness::new().await.unwrap();
        let id = sending_campaign(&harness).await;
        let ttl = Duration::from_secs(60);

        let first = DispatchLease::acquire(harness.store(), &id, ttl).await.unwrap();
        let err = DispatchLease::acquire(harness.store(), &id, ttl)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BeaconError::InvalidTransition {
                from: CampaignStatus::Sending,
                to: CampaignStatus::Sending
            }
        ));

        first.confirm().await.unwrap();
        first.release().await;
        let second = DispatchLease::acquire(harness.store(), &id, ttl).await.unwrap();
        second.release().await;
    }

    #[tokio::test]
    async fn heartbeat_keeps_a_short_lease_alive() {
        let harness = TestHarness::new().await.unwrap();
        let id = sending_campaign(&harness).await;
        let ttl = Duration::from_millis(300);

        let lease = DispatchLease::acquire(harness.store(), &id, ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(900)).await;

        assert!(DispatchLease::acquire(harness.store(), &id, ttl).await.is_err());
        lease.confirm().await.unwrap();
        lease.release().await;
    }

    #[tokio::test]
    async fn dropped_lease_expires_and_is_taken_over() {
        let harness = TestHarness::new().await.unwrap();
        let id = sending_campaign(&harness).await;
        let ttl = Duration::from_millis(200);

        let abandoned = DispatchLease::acquire(harness.store(), &id, ttl).await.unwrap();
        let abandoned_owner = abandoned.owner().to_string();
        drop(abandoned);
        tokio::time::sleep(Duration::from_millis(400)).await;

        let successor = DispatchLease::acquire(harness.store(), &id, ttl).await.unwrap();
        assert_ne!(successor.owner(), abandoned_owner);
        successor.release().await;
    }

    #[tokio::test]
    async fn taken_over_lease_fails_confirmation() {
        let harness = TestHarness::new().await.unwrap();
        let id = sending_campaign(&harness).await;

        let lease = DispatchLease::acquire(harness.store(), &id, Duration::from_secs(60))
            .await
            .unwrap();
        harness
            .store
            .release_dispatch_lease(&id, lease.owner())
            .await
            .unwrap();
        let (now, later) = deadline(Duration::from_secs(60)).unwrap();
        assert!(
            harness
                .store
                .acquire_dispatch_lease(&id, "intruder", &now, &later)
                .await
                .unwrap()
        );

        assert!(lease.confirm().await.is_err());
    }
}
