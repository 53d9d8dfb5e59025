// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign state machine.
//!
//! ```text
//! DRAFT ──► SCHEDULED ──► SENDING ──► COMPLETED
//!   │                        ▲   └──► FAILED
//!   └────────────────────────┘
//! ```
//!
//! COMPLETED and FAILED are terminal. Only DRAFT campaigns may be deleted.

use crate::error::BeaconError;
use crate::types::CampaignStatus;

impl CampaignStatus {
    /// Returns true if `self -> next` is an allowed transition.
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Sending)
                | (Scheduled, Sending)
                | (Sending, Completed)
                | (Sending, Failed)
        )
    }

    /// Validate `self -> next`, returning the typed error on rejection.
    pub fn transition_to(self, next: CampaignStatus) -> Result<CampaignStatus, BeaconError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BeaconError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// States from which `next` may be entered.
    pub fn predecessors(next: CampaignStatus) -> &'static [CampaignStatus] {
        use CampaignStatus::*;
        match next {
            Draft => &[],
            Scheduled => &[Draft],
            Sending => &[Draft, Scheduled],
            Completed | Failed => &[Sending],
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Failed)
    }

    /// A new dispatch may only start from DRAFT or SCHEDULED.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, CampaignStatus::Draft | CampaignStatus::Scheduled)
    }

    /// Only drafts may be deleted.
    pub fn is_deletable(self) -> bool {
        self == CampaignStatus::Draft
    }

    /// Position along the lifecycle; never decreases across valid transitions.
    pub fn rank(self) -> u8 {
        match self {
            CampaignStatus::Draft => 0,
            CampaignStatus::Scheduled => 1,
            CampaignStatus::Sending => 2,
            CampaignStatus::Completed | CampaignStatus::Failed => 3,
        }
    }
}
