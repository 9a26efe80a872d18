//! Request lifecycle: pending -> accepted -> donated, or -> cancelled.
//!
//! Transitions are validated and applied in memory here. The database layer
//! persists them with an update guarded on the previous status.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{BloodRequest, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("This request is no longer available.")]
    NoLongerAvailable,
    #[error("You cannot respond to your own request.")]
    OwnRequest,
    #[error("Only the requester can do this.")]
    NotRequester,
    #[error("Request must be accepted first.")]
    NotAccepted,
    #[error("Cannot cancel completed donation.")]
    AlreadyDonated,
    #[error("Request is already cancelled.")]
    AlreadyCancelled,
}

impl BloodRequest {
    /// A donor offers to fulfil the request. Binds the donor.
    pub fn respond(&mut self, donor_id: Uuid, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.status != RequestStatus::Pending {
            return Err(TransitionError::NoLongerAvailable);
        }
        if self.requester_id == donor_id {
            return Err(TransitionError::OwnRequest);
        }

        self.status = RequestStatus::Accepted;
        self.donor_id = Some(donor_id);
        self.accepted_at = Some(now);
        Ok(())
    }

    /// The requester confirms the bound donor has donated.
    pub fn confirm(&mut self, caller: Uuid, now: DateTime<Utc>) -> Result<(), TransitionError> {
        if self.requester_id != caller {
            return Err(TransitionError::NotRequester);
        }
        if self.status != RequestStatus::Accepted {
            return Err(TransitionError::NotAccepted);
        }

        self.status = RequestStatus::Donated;
        self.donated_at = Some(now);
        Ok(())
    }

    /// The requester withdraws a pending or accepted request.
    pub fn cancel(&mut self, caller: Uuid) -> Result<(), TransitionError> {
        if self.requester_id != caller {
            return Err(TransitionError::NotRequester);
        }
        match self.status {
            RequestStatus::Donated => Err(TransitionError::AlreadyDonated),
            RequestStatus::Cancelled => Err(TransitionError::AlreadyCancelled),
            RequestStatus::Pending | RequestStatus::Accepted => {
                self.status = RequestStatus::Cancelled;
                Ok(())
            }
        }
    }
}
