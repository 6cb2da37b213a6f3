use thiserror::Error;

use hackvault_types::models::{AccountStatus, ApprovalOutcome, Profile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApprovalError {
    /// Only pending accounts can be rejected.
    #[error("account is not pending (status: {0:?})")]
    NotPending(AccountStatus),
}

pub fn account_status(profile: &Profile) -> AccountStatus {
    match (profile.is_admin, profile.is_approved) {
        (true, _) => AccountStatus::Admin,
        (false, true) => AccountStatus::Approved,
        (false, false) => AccountStatus::Pending,
    }
}

/// Pending non-admin accounts cannot log in.
pub fn can_authenticate(profile: &Profile) -> bool {
    account_status(profile) != AccountStatus::Pending
}

/// Pending -> Approved. Repeating the action on an approved account (or an
/// admin) changes nothing.
pub fn approve(status: AccountStatus) -> ApprovalOutcome {
    match status {
        AccountStatus::Pending => ApprovalOutcome::Approved,
        AccountStatus::Approved | AccountStatus::Admin => ApprovalOutcome::AlreadyApproved,
    }
}

/// Pending -> removed.
pub fn reject(status: AccountStatus) -> Result<(), ApprovalError> {
    match status {
        AccountStatus::Pending => Ok(()),
        other => Err(ApprovalError::NotPending(other)),
    }
}
