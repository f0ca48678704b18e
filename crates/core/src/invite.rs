//! One-time invite code redemption rule.
//!
//! Redemption is a single-shot check-and-set against the observed
//! `used_count`; this module only computes the transition.

use crate::error::CoreError;
use crate::status::InviteCodeStatus;

/// Normalize a user-entered code (trimmed, uppercase).
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Transition produced by a successful redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    pub observed_count: i32,
    pub new_count: i32,
    /// `true` when this redemption uses up the code.
    pub exhausts: bool,
}

/// Compute the redemption transition for a code in `status` with
/// `used_count` of `max_uses`.
pub fn plan_redemption(
    status: InviteCodeStatus,
    used_count: i32,
    max_uses: i32,
) -> Result<Redemption, CoreError> {
    if status != InviteCodeStatus::Active {
        return Err(CoreError::Conflict(format!("Invite code is {status}")));
    }
    if used_count >= max_uses {
        return Err(CoreError::Conflict("Invite code has no uses left".into()));
    }
    let new_count = used_count + 1;
    Ok(Redemption {
        observed_count: used_count,
        new_count,
        exhausts: new_count >= max_uses,
    })
}
