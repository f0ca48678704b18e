//! Repository for the `invite_codes` table.

use portal_core::invite::Redemption;
use portal_core::status::InviteCodeStatus;
use sqlx::PgPool;

use crate::cas::{compare_and_swap, CasTarget};
use crate::models::invite_code::InviteCode;

const COLUMNS: &str = "id, code, status_id, used_count, max_uses, created_at, updated_at";

pub struct InviteCodeRepo;

impl InviteCodeRepo {
    /// Look up a code by its normalized text.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<InviteCode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM invite_codes WHERE code = $1");
        sqlx::query_as::<_, InviteCode>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Record a redemption with a single check-and-set on `used_count`.
    ///
    /// Returns `false` if another redemption landed first. When the new count
    /// uses the code up, its status moves to exhausted by a second swap.
    pub async fn record_redemption(
        pool: &PgPool,
        code: &InviteCode,
        redemption: &Redemption,
    ) -> Result<bool, sqlx::Error> {
        let won = compare_and_swap(
            pool,
            CasTarget::InviteCodeUsage,
            code.id,
            redemption.observed_count,
            redemption.new_count,
        )
        .await?;

        if won && redemption.exhausts {
            compare_and_swap(
                pool,
                CasTarget::InviteCodeStatus,
                code.id,
                InviteCodeStatus::Active.id(),
                InviteCodeStatus::Exhausted.id(),
            )
            .await?;
        }
        Ok(won)
    }
}
