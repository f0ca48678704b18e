//! Compare-and-swap: the one concurrency primitive of the persistence layer.
//!
//! Every "update only if the row still looks like what I read" write goes
//! through [`compare_and_swap`], so the guard shape is identical at every
//! call site. Table and column names come from the closed [`CasTarget`]
//! enum, never from callers.

use portal_core::status::InviteCodeStatus;
use portal_core::types::DbId;
use sqlx::{Encode, PgPool, Postgres, Type};

/// A (table, column) pair that supports conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasTarget {
    /// `generation_jobs.status_id`
    JobStatus,
    /// `invite_codes.used_count`, only while the code is active.
    InviteCodeUsage,
    /// `invite_codes.status_id`
    InviteCodeStatus,
}

impl CasTarget {
    pub fn table(self) -> &'static str {
        match self {
            Self::JobStatus => "generation_jobs",
            Self::InviteCodeUsage | Self::InviteCodeStatus => "invite_codes",
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::JobStatus | Self::InviteCodeStatus => "status_id",
            Self::InviteCodeUsage => "used_count",
        }
    }

    /// Extra predicate ANDed into the guard.
    pub fn guard(self) -> Option<String> {
        match self {
            Self::InviteCodeUsage => Some(format!(
                "status_id = {}",
                InviteCodeStatus::Active.id()
            )),
            Self::JobStatus | Self::InviteCodeStatus => None,
        }
    }

    /// The SQL statement issued for this target.
    ///
    /// Binds: `$1` new value, `$2` id, `$3` expected value.
    pub fn statement(self) -> String {
        let table = self.table();
        let column = self.column();
        let guard = self
            .guard()
            .map(|g| format!(" AND {g}"))
            .unwrap_or_default();
        format!(
            "UPDATE {table} SET {column} = $1, updated_at = NOW() \
             WHERE id = $2 AND {column} = $3{guard}"
        )
    }
}

/// Set `target` to `new` on row `id` iff it currently equals `expected`.
///
/// Returns `true` when this call won (exactly one row changed). Single-shot:
/// a `false` is final for the caller, there is no retry loop.
pub async fn compare_and_swap<T>(
    pool: &PgPool,
    target: CasTarget,
    id: DbId,
    expected: T,
    new: T,
) -> Result<bool, sqlx::Error>
where
    T: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
{
    let statement = target.statement();
    let result = sqlx::query(&statement)
        .bind(new)
        .bind(id)
        .bind(expected)
        .execute(pool)
        .await?;

    let won = result.rows_affected() == 1;
    if !won {
        tracing::debug!(
            table = target.table(),
            column = target.column(),
            %id,
            "Compare-and-swap lost",
        );
    }
    Ok(won)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_statement_has_no_extra_guard() {
        assert_eq!(
            CasTarget::JobStatus.statement(),
            "UPDATE generation_jobs SET status_id = $1, updated_at = NOW() \
             WHERE id = $2 AND status_id = $3"
        );
    }

    #[test]
    fn invite_usage_statement_requires_active_code() {
        let sql = CasTarget::InviteCodeUsage.statement();
        assert!(sql.starts_with("UPDATE invite_codes SET used_count = $1"));
        assert!(sql.ends_with("AND used_count = $3 AND status_id = 1"));
    }
}
