use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

// Advisory locks are scoped to the Postgres session, so the guard pins the
// connection it locked on until release.
const LOCK_NAMESPACE: i64 = 0x5449_434B_5452; // "TICKTR"
const REFRESH_ALL_KEY: i64 = 1;

fn refresh_lock_key() -> i64 {
    LOCK_NAMESPACE ^ REFRESH_ALL_KEY
}

/// Held while a batch refresh runs. Dropping without `release` closes the
/// underlying connection, which also frees the lock.
pub struct RefreshLockGuard {
    conn: Option<PoolConnection<Postgres>>,
    key: i64,
}

pub async fn try_acquire_refresh_lock(
    pool: &sqlx::PgPool,
) -> anyhow::Result<Option<RefreshLockGuard>> {
    let key = refresh_lock_key();
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire connection for refresh lock")?;

    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(&mut *conn)
        .await
        .with_context(|| format!("failed to acquire advisory lock (key={key})"))?;

    Ok(acquired.0.then(|| RefreshLockGuard {
        conn: Some(conn),
        key,
    }))
}

impl RefreshLockGuard {
    pub async fn release(mut self) -> anyhow::Result<()> {
        let key = self.key;
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        let res = sqlx::query("SELECT pg_advisory_unlock($1)")
            .persistent(false)
            .bind(key)
            .execute(&mut *conn)
            .await;
        if res.is_err() {
            // Don't hand a possibly still-locked session back to the pool.
            drop(conn.detach());
        }
        res.with_context(|| format!("failed to release advisory lock (key={key})"))?;
        Ok(())
    }
}

impl Drop for RefreshLockGuard {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!(key = self.key, "refresh lock dropped without release; closing connection");
            drop(conn.detach());
        }
    }
}
