//! Database liveness check used by the status endpoint.

use anyhow::Result;
use sqlx::PgPool;

/// Round-trip a trivial query through the pool.
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
