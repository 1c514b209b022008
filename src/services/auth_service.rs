use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::nurse::Nurse;

pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(hashed)
}

pub async fn find_nurse(pool: &SqlitePool, username: &str) -> AppResult<Option<Nurse>> {
    let nurse = sqlx::query_as::<_, Nurse>("SELECT * FROM nurse WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(nurse)
}

/// `Ok(None)` for unknown user or wrong password. A malformed stored hash is
/// the only verify failure surfaced as an error.
pub async fn verify_nurse(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> AppResult<Option<Nurse>> {
    let Some(nurse) = find_nurse(pool, username).await? else {
        return Ok(None);
    };

    let password = password.to_string();
    let stored = nurse.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    match verified {
        Ok(true) => Ok(Some(nurse)),
        Ok(false) => Ok(None),
        Err(e) => {
            tracing::warn!(username = %nurse.username, "password hash verify failed: {e}");
            Err(AppError::PasswordVerification)
        }
    }
}
