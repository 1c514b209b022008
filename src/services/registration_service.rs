//! Nurse registration: pending request, approver mail, token confirmation
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::NaiveDateTime;
use rand::{rngs::OsRng, RngCore};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{format_timestamp, is_unique_violation, parse_timestamp};
use crate::error::{AppError, AppResult};
use crate::models::nurse::{Nurse, PendingNurse, RegisterReq};
use crate::services::auth_service;
use crate::smtp::{self, Mailer};
use crate::validation;

const TOKEN_BYTES: usize = 32;

#[derive(Debug)]
pub struct Submission {
    pub pending: PendingNurse,
    /// Delivery result of the approval mail. A failure leaves the pending row in place.
    pub mail: Result<(), AppError>,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn find_pending(pool: &SqlitePool, token: &str) -> AppResult<Option<PendingNurse>> {
    let pending = sqlx::query_as::<_, PendingNurse>("SELECT * FROM pending_nurse WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(pending)
}

async fn username_state(pool: &SqlitePool, username: &str) -> AppResult<Option<AppError>> {
    if auth_service::find_nurse(pool, username).await?.is_some() {
        return Ok(Some(AppError::DuplicateUsername { awaiting_approval: false }));
    }
    let pending: Option<i64> = sqlx::query_scalar("SELECT id FROM pending_nurse WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(pending.map(|_| AppError::DuplicateUsername { awaiting_approval: true }))
}

/// Validate, store the pending row and mail the approval link.
pub async fn submit(
    pool: &SqlitePool,
    mailer: Arc<dyn Mailer>,
    config: &Config,
    req: RegisterReq,
    now: NaiveDateTime,
) -> AppResult<Submission> {
    let username = req.username.trim();
    let password = req.password.trim();
    validation::registration(username, password, req.confirm_password.trim())?;

    // pre-check only; a concurrent submit can still slip past and hit the unique index
    if let Some(err) = username_state(pool, username).await? {
        return Err(err);
    }

    let password_hash = auth_service::hash_password(password, config.bcrypt_cost).await?;
    let token = generate_token();
    let created_at = format_timestamp(now);

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO pending_nurse (username, password_hash, token, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(&token)
    .bind(&created_at)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateUsername { awaiting_approval: true }
        } else {
            AppError::Database(e)
        }
    })?;

    let pending = PendingNurse {
        id,
        username: username.to_string(),
        password_hash,
        token,
        created_at,
    };
    tracing::info!(username = %pending.username, "registration submitted");

    let mail = match &config.approver_email {
        Some(approver) => {
            let message = smtp::approval_mail(
                approver,
                &pending.username,
                &config.confirmation_url(&pending.token),
                &config.hospital_name,
                config.registration_ttl_hours,
            );
            smtp::deliver(mailer, message).await.map_err(AppError::MailDelivery)
        }
        None => Err(AppError::MailDelivery("no approver address configured".into())),
    };
    if let Err(e) = &mail {
        tracing::warn!(username = %pending.username, "approval mail not sent: {e}");
    }

    Ok(Submission { pending, mail })
}

/// Promote a pending registration to a nurse account.
pub async fn confirm(
    pool: &SqlitePool,
    token: &str,
    ttl: chrono::Duration,
    now: NaiveDateTime,
) -> AppResult<Nurse> {
    let pending = find_pending(pool, token).await?.ok_or(AppError::InvalidToken)?;

    // an unreadable created_at cannot prove freshness
    let expired = match parse_timestamp(&pending.created_at) {
        Some(created_at) => now - created_at > ttl,
        None => true,
    };
    if expired {
        sqlx::query("DELETE FROM pending_nurse WHERE id = ?")
            .bind(pending.id)
            .execute(pool)
            .await?;
        tracing::info!(username = %pending.username, "registration token expired");
        return Err(AppError::Expired);
    }

    let mut tx = pool.begin().await?;
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO nurse (username, password_hash) VALUES (?, ?) RETURNING id",
    )
    .bind(&pending.username)
    .bind(&pending.password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::DuplicateUsername { awaiting_approval: false }
        } else {
            AppError::Database(e)
        }
    })?;
    sqlx::query("DELETE FROM pending_nurse WHERE id = ?")
        .bind(pending.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(username = %pending.username, "registration approved");
    Ok(Nurse {
        id,
        username: pending.username,
        password_hash: pending.password_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
