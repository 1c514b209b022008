use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::hospital::Hospital;
use crate::validation;

pub async fn get_hospital(pool: &SqlitePool) -> AppResult<Hospital> {
    sqlx::query_as::<_, Hospital>("SELECT address, phone_number FROM hospital WHERE id = 1")
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update_hospital(pool: &SqlitePool, address: &str, phone_number: &str) -> AppResult<Hospital> {
    let address = address.trim();
    let phone_number = phone_number.trim();
    validation::hospital(address, phone_number)?;

    sqlx::query("UPDATE hospital SET address = ?, phone_number = ? WHERE id = 1")
        .bind(address)
        .bind(phone_number)
        .execute(pool)
        .await?;
    tracing::info!("hospital details updated");
    Ok(Hospital {
        address: address.to_string(),
        phone_number: phone_number.to_string(),
    })
}
