//! Patient records, condition history and the broadcasts they trigger
use chrono::NaiveDateTime;
use rand::{rngs::OsRng, RngCore};
use sqlx::SqlitePool;

use crate::db::format_timestamp;
use crate::error::{AppError, AppResult};
use crate::models::patient::{
    ConditionHistory, DashboardRow, NewPatientReq, Patient, PatientSnapshot, PatientSummary, Priority,
};
use crate::services::event_stream::{Notifier, RealtimeEvent};
use crate::services::hospital_service;
use crate::validation;

/// 8 hex characters. Collisions between patients are not checked.
pub fn generate_access_key() -> String {
    let mut bytes = [0u8; 4];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Patients with a non-empty condition, highest priority then newest first.
pub async fn active_patients(pool: &SqlitePool) -> AppResult<Vec<PatientSummary>> {
    let rows = sqlx::query_as::<_, PatientSummary>(
        "SELECT id, name, condition, priority, last_updated FROM patient \
         WHERE condition != '' ORDER BY priority DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Name search over all patients, including ones without a condition yet.
pub async fn search(pool: &SqlitePool, query: &str) -> AppResult<Vec<DashboardRow>> {
    let query = query.trim();
    let rows = if query.is_empty() {
        sqlx::query_as::<_, DashboardRow>(
            "SELECT id, name, access_key, condition, priority, last_updated FROM patient \
             ORDER BY priority DESC, id DESC",
        )
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, DashboardRow>(
            "SELECT id, name, access_key, condition, priority, last_updated FROM patient \
             WHERE name LIKE ? ORDER BY priority DESC, id DESC",
        )
        .bind(format!("%{query}%"))
        .fetch_all(pool)
        .await?
    };
    Ok(rows)
}

pub async fn get_patient(pool: &SqlitePool, id: i64) -> AppResult<Patient> {
    sqlx::query_as::<_, Patient>("SELECT * FROM patient WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound)
}

/// Newest first.
pub async fn history(pool: &SqlitePool, patient_id: i64) -> AppResult<Vec<ConditionHistory>> {
    let rows = sqlx::query_as::<_, ConditionHistory>(
        "SELECT * FROM condition_history WHERE patient_id = ? ORDER BY timestamp DESC, id DESC",
    )
    .bind(patient_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn snapshot(pool: &SqlitePool, id: i64) -> AppResult<PatientSnapshot> {
    let patient = get_patient(pool, id).await?;
    let history = history(pool, id).await?;
    let hospital = hospital_service::get_hospital(pool).await?;
    Ok(PatientSnapshot {
        patient,
        history,
        hospital,
    })
}

pub async fn broadcast_patient_list(pool: &SqlitePool, notifier: &Notifier) -> AppResult<()> {
    let patients = active_patients(pool).await?;
    notifier.publish(RealtimeEvent::PatientListUpdate { patients });
    Ok(())
}

/// Insert a new patient with an empty condition; it stays off the public list
/// until the first condition update.
pub async fn create_patient(
    pool: &SqlitePool,
    notifier: &Notifier,
    req: NewPatientReq,
) -> AppResult<Patient> {
    let req = req.trimmed();
    let priority = validation::new_patient(&req)?;
    let access_key = generate_access_key();

    let id = sqlx::query_scalar::<_, i64>(
        r#"INSERT INTO patient (
            name, access_key, condition, family_member_name, phone_number,
            emergency_phone_number, id_card_number, address, room_responsible_person,
            room_responsible_phone, doctor_name, doctor_phone, priority, last_updated
        ) VALUES (?, ?, '', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '') RETURNING id"#,
    )
    .bind(&req.patient_name)
    .bind(&access_key)
    .bind(&req.family_member_name)
    .bind(&req.phone_number)
    .bind(&req.emergency_phone_number)
    .bind(&req.id_card_number)
    .bind(&req.address)
    .bind(&req.room_responsible_person)
    .bind(&req.room_responsible_phone)
    .bind(&req.doctor_name)
    .bind(&req.doctor_phone)
    .bind(priority.level())
    .fetch_one(pool)
    .await?;

    tracing::info!(patient_id = id, "patient created");
    broadcast_patient_list(pool, notifier).await?;
    get_patient(pool, id).await
}

/// Sets the condition and appends the same value and timestamp to the history.
pub async fn update_condition(
    pool: &SqlitePool,
    notifier: &Notifier,
    id: i64,
    condition: &str,
    now: NaiveDateTime,
) -> AppResult<PatientSnapshot> {
    let condition = condition.trim();
    if condition.is_empty() {
        return Err(AppError::validation("Kondisi pasien harus diisi!"));
    }
    let timestamp = format_timestamp(now);

    let mut tx = pool.begin().await?;
    let updated = sqlx::query("UPDATE patient SET condition = ?, last_updated = ? WHERE id = ?")
        .bind(condition)
        .bind(&timestamp)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    sqlx::query("INSERT INTO condition_history (patient_id, condition, timestamp) VALUES (?, ?, ?)")
        .bind(id)
        .bind(condition)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(patient_id = id, "condition updated");
    let snapshot = snapshot(pool, id).await?;
    notifier.publish(RealtimeEvent::from(snapshot.clone()));
    Ok(snapshot)
}

pub async fn update_priority(
    pool: &SqlitePool,
    notifier: &Notifier,
    id: i64,
    priority: Priority,
) -> AppResult<()> {
    let updated = sqlx::query("UPDATE patient SET priority = ? WHERE id = ?")
        .bind(priority.level())
        .bind(id)
        .execute(pool)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(patient_id = id, priority = priority.level(), "priority updated");
    broadcast_patient_list(pool, notifier).await
}
