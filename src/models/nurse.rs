use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Nurse {
    pub id: i64,
    pub username: String,
    #[serde(skip)] // never serialize password hash
    pub password_hash: String,
}

/// Registration awaiting the approver's confirmation link.
#[derive(Debug, Clone, FromRow)]
pub struct PendingNurse {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub token: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterReq {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}
