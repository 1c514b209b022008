use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("username already taken")]
    DuplicateUsername { awaiting_approval: bool },
    #[error("invalid confirmation token")]
    InvalidToken,
    #[error("confirmation token expired")]
    Expired,
    #[error("not found")]
    NotFound,
    #[error("authentication required")]
    AuthRequired,
    #[error("wrong access key")]
    WrongAccessKey,
    #[error("mail delivery failed: {0}")]
    MailDelivery(String),
    #[error("stored password hash could not be verified")]
    PasswordVerification,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("report error: {0}")]
    Report(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Message shown to the user in a flash.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::DuplicateUsername { awaiting_approval: false } => {
                "Username sudah digunakan!".into()
            }
            Self::DuplicateUsername { awaiting_approval: true } => {
                "Username ini sedang menunggu konfirmasi dokter!".into()
            }
            Self::InvalidToken => "Token konfirmasi tidak valid atau telah kedaluwarsa!".into(),
            Self::Expired => "Token konfirmasi telah kedaluwarsa!".into(),
            Self::NotFound => "Pasien tidak ditemukan!".into(),
            Self::AuthRequired => "Silakan login terlebih dahulu!".into(),
            Self::WrongAccessKey => "Key akses salah! Hubungi perawat.".into(),
            Self::MailDelivery(_) => {
                "Gagal mengirim email konfirmasi. Silakan coba lagi nanti.".into()
            }
            Self::PasswordVerification => {
                "Terjadi kesalahan saat memverifikasi password. Silakan coba lagi atau daftar ulang."
                    .into()
            }
            _ => "Terjadi kesalahan, silakan coba lagi.".into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidToken | Self::Expired => StatusCode::BAD_REQUEST,
            Self::DuplicateUsername { .. } => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AuthRequired | Self::WrongAccessKey | Self::PasswordVerification => {
                StatusCode::UNAUTHORIZED
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = format!(
            "<!doctype html><title>{}</title><h1>{}</h1><p><a href=\"/\">Kembali</a></p>",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error"),
        );
        (status, Html(body)).into_response()
    }
}
