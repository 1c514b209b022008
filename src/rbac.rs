// Access control: nurse sessions and per-patient visitor grants
use crate::error::{AppError, AppResult};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Nurse(String),
    Visitor { patient_id: i64 },
}

pub fn require_nurse(session: &Session) -> AppResult<String> {
    session
        .nurse()
        .map(str::to_string)
        .ok_or(AppError::AuthRequired)
}

/// Who may view `patient_id`. A nurse session wins over any visitor grant.
pub fn viewer_access(session: &Session, patient_id: i64) -> AppResult<Viewer> {
    if let Some(nurse) = session.nurse() {
        return Ok(Viewer::Nurse(nurse.to_string()));
    }
    match session.access_patient_id() {
        Some(granted) if granted == patient_id => Ok(Viewer::Visitor { patient_id }),
        _ => Err(AppError::AuthRequired),
    }
}

/// Plain comparison; access keys are short shared secrets, not passwords.
pub fn check_access_key(expected: &str, presented: &str) -> AppResult<()> {
    if !expected.is_empty() && expected == presented.trim() {
        Ok(())
    } else {
        Err(AppError::WrongAccessKey)
    }
}
