use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;
use serde::Deserialize;

use super::{flash_error, flash_redirect, render_page};
use crate::error::AppResult;
use crate::models::patient::NewPatientReq;
use crate::rbac;
use crate::services::{hospital_service, patient_service};
use crate::session::{FlashLevel, Session};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

/// Both dashboard forms post here; `hospital_address` marks the hospital form.
#[derive(Debug, Deserialize)]
pub struct DashboardForm {
    pub hospital_address: Option<String>,
    #[serde(default)]
    pub hospital_phone: String,
    #[serde(flatten)]
    pub patient: NewPatientReq,
}

fn login_redirect(session: Session) -> Response {
    flash_redirect(
        session,
        FlashLevel::Warning,
        "Silakan login terlebih dahulu!",
        "/login",
    )
}

pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<SearchParams>,
) -> AppResult<Response> {
    if rbac::require_nurse(&session).is_err() {
        return Ok(login_redirect(session));
    }
    let hospital = hospital_service::get_hospital(&state.pool).await?;
    let search_query = params.search.trim();
    let patients = patient_service::search(&state.pool, search_query).await?;
    render_page(
        &state,
        session,
        "nurse_dashboard.html",
        context! { hospital, patients, search_query },
    )
}

pub async fn dashboard_post(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<DashboardForm>,
) -> AppResult<Response> {
    if rbac::require_nurse(&session).is_err() {
        return Ok(login_redirect(session));
    }

    if let Some(address) = form.hospital_address {
        match hospital_service::update_hospital(&state.pool, &address, &form.hospital_phone).await {
            Ok(_) => session.flash(FlashLevel::Success, "Detail rumah sakit diperbarui!"),
            Err(e) => flash_error(&mut session, e)?,
        }
        return Ok((session, Redirect::to("/nurse")).into_response());
    }

    match patient_service::create_patient(&state.pool, &state.notifier, form.patient).await {
        Ok(patient) => {
            session.flash(
                FlashLevel::Success,
                format!(
                    "Pasien {} ditambahkan dengan key: {}",
                    patient.name, patient.access_key
                ),
            );
            if !patient.emergency_phone_number.is_empty() {
                session.flash(
                    FlashLevel::Info,
                    format!(
                        "Notifikasi telah dikirim ke nomor darurat: {}",
                        patient.emergency_phone_number
                    ),
                );
            }
        }
        Err(e) => flash_error(&mut session, e)?,
    }
    Ok((session, Redirect::to("/nurse")).into_response())
}
