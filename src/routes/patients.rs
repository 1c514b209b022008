use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;
use serde::Deserialize;

use super::{flash_error, flash_redirect, render_page};
use crate::db::now_local;
use crate::error::{AppError, AppResult};
use crate::rbac;
use crate::services::{patient_service, report_service};
use crate::session::{FlashLevel, Session};
use crate::validation;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PatientUpdateForm {
    pub condition: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessForm {
    #[serde(default)]
    pub key: String,
}

const PATIENT_NOT_FOUND: &str = "Pasien tidak ditemukan!";

pub async fn detail(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    if session.nurse().is_none() {
        return Ok(flash_redirect(
            session,
            FlashLevel::Warning,
            "Hanya perawat yang dapat mengakses halaman ini!",
            &format!("/access/{id}"),
        ));
    }
    let snapshot = match patient_service::snapshot(&state.pool, id).await {
        Ok(snapshot) => snapshot,
        Err(AppError::NotFound) => {
            return Ok(flash_redirect(session, FlashLevel::Danger, PATIENT_NOT_FOUND, "/nurse"))
        }
        Err(e) => return Err(e),
    };
    render_page(
        &state,
        session,
        "patient_detail.html",
        context! {
            access_key => &snapshot.patient.access_key,
            patient => &snapshot.patient,
            history => &snapshot.history,
            hospital => &snapshot.hospital,
        },
    )
}

pub async fn detail_post(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<i64>,
    Form(form): Form<PatientUpdateForm>,
) -> AppResult<Response> {
    if session.nurse().is_none() {
        return Ok(flash_redirect(
            session,
            FlashLevel::Warning,
            "Hanya perawat yang dapat mengakses halaman ini!",
            &format!("/access/{id}"),
        ));
    }

    let outcome = if let Some(condition) = form.condition {
        patient_service::update_condition(&state.pool, &state.notifier, id, &condition, now_local())
            .await
            .map(|snapshot| {
                session.flash(FlashLevel::Success, "Kondisi pasien diperbarui!");
                let emergency = &snapshot.patient.emergency_phone_number;
                if !emergency.is_empty() {
                    session.flash(
                        FlashLevel::Info,
                        format!("Notifikasi pembaruan kondisi dikirim ke: {emergency}"),
                    );
                }
            })
    } else if let Some(raw) = form.priority {
        match validation::priority(&raw) {
            Ok(priority) => {
                patient_service::update_priority(&state.pool, &state.notifier, id, priority)
                    .await
                    .map(|()| session.flash(FlashLevel::Success, "Prioritas pasien diperbarui!"))
            }
            Err(e) => Err(e),
        }
    } else {
        Ok(())
    };

    match outcome {
        Ok(()) => {}
        Err(AppError::NotFound) => {
            return Ok(flash_redirect(session, FlashLevel::Danger, PATIENT_NOT_FOUND, "/nurse"))
        }
        Err(e) => flash_error(&mut session, e)?,
    }
    Ok((session, Redirect::to(&format!("/patient/{id}"))).into_response())
}

pub async fn report(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    if session.nurse().is_none() {
        return Ok(flash_redirect(
            session,
            FlashLevel::Warning,
            "Hanya perawat yang dapat mengakses laporan!",
            "/login",
        ));
    }
    let snapshot = match patient_service::snapshot(&state.pool, id).await {
        Ok(snapshot) => snapshot,
        Err(AppError::NotFound) => {
            return Ok(flash_redirect(session, FlashLevel::Danger, PATIENT_NOT_FOUND, "/nurse"))
        }
        Err(e) => return Err(e),
    };

    let filename = report_service::report_filename(&snapshot.patient.name);
    let letterhead = report_service::Letterhead {
        hospital_name: state.config.hospital_name.clone(),
        city: state.config.report_city.clone(),
    };
    let pdf = report_service::generate_report(snapshot, letterhead, now_local().date()).await?;
    tracing::info!(patient_id = id, bytes = pdf.len(), "report generated");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        pdf,
    )
        .into_response())
}

pub async fn access_form(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let patient = match patient_service::get_patient(&state.pool, id).await {
        Ok(patient) => patient,
        Err(AppError::NotFound) => {
            return Ok(flash_redirect(session, FlashLevel::Danger, PATIENT_NOT_FOUND, "/"))
        }
        Err(e) => return Err(e),
    };
    render_page(&state, session, "access_patient.html", context! { patient })
}

pub async fn access(
    State(state): State<AppState>,
    mut session: Session,
    Path(id): Path<i64>,
    Form(form): Form<AccessForm>,
) -> AppResult<Response> {
    let patient = match patient_service::get_patient(&state.pool, id).await {
        Ok(patient) => patient,
        Err(AppError::NotFound) => {
            return Ok(flash_redirect(session, FlashLevel::Danger, PATIENT_NOT_FOUND, "/"))
        }
        Err(e) => return Err(e),
    };

    match rbac::check_access_key(&patient.access_key, &form.key) {
        Ok(()) => {
            session.grant_patient(id);
            tracing::info!(patient_id = id, "visitor access granted");
            Ok((session, Redirect::to(&format!("/patient/view/{id}"))).into_response())
        }
        Err(e) => {
            tracing::debug!(patient_id = id, "wrong access key");
            flash_error(&mut session, e)?;
            render_page(&state, session, "access_patient.html", context! { patient })
        }
    }
}

pub async fn view(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match rbac::viewer_access(&session, id) {
        Ok(rbac::Viewer::Nurse(_)) => {
            return Ok(Redirect::to(&format!("/patient/{id}")).into_response())
        }
        Ok(rbac::Viewer::Visitor { .. }) => {}
        Err(_) => {
            return Ok(flash_redirect(
                session,
                FlashLevel::Warning,
                "Silakan masukkan key akses terlebih dahulu!",
                &format!("/access/{id}"),
            ))
        }
    }

    let snapshot = match patient_service::snapshot(&state.pool, id).await {
        Ok(snapshot) => snapshot,
        Err(AppError::NotFound) => {
            return Ok(flash_redirect(session, FlashLevel::Danger, PATIENT_NOT_FOUND, "/"))
        }
        Err(e) => return Err(e),
    };
    render_page(
        &state,
        session,
        "patient_view.html",
        context! {
            patient => &snapshot.patient,
            history => &snapshot.history,
            hospital => &snapshot.hospital,
        },
    )
}
