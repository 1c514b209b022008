use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use minijinja::context;

use super::{flash_error, flash_redirect, render_page};
use crate::db::now_local;
use crate::error::AppResult;
use crate::models::nurse::{LoginReq, RegisterReq};
use crate::services::{auth_service, registration_service};
use crate::session::{FlashLevel, Session};
use crate::AppState;

pub async fn register_form(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    render_page(&state, session, "register.html", context! { username => "" })
}

pub async fn register(
    State(state): State<AppState>,
    mut session: Session,
    Form(req): Form<RegisterReq>,
) -> AppResult<Response> {
    let username = req.username.trim().to_string();
    let submission = registration_service::submit(
        &state.pool,
        state.mailer.clone(),
        &state.config,
        req,
        now_local(),
    )
    .await;

    match submission {
        Ok(submission) => {
            match submission.mail {
                Ok(()) => session.flash(
                    FlashLevel::Info,
                    "Permintaan registrasi telah dikirim ke dokter untuk konfirmasi. Silakan tunggu persetujuan.",
                ),
                Err(e) => flash_error(&mut session, e)?,
            }
            Ok((session, Redirect::to("/login")).into_response())
        }
        Err(e) => {
            flash_error(&mut session, e)?;
            render_page(&state, session, "register.html", context! { username })
        }
    }
}

pub async fn confirm(
    State(state): State<AppState>,
    mut session: Session,
    Path(token): Path<String>,
) -> AppResult<Response> {
    let ttl = state.config.registration_ttl();
    match registration_service::confirm(&state.pool, &token, ttl, now_local()).await {
        Ok(nurse) => session.flash(
            FlashLevel::Success,
            format!("Registrasi untuk {} telah disetujui!", nurse.username),
        ),
        Err(e) => flash_error(&mut session, e)?,
    }
    Ok((session, Redirect::to("/login")).into_response())
}

pub async fn login_form(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    render_page(&state, session, "login.html", context! { username => "" })
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(req): Form<LoginReq>,
) -> AppResult<Response> {
    let username = req.username.trim();
    let password = req.password.trim();
    if username.is_empty() || password.is_empty() {
        session.flash(FlashLevel::Danger, "Username atau password salah!");
        return render_page(&state, session, "login.html", context! { username });
    }

    match auth_service::verify_nurse(&state.pool, username, password).await {
        Ok(Some(nurse)) => {
            session.login_nurse(&nurse.username);
            tracing::info!(nurse = %nurse.username, "login");
            Ok(flash_redirect(session, FlashLevel::Success, "Login berhasil!", "/nurse"))
        }
        Ok(None) => {
            tracing::debug!(username, "login rejected");
            session.flash(FlashLevel::Danger, "Username atau password salah!");
            render_page(&state, session, "login.html", context! { username })
        }
        Err(e) => {
            flash_error(&mut session, e)?;
            render_page(&state, session, "login.html", context! { username })
        }
    }
}
