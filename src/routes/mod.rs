use axum::{
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use minijinja::{context, Value};

use crate::error::{AppError, AppResult};
use crate::session::{FlashLevel, Session};
use crate::templates::PRIORITY_LABELS;
use crate::AppState;

pub mod auth;
pub mod events;
pub mod nurse;
pub mod patients;
pub mod public;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::landing))
        .route("/logout", get(public::logout))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/confirm/:token", get(auth::confirm))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/nurse", get(nurse::dashboard).post(nurse::dashboard_post))
        .route(
            "/patient/:id",
            get(patients::detail).post(patients::detail_post),
        )
        .route("/patient/:id/report", get(patients::report))
        .route("/patient/view/:id", get(patients::view))
        .route(
            "/access/:id",
            get(patients::access_form).post(patients::access),
        )
        .route("/ws", get(events::ws_handler))
        .route("/events", get(events::sse_handler))
}

/// Render a page with the layout context (hospital name, nurse, pending flashes).
/// Flashes are consumed, so the session goes back out with the response.
pub(crate) fn render_page(
    state: &AppState,
    mut session: Session,
    template: &str,
    page: Value,
) -> AppResult<Response> {
    let flashes = session.take_flashes();
    let html = state.templates.render(
        template,
        context! {
            hospital_name => &state.config.hospital_name,
            nurse => session.nurse(),
            flashes,
            priority_labels => PRIORITY_LABELS,
            ..page
        },
    )?;
    Ok((session, html).into_response())
}

pub(crate) fn flash_redirect(
    mut session: Session,
    level: FlashLevel,
    message: impl Into<String>,
    to: &str,
) -> Response {
    session.flash(level, message);
    (session, Redirect::to(to)).into_response()
}

/// Queue the error as a flash when the user can act on it; anything else is returned.
pub(crate) fn flash_error(session: &mut Session, err: AppError) -> AppResult<()> {
    let level = match &err {
        AppError::DuplicateUsername {
            awaiting_approval: true,
        }
        | AppError::AuthRequired => FlashLevel::Warning,
        AppError::Validation(_)
        | AppError::DuplicateUsername { .. }
        | AppError::InvalidToken
        | AppError::Expired
        | AppError::NotFound
        | AppError::WrongAccessKey
        | AppError::MailDelivery(_)
        | AppError::PasswordVerification => FlashLevel::Danger,
        _ => return Err(err),
    };
    session.flash(level, err.user_message());
    Ok(())
}
