use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;

use super::render_page;
use crate::error::AppResult;
use crate::services::patient_service;
use crate::session::{FlashLevel, Session};
use crate::AppState;

pub async fn landing(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    let patients = patient_service::active_patients(&state.pool).await?;
    render_page(&state, session, "landing.html", context! { patients })
}

pub async fn logout(mut session: Session) -> Response {
    if let Some(nurse) = session.nurse() {
        tracing::info!(nurse, "logout");
    }
    session.logout();
    session.flash(FlashLevel::Info, "Anda telah logout.");
    (session, Redirect::to("/")).into_response()
}
