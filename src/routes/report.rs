//! Combined report pages.
//!
//! A homebuyer sees their own couple's report; a realtor can pull up the
//! report for any couple they originated.

use axum::{
    Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;

use crate::auth::user::AuthSession;
use crate::error::AppResult;
use crate::router::{AppState, render};
use crate::services::{report, roles};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/report", get(own_report))
        .route("/report/{couple_id}", get(couple_report))
}

async fn render_report(state: &AppState, couple_id: i32) -> AppResult<Response> {
    let report = report::report_for_couple(state.db.as_ref(), couple_id).await?;
    Ok(render(
        state,
        "report.html",
        context! { report => minijinja::Value::from_serialize(&report) },
    )?
    .into_response())
}

async fn own_report(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;
    render_report(&state, hb.couple_id).await
}

async fn couple_report(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(couple_id): Path<i32>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let realtor = roles::require_realtor(state.db.as_ref(), user.id).await?;
    let couple = roles::couple_for_realtor(state.db.as_ref(), &realtor, couple_id).await?;
    render_report(&state, couple.id).await
}
