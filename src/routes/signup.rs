//! Homebuyer registration via emailed token links.

use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;

use crate::auth::user::AuthSession;
use crate::error::{AppError, AppResult};
use crate::router::{AppState, render};
use crate::services::invites::{self, HomebuyerRegistration};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/signup/{registration_token}",
        get(signup_form).post(signup_submit),
    )
}

async fn signup_form(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Response> {
    let pending = invites::pending_for_token(state.db.as_ref(), &token).await?;
    Ok(render(
        &state,
        "signup.html",
        context! {
            error => (),
            token => token,
            email => pending.email,
            first_name => pending.first_name,
            last_name => pending.last_name,
        },
    )?
    .into_response())
}

async fn signup_submit(
    State(state): State<AppState>,
    mut auth_session: AuthSession,
    Path(token): Path<String>,
    Form(form): Form<HomebuyerRegistration>,
) -> AppResult<Response> {
    let user = match invites::register_homebuyer(state.db.as_ref(), &token, form).await {
        Ok(user) => user,
        Err(AppError::Validation(msg)) => {
            let pending = invites::pending_for_token(state.db.as_ref(), &token).await?;
            return Ok(render(
                &state,
                "signup.html",
                context! {
                    error => msg,
                    token => token,
                    email => pending.email,
                    first_name => pending.first_name,
                    last_name => pending.last_name,
                },
            )?
            .into_response());
        }
        Err(e) => return Err(e),
    };

    // The registration email stands in for a confirmation round trip, so
    // drop the new homebuyer straight into a session.
    auth_session
        .login(&user)
        .await
        .map_err(|e| AppError::integrity(format!("session login failed: {e}")))?;
    Ok(Redirect::to("/dashboard").into_response())
}
