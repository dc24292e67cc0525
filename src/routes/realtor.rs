//! Realtor signup, email confirmation, and couple invitations.

use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use serde::Deserialize;

use crate::auth::user::AuthSession;
use crate::error::{AppError, AppResult};
use crate::router::{AppState, render};
use crate::services::{
    accounts::{self, RealtorSignup},
    invites::{self, Invitee},
    roles,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/realtor/signup",
            get(signup_form).post(signup_submit),
        )
        .route("/confirm/{token}", get(confirm))
        .route("/invite", get(invite_form).post(invite_submit))
}

#[derive(Debug, Deserialize)]
pub struct InviteForm {
    first_email: String,
    first_first_name: String,
    first_last_name: String,
    second_email: String,
    second_first_name: String,
    second_last_name: String,
}

async fn signup_form(State(state): State<AppState>) -> AppResult<Response> {
    Ok(render(&state, "realtor_signup.html", context! { error => () })?.into_response())
}

async fn signup_submit(
    State(state): State<AppState>,
    mut auth_session: AuthSession,
    Form(form): Form<RealtorSignup>,
) -> AppResult<Response> {
    let base_url = state.config.base_url.clone();
    let user =
        match accounts::create_realtor(state.db.as_ref(), state.mailer.as_ref(), &base_url, form.clone())
            .await
        {
            Ok(user) => user,
            Err(AppError::Validation(msg)) => {
                return Ok(render(
                    &state,
                    "realtor_signup.html",
                    context! {
                        error => msg,
                        email => form.email,
                        first_name => form.first_name,
                        last_name => form.last_name,
                        phone => form.phone,
                    },
                )?
                .into_response());
            }
            Err(e) => return Err(e),
        };

    auth_session
        .login(&user)
        .await
        .map_err(|e| AppError::integrity(format!("session login failed: {e}")))?;
    Ok(Redirect::to("/dashboard").into_response())
}

async fn confirm(State(state): State<AppState>, Path(token): Path<String>) -> AppResult<Response> {
    accounts::confirm_email(state.db.as_ref(), &token).await?;
    Ok(Redirect::to("/dashboard").into_response())
}

async fn invite_form(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    roles::require_realtor(state.db.as_ref(), user.id).await?;
    Ok(render(
        &state,
        "invite.html",
        context! { error => (), email_confirmed => user.email_confirmed },
    )?
    .into_response())
}

async fn invite_submit(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Form(form): Form<InviteForm>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let realtor = roles::require_realtor(state.db.as_ref(), user.id).await?;
    if !user.email_confirmed {
        return Ok(render(
            &state,
            "invite.html",
            context! {
                error => "Confirm your email address before inviting homebuyers",
                email_confirmed => false,
            },
        )?
        .into_response());
    }

    let first = Invitee {
        email: form.first_email,
        first_name: form.first_first_name,
        last_name: form.first_last_name,
    };
    let second = Invitee {
        email: form.second_email,
        first_name: form.second_first_name,
        last_name: form.second_last_name,
    };

    let result = invites::invite_couple(
        state.db.as_ref(),
        state.mailer.as_ref(),
        &state.config.base_url,
        &realtor,
        &user.full_name(),
        first,
        second,
    )
    .await;

    match result {
        Ok(_) => Ok(Redirect::to("/dashboard").into_response()),
        Err(AppError::Validation(msg)) => Ok(render(
            &state,
            "invite.html",
            context! { error => msg, email_confirmed => true },
        )?
        .into_response()),
        Err(e) => Err(e),
    }
}
