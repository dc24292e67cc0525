use axum::{
    Form, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde::Deserialize;

use super::password::{hash_password, validate_new_password, verify_password};
use super::user::{AuthSession, Credentials};
use crate::error::{AppError, AppResult};
use crate::router::{render, AppState};

// This allows us to extract the "next" field from the query string. We use
// this to redirect after log in.
#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeForm {
    current_password: String,
    new_password: String,
    new_password_confirmation: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(self::get::login).post(self::post::login))
        .route("/logout", get(self::get::logout))
        .route(
            "/password",
            get(self::get::password).post(self::post::password),
        )
}

mod get {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        auth_session: AuthSession,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> AppResult<Response> {
        if auth_session.user.is_some() {
            return Ok(Redirect::to("/dashboard").into_response());
        }
        Ok(render(
            &state,
            "login.html",
            context! { next => next, error => () },
        )?
        .into_response())
    }

    pub async fn logout(mut auth_session: AuthSession) -> AppResult<Response> {
        auth_session
            .logout()
            .await
            .map_err(|e| AppError::integrity(format!("logout failed: {e}")))?;
        Ok(Redirect::to("/login").into_response())
    }

    pub async fn password(
        State(state): State<AppState>,
        auth_session: AuthSession,
    ) -> AppResult<Response> {
        if auth_session.user.is_none() {
            return Ok(Redirect::to("/login").into_response());
        }
        Ok(render(&state, "password.html", context! { error => () })?.into_response())
    }
}

mod post {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Form(creds): Form<Credentials>,
    ) -> AppResult<Response> {
        let user = match auth_session.authenticate(creds.clone()).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                return Ok(render(
                    &state,
                    "login.html",
                    context! { next => creds.next, error => "Invalid email or password" },
                )?
                .into_response());
            }
            Err(e) => return Err(AppError::integrity(format!("authentication failed: {e}"))),
        };

        auth_session
            .login(&user)
            .await
            .map_err(|e| AppError::integrity(format!("session login failed: {e}")))?;

        let next = creds.next.filter(|n| n.starts_with('/'));
        Ok(Redirect::to(next.as_deref().unwrap_or("/dashboard")).into_response())
    }

    pub async fn password(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Form(form): Form<PasswordChangeForm>,
    ) -> AppResult<Response> {
        let Some(user) = auth_session.user.clone() else {
            return Ok(Redirect::to("/login").into_response());
        };

        if !verify_password(&form.current_password, &user.password_hash)? {
            return Ok(render(
                &state,
                "password.html",
                context! { error => "Current password is incorrect" },
            )?
            .into_response());
        }
        if let Err(e) = validate_new_password(&form.new_password, &form.new_password_confirmation) {
            return match e {
                AppError::Validation(msg) => {
                    Ok(render(&state, "password.html", context! { error => msg })?.into_response())
                }
                other => Err(other),
            };
        }

        let mut active = user.clone().into_active_model();
        active.password_hash = Set(hash_password(&form.new_password)?);
        active.updated_at = Set(chrono::Utc::now().naive_utc());
        let updated = active.update(state.db.as_ref()).await?;

        // The session hash tracks the password hash, so log back in.
        auth_session
            .login(&updated)
            .await
            .map_err(|e| AppError::integrity(format!("session refresh failed: {e}")))?;

        Ok(Redirect::to("/dashboard").into_response())
    }
}
