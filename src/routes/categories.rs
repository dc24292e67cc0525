//! Category management and weighting, homebuyer only.

use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::context;
use serde::{Deserialize, Serialize};

use crate::auth::user::AuthSession;
use crate::error::AppResult;
use crate::router::{AppState, render};
use crate::services::{catalog, roles};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list).post(create))
        .route("/categories/{id}/update", post(update))
        .route("/categories/{id}/delete", post(delete))
        .route("/categories/{id}/weight", post(set_weight))
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    summary: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
pub struct WeightForm {
    weight: i16,
}

#[derive(Debug, Serialize)]
struct CategoryRow {
    id: i32,
    summary: String,
    description: String,
    weight: i16,
}

async fn list(State(state): State<AppState>, auth_session: AuthSession) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    let rows: Vec<CategoryRow> = catalog::categories_with_weights(state.db.as_ref(), &hb)
        .await?
        .into_iter()
        .map(|(cat, weight)| CategoryRow {
            id: cat.id,
            summary: cat.summary,
            description: cat.description,
            weight,
        })
        .collect();

    Ok(render(
        &state,
        "categories.html",
        context! {
            categories => minijinja::Value::from_serialize(&rows),
            weight_labels => minijinja::Value::from_serialize(&catalog::WEIGHT_LABELS),
        },
    )?
    .into_response())
}

async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    catalog::create_category(state.db.as_ref(), hb.couple_id, &form.summary, &form.description).await?;
    Ok(Redirect::to("/categories").into_response())
}

async fn update(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(category_id): Path<i32>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    catalog::update_category(
        state.db.as_ref(),
        hb.couple_id,
        category_id,
        &form.summary,
        &form.description,
    )
    .await?;
    Ok(Redirect::to("/categories").into_response())
}

async fn delete(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(category_id): Path<i32>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    catalog::delete_category(state.db.as_ref(), hb.couple_id, category_id).await?;
    Ok(Redirect::to("/categories").into_response())
}

async fn set_weight(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(category_id): Path<i32>,
    Form(form): Form<WeightForm>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    catalog::set_weight(state.db.as_ref(), &hb, category_id, form.weight).await?;
    Ok(Redirect::to("/categories").into_response())
}
