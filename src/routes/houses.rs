//! House management and per-house evaluation, homebuyer only.

use std::collections::HashMap;

use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::context;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};

use crate::auth::user::AuthSession;
use crate::entities::{homebuyer, house, prelude::*};
use crate::error::{AppError, AppResult};
use crate::router::{AppState, render};
use crate::services::{catalog, roles};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/houses", get(list).post(create))
        .route("/houses/{id}/delete", post(delete))
        .route("/house/{id}/eval", get(eval_form).post(eval_submit))
}

#[derive(Debug, Deserialize)]
pub struct HouseForm {
    nickname: String,
    #[serde(default)]
    address: String,
}

#[derive(Debug, Serialize)]
struct GradeRow {
    category_id: i32,
    summary: String,
    description: String,
    score: i16,
}

/// The evaluated house must belong to the homebuyer's couple. Grading
/// somebody else's house is a permission problem, not a missing page.
async fn owned_house(
    state: &AppState,
    hb: &homebuyer::Model,
    house_id: i32,
) -> AppResult<house::Model> {
    let house = House::find_by_id(house_id)
        .one(state.db.as_ref())
        .await?
        .ok_or(AppError::Forbidden)?;
    if house.couple_id != hb.couple_id {
        return Err(AppError::Forbidden);
    }
    Ok(house)
}

async fn list(State(state): State<AppState>, auth_session: AuthSession) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    let houses = catalog::houses_for_couple(state.db.as_ref(), hb.couple_id).await?;
    Ok(render(
        &state,
        "houses.html",
        context! { houses => minijinja::Value::from_serialize(&houses) },
    )?
    .into_response())
}

async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Form(form): Form<HouseForm>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    catalog::create_house(state.db.as_ref(), hb.couple_id, &form.nickname, &form.address).await?;
    Ok(Redirect::to("/houses").into_response())
}

async fn delete(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(house_id): Path<i32>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;

    catalog::delete_house(state.db.as_ref(), hb.couple_id, house_id).await?;
    Ok(Redirect::to("/houses").into_response())
}

async fn eval_form(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(house_id): Path<i32>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;
    let house = owned_house(&state, &hb, house_id).await?;

    let rows: Vec<GradeRow> = catalog::grades_for_house(state.db.as_ref(), &hb, house.id)
        .await?
        .into_iter()
        .map(|(cat, score)| GradeRow {
            category_id: cat.id,
            summary: cat.summary,
            description: cat.description,
            score,
        })
        .collect();

    Ok(render(
        &state,
        "house_eval.html",
        context! {
            house => minijinja::Value::from_serialize(&house),
            grades => minijinja::Value::from_serialize(&rows),
            score_labels => minijinja::Value::from_serialize(&catalog::SCORE_LABELS),
        },
    )?
    .into_response())
}

/// Form fields are keyed by category id; an absent field falls back to the
/// neutral score.
async fn eval_submit(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(house_id): Path<i32>,
    Form(fields): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    let Some(user) = auth_session.user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let hb = roles::require_homebuyer(state.db.as_ref(), user.id).await?;
    let house = owned_house(&state, &hb, house_id).await?;

    let categories = catalog::categories_for_couple(state.db.as_ref(), hb.couple_id).await?;
    for cat in &categories {
        let score = fields
            .get(&cat.id.to_string())
            .and_then(|v| v.trim().parse::<i16>().ok())
            .unwrap_or(catalog::DEFAULT_SCORE);
        catalog::set_grade(state.db.as_ref(), &hb, house.id, cat.id, score).await?;
    }

    Ok(Redirect::to(&format!("/house/{}/eval", house.id)).into_response())
}
