//! Role-aware landing page.

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::auth::user::AuthSession;
use crate::entities::{couple, homebuyer, pending_couple, pending_homebuyer, prelude::*, realtor};
use crate::error::{AppError, AppResult};
use crate::router::{AppState, render};
use crate::services::{catalog, roles};

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
struct CoupleSummary {
    id: i32,
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PendingSummary {
    id: i32,
    invitees: Vec<String>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> AppResult<Response> {
    let Some(user) = auth_session.user.clone() else {
        return Ok(Redirect::to("/login").into_response());
    };

    match roles::role_object(state.db.as_ref(), user.id).await? {
        Some(roles::Role::Homebuyer(hb)) => homebuyer_home(&state, &user, &hb).await,
        Some(roles::Role::Realtor(r)) => realtor_home(&state, &user, &r).await,
        // A User row with no role attached should not happen outside of
        // manual database edits.
        None => Err(AppError::integrity(format!(
            "user {} has no homebuyer or realtor role",
            user.id
        ))),
    }
}

async fn homebuyer_home(
    state: &AppState,
    user: &crate::entities::user::Model,
    hb: &homebuyer::Model,
) -> AppResult<Response> {
    let partner_name = match roles::partner(state.db.as_ref(), hb).await? {
        Some(partner) => User::find_by_id(partner.user_id)
            .one(state.db.as_ref())
            .await?
            .map(|u| u.full_name()),
        None => None,
    };

    let houses = catalog::houses_for_couple(state.db.as_ref(), hb.couple_id).await?;

    Ok(render(
        state,
        "homebuyer_home.html",
        context! {
            user_name => user.full_name(),
            partner_name => partner_name,
            houses => minijinja::Value::from_serialize(&houses),
        },
    )?
    .into_response())
}

async fn realtor_home(
    state: &AppState,
    user: &crate::entities::user::Model,
    realtor: &realtor::Model,
) -> AppResult<Response> {
    let mut couples = Vec::new();
    for c in Couple::find()
        .filter(couple::Column::RealtorId.eq(realtor.id))
        .all(state.db.as_ref())
        .await?
    {
        let members = Homebuyer::find()
            .filter(homebuyer::Column::CoupleId.eq(c.id))
            .find_also_related(User)
            .all(state.db.as_ref())
            .await?
            .into_iter()
            .filter_map(|(_, u)| u.map(|u| u.full_name()))
            .collect();
        couples.push(CoupleSummary { id: c.id, members });
    }

    let mut pending = Vec::new();
    for pc in PendingCouple::find()
        .filter(pending_couple::Column::RealtorId.eq(realtor.id))
        .all(state.db.as_ref())
        .await?
    {
        let invitees = PendingHomebuyer::find()
            .filter(pending_homebuyer::Column::PendingCoupleId.eq(pc.id))
            .all(state.db.as_ref())
            .await?
            .into_iter()
            .map(|p| format!("{} {} <{}>", p.first_name, p.last_name, p.email))
            .collect();
        pending.push(PendingSummary {
            id: pc.id,
            invitees,
        });
    }

    Ok(render(
        state,
        "realtor_home.html",
        context! {
            user_name => user.full_name(),
            email_confirmed => user.email_confirmed,
            couples => minijinja::Value::from_serialize(&couples),
            pending => minijinja::Value::from_serialize(&pending),
        },
    )?
    .into_response())
}
