//! JSON API with JWT bearer authentication.
//!
//! Domain failures come back as an HTTP 200 envelope of `{code, message}`
//! with a small fixed vocabulary; only authentication failures use an HTTP
//! status. Success responses carry code 101 plus the payload.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::password::verify_password;
use crate::entities::{homebuyer, prelude::*, user};
use crate::error::{AppError, AppResult};
use crate::router::AppState;
use crate::services::{catalog, roles};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

pub const CODE_SUCCESS: u16 = 101;
pub const CODE_NOT_HOMEBUYER: u16 = 201;
pub const CODE_UNKNOWN_HOUSE: u16 = 202;
pub const CODE_NOT_OWNED: u16 = 203;
pub const CODE_CATEGORY_MISMATCH: u16 = 204;
pub const CODE_MALFORMED: u16 = 300;

const TOKEN_TTL_SECS: i64 = 3600;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth", post(obtain_token))
        .route("/api/refresh", post(refresh_token))
        .route("/api/get-user", get(get_user))
        .route("/api/houses", get(list_houses).post(create_house).put(grade_house))
        .route("/api/categories", get(list_categories).put(set_weight))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct NewHouse {
    nickname: String,
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
pub struct GradeUpdate {
    house_id: i32,
    category_id: i32,
    score: i16,
}

#[derive(Debug, Deserialize)]
pub struct WeightUpdate {
    category_id: i32,
    weight: i16,
}

fn failure(code: u16, message: &str) -> Response {
    Json(json!({ "code": code, "message": message })).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid or missing token" })),
    )
        .into_response()
}

fn issue_token(secret: &str, user: &user::Model) -> AppResult<(String, i64)> {
    let exp = Utc::now().timestamp() + TOKEN_TTL_SECS;
    let claims = Claims {
        user_id: user.id,
        email: user.email.clone(),
        exp,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::integrity(format!("token encoding failed: {e}")))?;
    Ok((token, exp))
}

fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Resolve the bearer token on a request into a user, or an early 401.
async fn bearer_user(state: &AppState, headers: &HeaderMap) -> Result<user::Model, Response> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;
    let claims =
        decode_token(&state.config.secret_key, token).ok_or_else(unauthorized)?;

    match User::find_by_id(claims.user_id).one(state.db.as_ref()).await {
        Ok(Some(user)) if user.is_active => Ok(user),
        Ok(_) => Err(unauthorized()),
        Err(e) => Err(AppError::from(e).into_response()),
    }
}

/// The data endpoints are homebuyer-only; everyone else gets code 201.
async fn api_homebuyer(
    state: &AppState,
    user_id: i32,
) -> AppResult<Result<homebuyer::Model, Response>> {
    match roles::require_homebuyer(state.db.as_ref(), user_id).await {
        Ok(hb) => Ok(Ok(hb)),
        Err(AppError::Forbidden) => Ok(Err(failure(
            CODE_NOT_HOMEBUYER,
            "User is not a homebuyer",
        ))),
        Err(e) => Err(e),
    }
}

async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Ok(Json(req)) = payload else {
        return Ok(failure(CODE_MALFORMED, "Malformed request body"));
    };

    let user = User::find()
        .filter(user::Column::Email.eq(req.email.trim().to_lowercase()))
        .filter(user::Column::IsActive.eq(true))
        .one(state.db.as_ref())
        .await?;
    let Some(user) = user else {
        return Ok(unauthorized());
    };
    if !verify_password(&req.password, &user.password_hash)? {
        return Ok(unauthorized());
    }

    let (token, exp) = issue_token(&state.config.secret_key, &user)?;
    Ok(Json(json!({ "code": CODE_SUCCESS, "token": token, "expires": exp })).into_response())
}

async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Ok(Json(req)) = payload else {
        return Ok(failure(CODE_MALFORMED, "Malformed request body"));
    };
    let Some(claims) = decode_token(&state.config.secret_key, &req.token) else {
        return Ok(unauthorized());
    };
    let user = User::find_by_id(claims.user_id).one(state.db.as_ref()).await?;
    let Some(user) = user.filter(|u| u.is_active) else {
        return Ok(unauthorized());
    };

    let (token, exp) = issue_token(&state.config.secret_key, &user)?;
    Ok(Json(json!({ "code": CODE_SUCCESS, "token": token, "expires": exp })).into_response())
}

/// Identity check. Only homebuyers may use the API beyond token handling.
async fn get_user(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let user = match bearer_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    if let Err(resp) = api_homebuyer(&state, user.id).await? {
        return Ok(resp);
    }

    Ok(Json(json!({
        "code": CODE_SUCCESS,
        "user_id": user.id,
        "email": user.email,
        "firstname": user.first_name,
        "lastname": user.last_name,
    }))
    .into_response())
}

async fn list_houses(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let user = match bearer_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let hb = match api_homebuyer(&state, user.id).await? {
        Ok(hb) => hb,
        Err(resp) => return Ok(resp),
    };

    let houses: Vec<_> = catalog::houses_for_couple(state.db.as_ref(), hb.couple_id)
        .await?
        .into_iter()
        .map(|h| json!({ "id": h.id, "nickname": h.nickname, "address": h.address }))
        .collect();
    Ok(Json(json!({ "code": CODE_SUCCESS, "houses": houses })).into_response())
}

async fn create_house(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NewHouse>, JsonRejection>,
) -> AppResult<Response> {
    let user = match bearer_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let hb = match api_homebuyer(&state, user.id).await? {
        Ok(hb) => hb,
        Err(resp) => return Ok(resp),
    };
    let Ok(Json(req)) = payload else {
        return Ok(failure(CODE_MALFORMED, "Malformed request body"));
    };

    match catalog::create_house(state.db.as_ref(), hb.couple_id, &req.nickname, &req.address).await {
        Ok(house) => Ok(Json(json!({
            "code": CODE_SUCCESS,
            "house": { "id": house.id, "nickname": house.nickname, "address": house.address },
        }))
        .into_response()),
        Err(AppError::Validation(msg)) => Ok(failure(CODE_MALFORMED, &msg)),
        Err(e) => Err(e),
    }
}

async fn grade_house(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GradeUpdate>, JsonRejection>,
) -> AppResult<Response> {
    let user = match bearer_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let hb = match api_homebuyer(&state, user.id).await? {
        Ok(hb) => hb,
        Err(resp) => return Ok(resp),
    };
    let Ok(Json(req)) = payload else {
        return Ok(failure(CODE_MALFORMED, "Malformed request body"));
    };

    let house = House::find_by_id(req.house_id).one(state.db.as_ref()).await?;
    let Some(house) = house else {
        return Ok(failure(CODE_UNKNOWN_HOUSE, "No such house"));
    };
    if house.couple_id != hb.couple_id {
        return Ok(failure(CODE_NOT_OWNED, "House belongs to another couple"));
    }

    match catalog::set_grade(state.db.as_ref(), &hb, req.house_id, req.category_id, req.score).await {
        Ok(grade) => Ok(Json(json!({
            "code": CODE_SUCCESS,
            "grade": {
                "house_id": grade.house_id,
                "category_id": grade.category_id,
                "score": grade.score,
            },
        }))
        .into_response()),
        Err(AppError::NotFound) => Ok(failure(CODE_CATEGORY_MISMATCH, "No such category")),
        Err(AppError::Mismatch(msg)) => Ok(failure(CODE_CATEGORY_MISMATCH, &msg)),
        Err(AppError::Validation(msg)) => Ok(failure(CODE_MALFORMED, &msg)),
        Err(e) => Err(e),
    }
}

async fn list_categories(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let user = match bearer_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let hb = match api_homebuyer(&state, user.id).await? {
        Ok(hb) => hb,
        Err(resp) => return Ok(resp),
    };

    let categories: Vec<_> = catalog::categories_with_weights(state.db.as_ref(), &hb)
        .await?
        .into_iter()
        .map(|(cat, weight)| {
            json!({
                "id": cat.id,
                "summary": cat.summary,
                "description": cat.description,
                "weight": weight,
            })
        })
        .collect();
    Ok(Json(json!({ "code": CODE_SUCCESS, "categories": categories })).into_response())
}

async fn set_weight(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<WeightUpdate>, JsonRejection>,
) -> AppResult<Response> {
    let user = match bearer_user(&state, &headers).await {
        Ok(user) => user,
        Err(resp) => return Ok(resp),
    };
    let hb = match api_homebuyer(&state, user.id).await? {
        Ok(hb) => hb,
        Err(resp) => return Ok(resp),
    };
    let Ok(Json(req)) = payload else {
        return Ok(failure(CODE_MALFORMED, "Malformed request body"));
    };

    match catalog::set_weight(state.db.as_ref(), &hb, req.category_id, req.weight).await {
        Ok(weight) => Ok(Json(json!({
            "code": CODE_SUCCESS,
            "weight": { "category_id": weight.category_id, "weight": weight.weight },
        }))
        .into_response()),
        Err(AppError::NotFound) => Ok(failure(CODE_CATEGORY_MISMATCH, "No such category")),
        Err(AppError::Mismatch(msg)) => Ok(failure(CODE_CATEGORY_MISMATCH, &msg)),
        Err(AppError::Validation(msg)) => Ok(failure(CODE_MALFORMED, &msg)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> user::Model {
        let now = Utc::now().naive_utc();
        user::Model {
            id: 9,
            email: "buyer@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Lee".to_string(),
            phone: None,
            is_staff: false,
            is_active: true,
            confirmation_token: "tok".to_string(),
            email_confirmed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tokens_round_trip() {
        let (token, exp) = issue_token("secret", &sample_user()).unwrap();
        let claims = decode_token("secret", &token).unwrap();
        assert_eq!(claims.user_id, 9);
        assert_eq!(claims.email, "buyer@example.com");
        assert_eq!(claims.exp, exp);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = issue_token("secret", &sample_user()).unwrap();
        assert!(decode_token("other-secret", &token).is_none());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        assert!(decode_token("secret", "not.a.jwt").is_none());
    }
}
