//! Role resolution and permission checks.
//!
//! A user is a Homebuyer or a Realtor, never both. The two side tables
//! each carry a unique `user_id`, so the double-role state should be
//! unreachable; it is still checked on every resolution and treated as an
//! internal integrity error rather than a user-facing message.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::{couple, homebuyer, prelude::*, realtor};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub enum Role {
    Homebuyer(homebuyer::Model),
    Realtor(realtor::Model),
}

impl Role {
    pub fn is_homebuyer(&self) -> bool {
        matches!(self, Role::Homebuyer(_))
    }

    pub fn is_realtor(&self) -> bool {
        matches!(self, Role::Realtor(_))
    }
}

/// Resolve the role attached to a user, if any.
pub async fn role_object<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<Option<Role>> {
    let homebuyer = Homebuyer::find()
        .filter(homebuyer::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    let realtor = Realtor::find()
        .filter(realtor::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    match (homebuyer, realtor) {
        (Some(_), Some(_)) => Err(AppError::integrity(format!(
            "user {user_id} is registered as both a homebuyer and a realtor"
        ))),
        (Some(hb), None) => Ok(Some(Role::Homebuyer(hb))),
        (None, Some(r)) => Ok(Some(Role::Realtor(r))),
        (None, None) => Ok(None),
    }
}

pub async fn require_homebuyer<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> AppResult<homebuyer::Model> {
    match role_object(db, user_id).await? {
        Some(Role::Homebuyer(hb)) => Ok(hb),
        _ => Err(AppError::Forbidden),
    }
}

pub async fn require_realtor<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<realtor::Model> {
    match role_object(db, user_id).await? {
        Some(Role::Realtor(r)) => Ok(r),
        _ => Err(AppError::Forbidden),
    }
}

/// The other homebuyer of the couple, or None while the partner has not
/// registered yet. Derived from the couple's homebuyer set rather than
/// stored, so it can never go stale.
pub async fn partner<C: ConnectionTrait>(
    db: &C,
    hb: &homebuyer::Model,
) -> AppResult<Option<homebuyer::Model>> {
    let others = Homebuyer::find()
        .filter(homebuyer::Column::CoupleId.eq(hb.couple_id))
        .filter(homebuyer::Column::Id.ne(hb.id))
        .all(db)
        .await?;
    if others.len() > 1 {
        return Err(AppError::integrity(format!(
            "couple {} has more than 2 homebuyers",
            hb.couple_id
        )));
    }
    Ok(others.into_iter().next())
}

/// A realtor may only touch couples they originated. A couple that does
/// not exist is reported the same way as one owned by somebody else.
pub async fn couple_for_realtor<C: ConnectionTrait>(
    db: &C,
    realtor: &realtor::Model,
    couple_id: i32,
) -> AppResult<couple::Model> {
    let couple = Couple::find_by_id(couple_id)
        .one(db)
        .await?
        .ok_or(AppError::Forbidden)?;
    if couple.realtor_id != realtor.id {
        return Err(AppError::Forbidden);
    }
    Ok(couple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn homebuyer_row() -> homebuyer::Model {
        let now = chrono::Utc::now().naive_utc();
        homebuyer::Model {
            id: 1,
            user_id: 7,
            couple_id: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn realtor_row() -> realtor::Model {
        let now = chrono::Utc::now().naive_utc();
        realtor::Model {
            id: 2,
            user_id: 7,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn resolves_homebuyer_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![homebuyer_row()]])
            .append_query_results([Vec::<realtor::Model>::new()])
            .into_connection();

        let role = role_object(&db, 7).await.unwrap().unwrap();
        assert!(role.is_homebuyer());
        assert!(!role.is_realtor());
    }

    #[tokio::test]
    async fn resolves_no_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<homebuyer::Model>::new()])
            .append_query_results([Vec::<realtor::Model>::new()])
            .into_connection();

        assert!(role_object(&db, 7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn both_roles_is_an_integrity_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![homebuyer_row()]])
            .append_query_results([vec![realtor_row()]])
            .into_connection();

        let err = role_object(&db, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Integrity(_)));
    }

    #[tokio::test]
    async fn require_homebuyer_rejects_realtors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<homebuyer::Model>::new()])
            .append_query_results([vec![realtor_row()]])
            .into_connection();

        let err = require_homebuyer(&db, 7).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}
