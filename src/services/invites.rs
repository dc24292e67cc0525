//! Couple invitations and homebuyer registration.
//!
//! A realtor invites two people at once; each gets a personal registration
//! token. Whoever registers first creates the Couple (seeded with the
//! starter categories), the second joins it, and the pending rows are
//! removed once both are in.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};

use crate::auth::password::{hash_password, validate_new_password};
use crate::email::EmailSender;
use crate::entities::{
    couple, homebuyer, pending_couple, pending_homebuyer, prelude::*, realtor, user,
};
use crate::error::{AppError, AppResult};
use crate::services::{catalog, tokens};

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Invitee {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct HomebuyerRegistration {
    pub phone: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

fn normalize_invitee(invitee: Invitee) -> AppResult<Invitee> {
    let email = invitee.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("A valid email address is required"));
    }
    let first_name = invitee.first_name.trim().to_string();
    let last_name = invitee.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    Ok(Invitee {
        email,
        first_name,
        last_name,
    })
}

async fn email_is_taken<C: ConnectionTrait>(db: &C, email: &str) -> AppResult<bool> {
    let user = User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    if user.is_some() {
        return Ok(true);
    }
    let pending = PendingHomebuyer::find()
        .filter(pending_homebuyer::Column::Email.eq(email))
        .one(db)
        .await?;
    Ok(pending.is_some())
}

/// Invite a pair of homebuyers on behalf of a realtor.
///
/// Both invitation emails go out inside the transaction; if either send
/// fails the pending rows are rolled back and the realtor can retry.
pub async fn invite_couple<C, M>(
    db: &C,
    mailer: &M,
    base_url: &str,
    realtor: &realtor::Model,
    realtor_name: &str,
    first: Invitee,
    second: Invitee,
) -> AppResult<pending_couple::Model>
where
    C: ConnectionTrait + TransactionTrait,
    M: EmailSender + ?Sized,
{
    let first = normalize_invitee(first)?;
    let second = normalize_invitee(second)?;
    if first.email == second.email {
        return Err(AppError::validation("Emails must be distinct"));
    }
    for invitee in [&first, &second] {
        if email_is_taken(db, &invitee.email).await? {
            return Err(AppError::validation(
                "A user with this email already exists or has been invited",
            ));
        }
    }

    let txn = db.begin().await?;

    let now = Utc::now().naive_utc();
    let pending = pending_couple::ActiveModel {
        realtor_id: Set(realtor.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for invitee in [&first, &second] {
        let token = tokens::unique_registration_token(&txn).await?;
        pending_homebuyer::ActiveModel {
            pending_couple_id: Set(pending.id),
            email: Set(invitee.email.clone()),
            first_name: Set(invitee.first_name.clone()),
            last_name: Set(invitee.last_name.clone()),
            registration_token: Set(token.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let signup_url = format!("{base_url}/signup/{token}");
        mailer
            .send_invite(&invitee.email, &invitee.first_name, realtor_name, &signup_url)
            .map_err(AppError::Email)?;
    }

    txn.commit().await?;

    tracing::info!(pending_couple_id = pending.id, "couple invited");
    Ok(pending)
}

/// Look up the invitation behind a registration token, for the signup page.
pub async fn pending_for_token<C: ConnectionTrait>(
    db: &C,
    token: &str,
) -> AppResult<pending_homebuyer::Model> {
    let pending = PendingHomebuyer::find()
        .filter(pending_homebuyer::Column::RegistrationToken.eq(token))
        .one(db)
        .await?
        .ok_or(AppError::InvalidLink)?;

    // A consumed invitation leaves its row in place until the partner also
    // registers, so treat a token whose email already has an account as spent.
    let already = User::find()
        .filter(user::Column::Email.eq(&pending.email))
        .one(db)
        .await?;
    if already.is_some() {
        return Err(AppError::InvalidLink);
    }
    Ok(pending)
}

/// Where the partner has already registered, find their couple.
async fn partner_couple_id<C: ConnectionTrait>(
    db: &C,
    me: &pending_homebuyer::Model,
) -> AppResult<Option<i32>> {
    let siblings = PendingHomebuyer::find()
        .filter(pending_homebuyer::Column::PendingCoupleId.eq(me.pending_couple_id))
        .filter(pending_homebuyer::Column::Id.ne(me.id))
        .all(db)
        .await?;

    for sibling in &siblings {
        let Some(partner_user) = User::find()
            .filter(user::Column::Email.eq(&sibling.email))
            .one(db)
            .await?
        else {
            continue;
        };
        let Some(partner_hb) = Homebuyer::find()
            .filter(homebuyer::Column::UserId.eq(partner_user.id))
            .one(db)
            .await?
        else {
            return Err(AppError::integrity(format!(
                "registered invitee {} has no homebuyer row",
                partner_user.id
            )));
        };
        return Ok(Some(partner_hb.couple_id));
    }
    Ok(None)
}

/// Turn a registration token into a real User and Homebuyer.
pub async fn register_homebuyer<C>(
    db: &C,
    token: &str,
    form: HomebuyerRegistration,
) -> AppResult<user::Model>
where
    C: ConnectionTrait + TransactionTrait,
{
    let pending = pending_for_token(db, token).await?;
    validate_new_password(&form.password, &form.password_confirmation)?;
    let password_hash = hash_password(&form.password)?;

    let pending_parent = pending
        .find_related(PendingCouple)
        .one(db)
        .await?
        .ok_or_else(|| {
            AppError::integrity(format!("pending homebuyer {} has no pending couple", pending.id))
        })?;

    let txn = db.begin().await?;

    let now = Utc::now().naive_utc();
    let confirmation_token = tokens::unique_confirmation_token(&txn).await?;
    // The invitation email already proved ownership of the address.
    let new_user = user::ActiveModel {
        email: Set(pending.email.clone()),
        password_hash: Set(password_hash),
        first_name: Set(pending.first_name.clone()),
        last_name: Set(pending.last_name.clone()),
        phone: Set(form.phone.filter(|p| !p.trim().is_empty())),
        is_staff: Set(false),
        is_active: Set(true),
        confirmation_token: Set(confirmation_token),
        email_confirmed: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let couple_id = match partner_couple_id(&txn, &pending).await? {
        Some(id) => id,
        None => {
            let new_couple = couple::ActiveModel {
                realtor_id: Set(pending_parent.realtor_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            catalog::seed_default_categories(&txn, new_couple.id).await?;
            new_couple.id
        }
    };

    let members = Homebuyer::find()
        .filter(homebuyer::Column::CoupleId.eq(couple_id))
        .count(&txn)
        .await?;
    if members >= 2 {
        return Err(AppError::integrity(format!(
            "couple {couple_id} already has two homebuyers"
        )));
    }

    let hb = homebuyer::ActiveModel {
        user_id: Set(new_user.id),
        couple_id: Set(couple_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    catalog::backfill_for_homebuyer(&txn, &hb).await?;

    // Once the couple is complete the pending rows have served their purpose.
    if members + 1 >= 2 {
        PendingHomebuyer::delete_many()
            .filter(pending_homebuyer::Column::PendingCoupleId.eq(pending_parent.id))
            .exec(&txn)
            .await?;
        PendingCouple::delete_by_id(pending_parent.id).exec(&txn).await?;
    }

    txn.commit().await?;

    tracing::info!(user_id = new_user.id, couple_id, "homebuyer registered");
    Ok(new_user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::category;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingMailer {
        fn working() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn broken() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl EmailSender for RecordingMailer {
        fn send_invite(
            &self,
            email: &str,
            _first_name: &str,
            _realtor_name: &str,
            signup_url: &str,
        ) -> Result<(), String> {
            if self.fail {
                return Err("connection refused".to_string());
            }
            self.sent
                .lock()
                .unwrap()
                .push(format!("{email} {signup_url}"));
            Ok(())
        }

        fn send_confirmation(
            &self,
            email: &str,
            _first_name: &str,
            confirm_url: &str,
        ) -> Result<(), String> {
            if self.fail {
                return Err("connection refused".to_string());
            }
            self.sent
                .lock()
                .unwrap()
                .push(format!("{email} {confirm_url}"));
            Ok(())
        }
    }

    fn ts() -> chrono::NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn realtor_row() -> realtor::Model {
        realtor::Model {
            id: 2,
            user_id: 9,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn pending_couple_row() -> pending_couple::Model {
        pending_couple::Model {
            id: 5,
            realtor_id: 2,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn pending_row(id: i32, email: &str, token: &str) -> pending_homebuyer::Model {
        pending_homebuyer::Model {
            id,
            pending_couple_id: 5,
            email: email.to_string(),
            first_name: "Pat".to_string(),
            last_name: "Jones".to_string(),
            registration_token: token.to_string(),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn user_row(id: i32, email: &str) -> user::Model {
        user::Model {
            id,
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Pat".to_string(),
            last_name: "Jones".to_string(),
            phone: None,
            is_staff: false,
            is_active: true,
            confirmation_token: format!("conf-{id}"),
            email_confirmed: true,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn couple_row() -> couple::Model {
        couple::Model {
            id: 42,
            realtor_id: 2,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn homebuyer_row(id: i32, user_id: i32) -> homebuyer::Model {
        homebuyer::Model {
            id,
            user_id,
            couple_id: 42,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn category_row(id: i32, summary: &str) -> category::Model {
        category::Model {
            id,
            couple_id: 42,
            summary: summary.to_string(),
            description: String::new(),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn member_count(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", sea_orm::Value::BigInt(Some(n)))])
    }

    fn registration() -> HomebuyerRegistration {
        HomebuyerRegistration {
            phone: None,
            password: "longenough".to_string(),
            password_confirmation: "longenough".to_string(),
        }
    }

    fn invitee(email: &str) -> Invitee {
        Invitee {
            email: email.to_string(),
            first_name: "Pat".to_string(),
            last_name: "Jones".to_string(),
        }
    }

    #[test]
    fn invitees_are_normalized() {
        let out = normalize_invitee(Invitee {
            email: " Pat@Example.COM ".to_string(),
            first_name: " Pat ".to_string(),
            last_name: " Jones ".to_string(),
        })
        .unwrap();
        assert_eq!(out.email, "pat@example.com");
        assert_eq!(out.first_name, "Pat");
        assert_eq!(out.last_name, "Jones");
    }

    #[test]
    fn invitees_need_real_fields() {
        assert!(normalize_invitee(invitee("not-an-email")).is_err());
        let mut nameless = invitee("pat@example.com");
        nameless.first_name = "  ".to_string();
        assert!(normalize_invitee(nameless).is_err());
    }

    #[tokio::test]
    async fn invitation_writes_pending_rows_and_emails_both() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // taken-checks for both emails, user then pending each
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            // pending couple insert
            .append_query_results([vec![pending_couple_row()]])
            // first token collision check and insert
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            .append_query_results([vec![pending_row(6, "amy@example.com", "tok-a")]])
            // second token collision check and insert
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            .append_query_results([vec![pending_row(7, "ben@example.com", "tok-b")]])
            .into_connection();
        let mailer = RecordingMailer::working();

        let pending = invite_couple(
            &db,
            &mailer,
            "http://localhost:3000",
            &realtor_row(),
            "Ray Alto",
            invitee("amy@example.com"),
            invitee("ben@example.com"),
        )
        .await
        .unwrap();
        assert_eq!(pending.id, 5);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("amy@example.com http://localhost:3000/signup/"));
        assert!(sent[1].starts_with("ben@example.com http://localhost:3000/signup/"));

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("BEGIN"));
        assert_eq!(log.matches(r#"INSERT INTO \"pending_homebuyer\""#).count(), 2);
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn failed_invite_email_aborts_the_invitation() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            .append_query_results([vec![pending_couple_row()]])
            .append_query_results([Vec::<pending_homebuyer::Model>::new()])
            .append_query_results([vec![pending_row(6, "amy@example.com", "tok-a")]])
            .into_connection();
        let mailer = RecordingMailer::broken();

        let err = invite_couple(
            &db,
            &mailer,
            "http://localhost:3000",
            &realtor_row(),
            "Ray Alto",
            invitee("amy@example.com"),
            invitee("ben@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Email(_)));

        // The pending rows never commit, so the realtor can retry cleanly.
        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn first_registration_creates_the_couple_and_keeps_pending_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // token lookup, then spent-token check
            .append_query_results([vec![pending_row(6, "amy@example.com", "tok-a")]])
            .append_query_results([Vec::<user::Model>::new()])
            // parent pending couple
            .append_query_results([vec![pending_couple_row()]])
            // confirmation token collision check
            .append_query_results([Vec::<user::Model>::new()])
            // user insert
            .append_query_results([vec![user_row(30, "amy@example.com")]])
            // sibling lookup; partner has no account yet
            .append_query_results([vec![pending_row(7, "ben@example.com", "tok-b")]])
            .append_query_results([Vec::<user::Model>::new()])
            // couple insert and its starter categories
            .append_query_results([vec![couple_row()]])
            .append_query_results([vec![category_row(50, "Location")]])
            .append_query_results([vec![category_row(51, "Price")]])
            // member count before attaching
            .append_query_results([vec![member_count(0)]])
            // homebuyer insert
            .append_query_results([vec![homebuyer_row(60, 30)]])
            // homebuyer backfill reads
            .append_query_results([Vec::<category::Model>::new()])
            .append_query_results([Vec::<crate::entities::house::Model>::new()])
            .into_connection();

        let user = register_homebuyer(&db, "tok-a", registration()).await.unwrap();
        assert_eq!(user.email, "amy@example.com");

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(r#"INSERT INTO \"couple\""#));
        assert_eq!(log.matches(r#"INSERT INTO \"category\""#).count(), 2);
        // The partner still needs their invitation.
        assert!(!log.contains("DELETE"));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn second_registration_reuses_the_couple_and_clears_pending_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pending_row(7, "ben@example.com", "tok-b")]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![pending_couple_row()]])
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([vec![user_row(31, "ben@example.com")]])
            // sibling already registered, with a homebuyer row
            .append_query_results([vec![pending_row(6, "amy@example.com", "tok-a")]])
            .append_query_results([vec![user_row(30, "amy@example.com")]])
            .append_query_results([vec![homebuyer_row(60, 30)]])
            // one member so far
            .append_query_results([vec![member_count(1)]])
            .append_query_results([vec![homebuyer_row(61, 31)]])
            // homebuyer backfill reads
            .append_query_results([Vec::<category::Model>::new()])
            .append_query_results([Vec::<crate::entities::house::Model>::new()])
            // pending homebuyers, then the pending couple itself
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        let user = register_homebuyer(&db, "tok-b", registration()).await.unwrap();
        assert_eq!(user.email, "ben@example.com");

        let log = format!("{:?}", db.into_transaction_log());
        assert!(!log.contains(r#"INSERT INTO \"couple\""#));
        assert!(log.contains(r#"DELETE FROM \"pending_homebuyer\""#));
        assert!(log.contains(r#"DELETE FROM \"pending_couple\""#));
        assert!(log.contains("COMMIT"));
    }
}
