//! Realtor signup and email confirmation.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::auth::password::{hash_password, validate_new_password};
use crate::email::EmailSender;
use crate::entities::{prelude::*, realtor, user};
use crate::error::{AppError, AppResult};
use crate::services::tokens;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct RealtorSignup {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("A valid email address is required"));
    }
    Ok(email)
}

/// Create a User plus its Realtor row and send the confirmation email.
///
/// The email goes out inside the transaction, so a send failure leaves no
/// half-created account behind.
pub async fn create_realtor<C, M>(
    db: &C,
    mailer: &M,
    base_url: &str,
    form: RealtorSignup,
) -> AppResult<user::Model>
where
    C: ConnectionTrait + TransactionTrait,
    M: EmailSender + ?Sized,
{
    let email = normalize_email(&form.email)?;
    let first_name = form.first_name.trim().to_string();
    let last_name = form.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    validate_new_password(&form.password, &form.password_confirmation)?;

    let existing = User::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::validation(
            "A user with this email already exists",
        ));
    }

    let password_hash = hash_password(&form.password)?;

    let txn = db.begin().await?;

    let token = tokens::unique_confirmation_token(&txn).await?;
    let now = Utc::now().naive_utc();
    let new_user = user::ActiveModel {
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        first_name: Set(first_name.clone()),
        last_name: Set(last_name),
        phone: Set(form.phone.filter(|p| !p.trim().is_empty())),
        is_staff: Set(false),
        is_active: Set(true),
        confirmation_token: Set(token.clone()),
        email_confirmed: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    realtor::ActiveModel {
        user_id: Set(new_user.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let confirm_url = format!("{base_url}/confirm/{token}");
    mailer
        .send_confirmation(&email, &first_name, &confirm_url)
        .map_err(AppError::Email)?;

    txn.commit().await?;

    tracing::info!(user_id = new_user.id, "realtor account created");
    Ok(new_user)
}

/// Mark the account behind a confirmation token as confirmed.
pub async fn confirm_email<C: ConnectionTrait>(db: &C, token: &str) -> AppResult<user::Model> {
    let user = User::find()
        .filter(user::Column::ConfirmationToken.eq(token))
        .one(db)
        .await?
        .ok_or(AppError::InvalidLink)?;

    if user.email_confirmed {
        return Ok(user);
    }

    let mut active: user::ActiveModel = user.into();
    active.email_confirmed = Set(true);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(
            normalize_email("  Agent@Example.COM ").unwrap(),
            "agent@example.com"
        );
        assert!(normalize_email("   ").is_err());
        assert!(normalize_email("not-an-email").is_err());
    }
}
