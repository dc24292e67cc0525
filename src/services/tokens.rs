//! Registration and confirmation token generation.
//!
//! Tokens are 64-character hex strings derived by hashing random data.
//! Uniqueness against the relevant column is enforced by retrying until no
//! collision exists; the unique index remains the authoritative guard.

use rand::RngCore;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use sha2::{Digest, Sha256};

use crate::entities::{pending_homebuyer, prelude::*, user};
use crate::error::AppResult;

pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(Sha256::digest(bytes))
}

/// Generate a registration token no PendingHomebuyer row currently uses.
pub async fn unique_registration_token<C: ConnectionTrait>(db: &C) -> AppResult<String> {
    loop {
        let token = random_token();
        let existing = PendingHomebuyer::find()
            .filter(pending_homebuyer::Column::RegistrationToken.eq(&token))
            .one(db)
            .await?;
        if existing.is_none() {
            return Ok(token);
        }
    }
}

/// Generate an email-confirmation token no User row currently uses.
pub async fn unique_confirmation_token<C: ConnectionTrait>(db: &C) -> AppResult<String> {
    loop {
        let token = random_token();
        let existing = User::find()
            .filter(user::Column::ConfirmationToken.eq(&token))
            .one(db)
            .await?;
        if existing.is_none() {
            return Ok(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = random_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_not_repeated() {
        assert_ne!(random_token(), random_token());
    }
}
