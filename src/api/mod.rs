use aide::axum::ApiRouter;
use argon2rs::verifier::Encoded;
use rand::RngCore;

use crate::database::AppState;
use crate::error::{ServiceError, ServiceResult};

pub mod auth;
pub mod bonuses;
pub mod employees;
pub mod event_types;
pub mod events;
pub mod kudos;
pub mod notifications;
pub mod redemptions;
pub mod requests;
pub mod revenue;
pub mod rewards;
pub mod stores;

/// Setup all `/api/v1` routes
pub fn router(app_state: AppState) -> ApiRouter {
    ApiRouter::new()
        .merge(auth::router(app_state.clone()))
        .merge(employees::router(app_state.clone()))
        .merge(event_types::router(app_state.clone()))
        .merge(events::router(app_state.clone()))
        .merge(requests::router(app_state.clone()))
        .merge(rewards::router(app_state.clone()))
        .merge(redemptions::router(app_state.clone()))
        .merge(kudos::router(app_state.clone()))
        .merge(bonuses::router(app_state.clone()))
        .merge(revenue::router(app_state.clone()))
        .merge(notifications::router(app_state.clone()))
        .merge(stores::router(app_state))
}

pub fn password_hash_create(password: &str) -> ServiceResult<Vec<u8>> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = Encoded::default2i(password.as_bytes(), &salt, b"", b"");
    Ok(hash.to_u8())
}

pub fn password_hash_verify(hash: &[u8], password: &str) -> ServiceResult<bool> {
    let encoded = Encoded::from_u8(hash)
        .map_err(|_| ServiceError::InternalServerError("Invalid password hash!".to_string()))?;

    Ok(encoded.verify(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = password_hash_create("secret-password").unwrap();

        assert!(password_hash_verify(&hash, "secret-password").unwrap());
        assert!(!password_hash_verify(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn password_hashes_are_salted() {
        let a = password_hash_create("secret-password").unwrap();
        let b = password_hash_create("secret-password").unwrap();

        assert_ne!(a, b);
    }
}
