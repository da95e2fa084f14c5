use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use std::sync::OnceLock;

use actix_web::{FromRequest, HttpRequest};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::types::Role;

/// The authenticated caller, passed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Owner-or-admin check shared by every component that guards user data.
pub fn authorize(principal: &Principal, owner_id: i64) -> Result<(), ServiceError> {
    if principal.user_id == owner_id || principal.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "The resource belongs to another user".to_owned(),
        ))
    }
}

pub fn require_admin(principal: &Principal) -> Result<(), ServiceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("Admin role required".to_owned()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user_id: i64, role: Role) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Principal, ServiceError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| ServiceError::Unauthorized("Malformed token subject".to_owned()))?;

        Ok(Principal {
            user_id,
            role: data.claims.role,
        })
    }
}

fn principal_from_request(req: &HttpRequest) -> Result<Principal, ServiceError> {
    let keys = req
        .app_data::<Data<JwtKeys>>()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication is not configured".to_owned()))?;

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Missing Authorization header".to_owned()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ServiceError::Unauthorized("Expected a Bearer token".to_owned()))?;

    keys.verify(token.trim())
}

impl FromRequest for Principal {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(principal_from_request(req))
    }
}

/// Argon2id PHC string (`$argon2id$v=19$...`), salt included.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut rand::thread_rng());

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();

    DUMMY.get_or_init(|| hash_password("no such account").unwrap_or_default())
}

/// Login check that costs one argon2 verification whether or not the account exists.
pub fn check_login(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(hash) => verify_password(password, hash),
        None => {
            verify_password(password, dummy_hash());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test as actix_test;
    use actix_web::{get, App, HttpResponse, Responder};

    use super::*;

    const ALICE: Principal = Principal { user_id: 1, role: Role::Customer };
    const BOB: Principal = Principal { user_id: 2, role: Role::Customer };
    const STAFF: Principal = Principal { user_id: 3, role: Role::Admin };

    #[test]
    fn owner_and_admin_are_authorized() {
        assert!(authorize(&ALICE, 1).is_ok());
        assert!(authorize(&STAFF, 1).is_ok());
        assert!(matches!(authorize(&BOB, 1), Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn admin_gate() {
        assert!(require_admin(&STAFF).is_ok());
        assert!(require_admin(&ALICE).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let stored = hash_password("correct horse").unwrap();

        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("correct horse!", &stored));
        assert!(!verify_password("correct horse", "garbage"));
        assert_ne!(stored, hash_password("correct horse").unwrap(), "salt must differ per hash");
    }

    #[test]
    fn login_check_without_account_fails() {
        let stored = hash_password("hunter22").unwrap();

        assert!(check_login("hunter22", Some(&stored)));
        assert!(!check_login("hunter22", None));
        assert!(!check_login("no such account", None));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        assert!(PasswordHash::new(dummy_hash()).is_ok());
    }

    #[test]
    fn token_carries_identity() {
        let keys = JwtKeys::new("test-secret", 5);
        let token = keys.issue(42, Role::Admin).unwrap();

        assert_eq!(
            keys.verify(&token).unwrap(),
            Principal { user_id: 42, role: Role::Admin }
        );
        assert!(JwtKeys::new("other-secret", 5).verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("test-secret", -10);
        let token = keys.issue(42, Role::Customer).unwrap();

        assert!(matches!(keys.verify(&token), Err(ServiceError::Token(_))));
    }

    #[get("/whoami")]
    async fn whoami(principal: Principal) -> impl Responder {
        HttpResponse::Ok().body(principal.user_id.to_string())
    }

    #[actix_web::test]
    async fn extractor_requires_bearer_token() {
        let keys = JwtKeys::new("test-secret", 5);
        let token = keys.issue(7, Role::Customer).unwrap();
        let app = actix_test::init_service(App::new().app_data(Data::new(keys)).service(whoami)).await;

        let req = actix_test::TestRequest::get().uri("/whoami").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);

        let req = actix_test::TestRequest::get()
            .uri("/whoami")
            .insert_header((AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let body = actix_test::call_and_read_body(&app, req).await;
        assert_eq!(body, actix_web::web::Bytes::from_static(b"7"));
    }
}
