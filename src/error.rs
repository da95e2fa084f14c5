use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Dish {0} is currently unavailable")]
    DishUnavailable(i64),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(DieselError),
    #[error("Unable to get a database connection: {0}")]
    Pool(String),
    #[error("Unable to reach the database worker: {0}")]
    Mailbox(#[from] actix::MailboxError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Unauthorized(_) | ServiceError::Token(_) => "unauthorized",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::EmptyCart => "empty_cart",
            ServiceError::DishUnavailable(_) => "dish_unavailable",
            ServiceError::InvalidTransition(_) => "invalid_transition",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Database(_)
            | ServiceError::Pool(_)
            | ServiceError::Mailbox(_)
            | ServiceError::Hashing(_)
            | ServiceError::Task(_) => "internal",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }
}

// Row-level failures carry meaning for the caller; everything else stays opaque.
impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ServiceError::NotFound("Record".to_owned()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ServiceError::Conflict(info.message().to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                ServiceError::Conflict(info.message().to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                ServiceError::Validation(info.message().to_owned())
            }
            other => ServiceError::Database(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Unauthorized(_) | ServiceError::Token(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Validation(_) | ServiceError::EmptyCart => StatusCode::BAD_REQUEST,
            ServiceError::DishUnavailable(_)
            | ServiceError::InvalidTransition(_)
            | ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Database(_)
            | ServiceError::Pool(_)
            | ServiceError::Mailbox(_)
            | ServiceError::Hashing(_)
            | ServiceError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Unable to perform action".to_owned()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorBody {
            error: self.kind(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_is_not_found() {
        let err: ServiceError = DieselError::NotFound.into();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn unique_violation_is_conflict() {
        let err: ServiceError = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value".to_owned()),
        )
        .into();

        assert!(matches!(err, ServiceError::Conflict(ref msg) if msg == "duplicate key value"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ServiceError::EmptyCart.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::DishUnavailable(3).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::Forbidden("order".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::InvalidTransition("paid -> pending".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Pool("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Hashing("salt".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let resp = ServiceError::Pool("secret host".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
