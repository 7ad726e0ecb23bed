//! Engine error → HTTP status mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::db::StoreError;
use crate::error::EngineError;

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Unauthorized(_) => StatusCode::FORBIDDEN,
            EngineError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Invalid(_) => StatusCode::BAD_REQUEST,
            EngineError::Store(StoreError::Contention(_)) => StatusCode::CONFLICT,
            EngineError::Internal(_) | EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("request failed: {self}");
            "internal error".to_owned()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_distinct_status() {
        let cases = [
            (EngineError::not_found("x"), 404),
            (EngineError::unauthorized("x"), 403),
            (EngineError::unauthenticated("x"), 401),
            (EngineError::conflict("x"), 409),
            (EngineError::invalid("x"), 400),
            (EngineError::Internal("x".into()), 500),
            (EngineError::Store(StoreError::Contention("x".into())), 409),
            (EngineError::Store(StoreError::Corrupt("x".into())), 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn duplicates_surface_as_conflict() {
        let err = EngineError::from(StoreError::Duplicate("membership"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "membership already exists");
    }
}
