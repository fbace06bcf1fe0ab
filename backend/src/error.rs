//! The service-wide error taxonomy and its HTTP mapping.
//!
//! Every handler returns `Result<_, ServiceError>`; the `ResponseError` impl
//! turns each variant into the status code the caller expects. Generation
//! failures mostly do not travel this path at all: the generation engine
//! records them as `FAILURE` documents and returns the record.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use log::error;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad caller input: unknown ids, a profile that belongs to another
    /// template, blank denial comments, a malformed upload. Rejected before
    /// any file I/O happens.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Generation was attempted while required staff inputs are missing.
    /// Carries the variable names so the operator can be prompted.
    #[error("unresolved variables: {}", .0.join(", "))]
    UnresolvedVariables(Vec<String>),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A transition on an approval that already left `PENDING`.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Template parse, repeat-data or file-write trouble inside the
    /// generation engine.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The remote mirror rejected a write after local generation succeeded.
    /// Degraded to a warning on the document record, never an HTTP error.
    #[error("remote storage failed: {0}")]
    RemoteStorage(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("blocking task failed: {0}")]
    Blocking(String),
}

impl From<actix_web::error::BlockingError> for ServiceError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        ServiceError::Blocking(err.to_string())
    }
}

impl actix_web::ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Configuration(_) => StatusCode::BAD_REQUEST,
            ServiceError::UnresolvedVariables(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {}", self);
        }
        match self {
            ServiceError::UnresolvedVariables(variables) => {
                HttpResponse::build(self.status_code()).json(serde_json::json!({
                    "error": "unresolved variables",
                    "variables": variables,
                }))
            }
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": self.to_string(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ServiceError::Configuration("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::UnresolvedVariables(vec!["judge".into()]).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::NotFound("template").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Conflict("already decided".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Generation("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unresolved_message_lists_variable_names() {
        let err = ServiceError::UnresolvedVariables(vec!["judge".into(), "county".into()]);
        assert_eq!(err.to_string(), "unresolved variables: judge, county");
    }
}
