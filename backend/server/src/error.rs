use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{msg}")]
    Rejected { status: StatusCode, msg: &'static str },

    #[error("{0}")]
    NotFound(String),

    #[error("Malformed payload")]
    MalformedPayload,

    /// An extractor turned the request away before any handler code ran.
    #[error("{msg}")]
    InvalidRequest { status: StatusCode, msg: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn bad_request(msg: &'static str) -> Self {
        Self::Rejected {
            status: StatusCode::BAD_REQUEST,
            msg,
        }
    }

    pub fn unprocessable(msg: &'static str) -> Self {
        Self::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            msg,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Rejected { status, .. } => *status,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest { status, .. } => *status,
            AppError::Database(e) if is_foreign_key_violation(e) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Database internals never leave the server.
    pub fn msg(&self) -> String {
        match self {
            AppError::Database(e) if is_foreign_key_violation(e) => "Resource not found".to_string(),
            AppError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest {
            status: rejection.status(),
            msg: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest {
            status: rejection.status(),
            msg: rejection.body_text(),
        }
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("{self}");
        }

        (status, Json(json!({ "msg": self.msg() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::Query, http::Uri};

    use super::*;

    #[test]
    fn test_rejection_status_and_message() {
        let err = AppError::unprocessable("Votes must be an number!");

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.msg(), "Votes must be an number!");
    }

    #[test]
    fn test_not_found() {
        let err = AppError::not_found("Article not found");

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.msg(), "Article not found");
    }

    #[test]
    fn test_database_errors_are_hidden() {
        let err = AppError::from(sqlx::Error::RowNotFound);

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.msg(), "Internal server error");
    }

    #[test]
    fn test_query_rejection_keeps_status_and_reason() {
        #[derive(Debug, serde::Deserialize)]
        struct TopicQuery {
            #[allow(dead_code)]
            topic: Option<String>,
        }

        let uri: Uri = "/api/articles?topic=a&topic=b".parse().unwrap();
        let rejection = Query::<TopicQuery>::try_from_uri(&uri).unwrap_err();
        let err = AppError::from(rejection);

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.msg().contains("duplicate field `topic`"), "{}", err.msg());
    }

    #[tokio::test]
    async fn test_response_body() {
        let response = AppError::MalformedPayload.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body, json!({ "msg": "Malformed payload" }));
    }
}
