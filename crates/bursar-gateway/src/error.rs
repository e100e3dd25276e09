use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bursar_core::{DomainError, ErrorKind};
use serde::Serialize;

/// Every failure a handler can return, rendered as `{"error": {kind, field, message}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{message}")]
    Malformed {
        status: StatusCode,
        field: &'static str,
        message: String,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Serialize)]
struct ErrorDetails {
    kind: &'static str,
    field: Option<&'static str>,
    message: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingField
        | ErrorKind::InvalidValue
        | ErrorKind::InvalidEnum
        | ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::MissingField => "missing_field",
        ErrorKind::InvalidValue => "invalid_value",
        ErrorKind::InvalidEnum => "invalid_enum",
        ErrorKind::InvalidState => "invalid_state",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Conflict => "conflict",
        ErrorKind::Storage => "storage",
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => status_for(err.kind()),
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Malformed { status, .. } => *status,
        }
    }

    fn details(&self) -> ErrorDetails {
        match self {
            ApiError::Domain(err) => ErrorDetails {
                kind: kind_name(err.kind()),
                field: err.field(),
                message: err.to_string(),
            },
            ApiError::Unauthorized(message) => ErrorDetails {
                kind: "unauthorized",
                field: Some(crate::actor::STAFF_HEADER),
                message: message.clone(),
            },
            ApiError::Malformed { field, message, .. } => ErrorDetails {
                kind: kind_name(ErrorKind::InvalidValue),
                field: Some(field),
                message: message.clone(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed {
            status: rejection.status(),
            field: "body",
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            field: "query",
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed {
            status: StatusCode::NOT_FOUND,
            field: "path",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = self.details();

        if status.is_server_error() {
            tracing::error!(error = %details.message, kind = details.kind, "request failed");
        } else {
            tracing::debug!(
                error = %details.message,
                kind = details.kind,
                field = ?details.field,
                "request rejected"
            );
        }

        (status, Json(ErrorBody { error: details })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
