use serde::Serialize;

use crate::models::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingField,
    InvalidValue,
    InvalidEnum,
    InvalidState,
    NotFound,
    Conflict,
    Storage,
}

/// Failure of a domain operation. Every variant names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("{field}: {source}")]
    InvalidEnum {
        field: &'static str,
        source: UnknownVariant,
    },
    #[error("{field}: {reason}")]
    InvalidState { field: &'static str, reason: String },
    #[error("{field}: no record matches {key}")]
    NotFound { field: &'static str, key: String },
    #[error("{field}: {reason}")]
    Conflict { field: &'static str, reason: String },
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

impl DomainError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(field: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            field,
            key: key.to_string(),
        }
    }

    pub fn conflict(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::MissingField { .. } => ErrorKind::MissingField,
            DomainError::InvalidValue { .. } => ErrorKind::InvalidValue,
            DomainError::InvalidEnum { .. } => ErrorKind::InvalidEnum,
            DomainError::InvalidState { .. } => ErrorKind::InvalidState,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict { .. } => ErrorKind::Conflict,
            DomainError::Storage { .. } => ErrorKind::Storage,
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            DomainError::MissingField { field }
            | DomainError::InvalidValue { field, .. }
            | DomainError::InvalidEnum { field, .. }
            | DomainError::InvalidState { field, .. }
            | DomainError::NotFound { field, .. }
            | DomainError::Conflict { field, .. } => Some(field),
            DomainError::Storage { .. } => None,
        }
    }
}

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{entity} {id} was modified concurrently")]
    VersionConflict { entity: &'static str, id: i64 },
    #[error("{field} {value:?} already exists")]
    Duplicate { field: &'static str, value: String },
    #[error("storage backend unavailable: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => DomainError::not_found(entity, id),
            StoreError::VersionConflict { entity, .. } => {
                DomainError::conflict(entity, "record was modified concurrently, reload and retry")
            }
            StoreError::Duplicate { field, value } => {
                DomainError::conflict(field, format!("{value:?} is already taken"))
            }
            StoreError::Backend(reason) => DomainError::Storage { reason },
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
