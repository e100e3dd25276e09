use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bursar_core::StaffActor;

use crate::error::ApiError;

/// Header set by the upstream auth proxy once the staff session is verified.
pub const STAFF_HEADER: &str = "x-staff-id";

/// Staff identity required by every mutating route.
#[derive(Debug, Clone, Copy)]
pub struct RequireStaff(pub StaffActor);

fn parse_staff_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(STAFF_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("{STAFF_HEADER} header is required")))?;

        raw.to_str()
            .ok()
            .and_then(parse_staff_id)
            .map(|staff_id| RequireStaff(StaffActor::new(staff_id)))
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("{STAFF_HEADER} must be a positive staff id"))
            })
    }
}
