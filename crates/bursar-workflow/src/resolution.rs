//! Approve/decline decisions on open or pending applications.

use bursar_core::contracts::ResolutionRequest;
use bursar_core::{
    Application, ApplicationStatus, ApprovedTerms, DomainError, DomainResult, ResolutionWrite,
    TermFields,
};

use crate::validation::{check_term_coupling, parse_enum, parse_term_fields, require};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Approve(ApprovedTerms),
    Decline(ApplicationStatus),
}

impl Resolution {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            Resolution::Approve(_) => ApplicationStatus::Approved,
            Resolution::Decline(status) => *status,
        }
    }

    pub fn into_write(self) -> ResolutionWrite {
        match self {
            Resolution::Approve(terms) => ResolutionWrite {
                status: ApplicationStatus::Approved,
                terms: Some(terms),
            },
            Resolution::Decline(status) => ResolutionWrite {
                status,
                terms: None,
            },
        }
    }
}

fn raw_presence(request: &ResolutionRequest) -> [(&'static str, bool); 4] {
    let [university_id, start_date, tuition_amount, arrears_amount] = TermFields::NAMES;
    [
        (university_id, request.university_id.is_some()),
        (start_date, request.start_date.is_some()),
        (tuition_amount, request.tuition_amount.is_some()),
        (arrears_amount, request.arrears_amount.is_some()),
    ]
}

/// Turns a request into a decision without touching storage.
///
/// Presence is judged on the raw request before any value is parsed, so a
/// declined request carrying a malformed date still reports the field as not
/// allowed rather than as unparseable.
pub fn decide(request: &ResolutionRequest) -> DomainResult<Resolution> {
    let approve = require(request.approve, "approve")?;

    if !approve {
        if let Some((field, _)) = raw_presence(request).into_iter().find(|(_, present)| *present) {
            return Err(DomainError::invalid_state(
                field,
                "field must not be set when not approved",
            ));
        }

        let status = match request.status.as_deref() {
            Some(raw) => parse_enum::<ApplicationStatus>(raw, "status")?,
            None => ApplicationStatus::Denied,
        };
        if !status.is_declined_outcome() {
            return Err(DomainError::invalid_state(
                "status",
                format!("{status} is not a decline outcome"),
            ));
        }
        return Ok(Resolution::Decline(status));
    }

    if let Some((field, _)) = raw_presence(request).into_iter().find(|(_, present)| !*present) {
        return Err(DomainError::missing(field));
    }
    if let Some(raw) = request.status.as_deref() {
        let status = parse_enum::<ApplicationStatus>(raw, "status")?;
        if status != ApplicationStatus::Approved {
            return Err(DomainError::invalid_state(
                "status",
                format!("an approval cannot record status {status}"),
            ));
        }
    }

    let fields = parse_term_fields(
        request.university_id,
        request.start_date.clone(),
        request.tuition_amount,
        request.arrears_amount,
    )?;
    match check_term_coupling(ApplicationStatus::Approved, &fields)? {
        Some(terms) => Ok(Resolution::Approve(terms)),
        None => Err(DomainError::missing(TermFields::NAMES[0])),
    }
}

/// Checks the decision can still be recorded against the loaded application.
pub fn ensure_resolvable(
    application: &Application,
    expected_version: Option<i64>,
) -> DomainResult<()> {
    if !application.status.is_undecided() {
        return Err(DomainError::conflict(
            "status",
            format!("application is already {}", application.status),
        ));
    }

    ensure_version(application, expected_version)
}

pub fn ensure_version(application: &Application, expected_version: Option<i64>) -> DomainResult<()> {
    match expected_version {
        Some(expected) if expected != application.version => Err(DomainError::conflict(
            "expected_version",
            format!(
                "expected version {expected} but the application is at {}",
                application.version
            ),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use bursar_core::ErrorKind;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn approve_request() -> ResolutionRequest {
        ResolutionRequest {
            approve: Some(true),
            university_id: Some(1),
            start_date: Some("2025-01-01".to_string()),
            tuition_amount: Some(Decimal::new(500000, 2)),
            arrears_amount: Some(Decimal::ZERO),
            ..ResolutionRequest::default()
        }
    }

    #[test]
    fn approve_with_missing_tuition_names_it() {
        let request = ResolutionRequest {
            tuition_amount: None,
            ..approve_request()
        };
        assert_eq!(decide(&request), Err(DomainError::missing("tuition_amount")));
    }

    #[test]
    fn approve_reports_first_missing_in_fixed_order() {
        let request = ResolutionRequest {
            approve: Some(true),
            arrears_amount: Some(Decimal::ZERO),
            ..ResolutionRequest::default()
        };
        assert_eq!(decide(&request), Err(DomainError::missing("university_id")));
    }

    #[test]
    fn decline_with_terms_is_invalid_state() {
        let request = ResolutionRequest {
            approve: Some(false),
            tuition_amount: Some(Decimal::new(5000, 0)),
            ..ResolutionRequest::default()
        };
        let err = decide(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.field(), Some("tuition_amount"));
    }

    #[test]
    fn decline_with_malformed_date_still_reports_presence() {
        let request = ResolutionRequest {
            approve: Some(false),
            start_date: Some("not a date".to_string()),
            ..ResolutionRequest::default()
        };
        let err = decide(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.field(), Some("start_date"));
    }

    #[test]
    fn full_approval_carries_exact_terms() {
        let resolution = decide(&approve_request()).expect("valid approval");
        assert_eq!(
            resolution,
            Resolution::Approve(ApprovedTerms {
                university_id: 1,
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
                tuition_amount: Decimal::new(500000, 2),
                arrears_amount: Decimal::new(0, 2),
            })
        );
        assert_eq!(resolution.status(), ApplicationStatus::Approved);
    }

    #[test]
    fn decline_defaults_to_denied_and_accepts_scholarship_outcomes() {
        let denied = decide(&ResolutionRequest {
            approve: Some(false),
            ..ResolutionRequest::default()
        });
        assert_eq!(denied, Ok(Resolution::Decline(ApplicationStatus::Denied)));

        let scholarship = decide(&ResolutionRequest {
            approve: Some(false),
            status: Some("prospective_scholarship".to_string()),
            ..ResolutionRequest::default()
        });
        assert_eq!(
            scholarship,
            Ok(Resolution::Decline(ApplicationStatus::ProspectiveScholarship))
        );
    }

    #[test]
    fn decline_cannot_land_on_an_undecided_status() {
        let err = decide(&ResolutionRequest {
            approve: Some(false),
            status: Some("pending".to_string()),
            ..ResolutionRequest::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn approve_flag_is_required() {
        assert_eq!(
            decide(&ResolutionRequest::default()),
            Err(DomainError::missing("approve"))
        );
    }

    #[test]
    fn negative_tuition_is_invalid_value() {
        let request = ResolutionRequest {
            tuition_amount: Some(Decimal::new(-1, 0)),
            ..approve_request()
        };
        assert_eq!(decide(&request).unwrap_err().kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn decline_write_clears_terms() {
        let write = Resolution::Decline(ApplicationStatus::Denied).into_write();
        assert_eq!(write.terms, None);
        assert_eq!(write.status, ApplicationStatus::Denied);
    }
}
