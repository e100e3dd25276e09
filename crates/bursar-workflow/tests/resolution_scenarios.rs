//! End-to-end workflow scenarios against the in-memory store.

use std::sync::Arc;

use bursar_core::contracts::{
    ApplicationCreate, ApplicationListQuery, ApplicationUpdate, CommentCreate, CommentUpdate,
    DepositCreate, DepositResolve, DepositUpdate, InvoiceCreate, LedgerListQuery,
    ResolutionRequest, SearchQuery, TermsAmendment, UniversityCreate,
};
use bursar_core::{ApplicationStatus, DomainError, ErrorKind, StaffActor};
use bursar_store::{FaultPoint, InMemoryStore};
use bursar_workflow::BursarService;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;

struct Harness {
    store: Arc<InMemoryStore>,
    service: BursarService,
    actor: StaffActor,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            service: BursarService::new(store.clone()),
            store,
            actor: StaffActor::new(42),
        }
    }

    async fn university(&self, name: &str) -> i64 {
        self.service
            .create_university(
                &self.actor,
                UniversityCreate {
                    name: Some(name.to_string()),
                    app_fee_flat: Some(dec("50.00")),
                    app_fee_percentage: Some(dec("2.5")),
                    ..UniversityCreate::default()
                },
            )
            .await
            .expect("university")
            .id
    }

    async fn applicant(&self, mat_number: &str) -> i64 {
        self.service
            .create_application(
                &self.actor,
                ApplicationCreate {
                    first_name: Some("Abena".to_string()),
                    last_name: Some("Asante".to_string()),
                    mat_number: Some(mat_number.to_string()),
                    email: Some("abena@example.com".to_string()),
                    ..ApplicationCreate::default()
                },
            )
            .await
            .expect("application")
            .id
    }
}

fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

fn approval(university_id: i64) -> ResolutionRequest {
    ResolutionRequest {
        approve: Some(true),
        university_id: Some(university_id),
        start_date: Some("2025-01-01".to_string()),
        tuition_amount: Some(dec("5000.00")),
        arrears_amount: Some(dec("0.00")),
        ..ResolutionRequest::default()
    }
}

#[tokio::test]
async fn approval_without_tuition_is_missing_field() {
    let h = Harness::new();
    let university_id = h.university("University of Ghana").await;
    let id = h.applicant("UG-1").await;

    let err = h
        .service
        .resolve_application(
            &h.actor,
            id,
            ResolutionRequest {
                tuition_amount: None,
                ..approval(university_id)
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err, DomainError::missing("tuition_amount"));
    let unchanged = h.service.get_application(id).await.expect("fetch");
    assert_eq!(unchanged.status, ApplicationStatus::Open);
}

#[tokio::test]
async fn decline_with_tuition_is_invalid_state() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;

    let err = h
        .service
        .resolve_application(
            &h.actor,
            id,
            ResolutionRequest {
                approve: Some(false),
                tuition_amount: Some(dec("5000")),
                ..ResolutionRequest::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.field(), Some("tuition_amount"));
}

#[tokio::test]
async fn full_approval_persists_exact_terms() {
    let h = Harness::new();
    let university_id = h.university("University of Ghana").await;
    let id = h.applicant("UG-1").await;

    let resolved = h
        .service
        .resolve_application(&h.actor, id, approval(university_id))
        .await
        .expect("approval");

    assert_eq!(resolved.status, ApplicationStatus::Approved);
    assert_eq!(resolved.university_id, Some(university_id));
    assert_eq!(resolved.start_date, NaiveDate::from_ymd_opt(2025, 1, 1));
    assert_eq!(resolved.tuition_amount, Some(dec("5000.00")));
    assert_eq!(resolved.arrears_amount, Some(dec("0.00")));

    let reloaded = h.service.get_application(id).await.expect("fetch");
    assert_eq!(reloaded, resolved);
    let body = serde_json::to_value(&reloaded).expect("serializes");
    assert_eq!(body["tuition_amount"], "5000.00");
    assert_eq!(body["start_date"], "2025-01-01");
}

#[tokio::test]
async fn approval_for_unknown_university_is_not_found() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;

    let err = h
        .service
        .resolve_application(&h.actor, id, approval(99))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.field(), Some("university_id"));
}

#[tokio::test]
async fn failed_resolution_write_leaves_status_and_terms_unchanged() {
    let h = Harness::new();
    let university_id = h.university("University of Ghana").await;
    let id = h.applicant("UG-1").await;
    let before = h.service.get_application(id).await.expect("fetch");

    h.store.arm_fault(FaultPoint::ResolutionTerms).await;
    let err = h
        .service
        .resolve_application(&h.actor, id, approval(university_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let after = h.service.get_application(id).await.expect("fetch");
    assert_eq!(after.status, ApplicationStatus::Open);
    assert_eq!(after.term_fields(), before.term_fields());
    assert_eq!(after.version, before.version);
}

#[tokio::test]
async fn second_resolution_is_a_conflict() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;
    let deny = ResolutionRequest {
        approve: Some(false),
        ..ResolutionRequest::default()
    };

    let denied = h
        .service
        .resolve_application(&h.actor, id, deny.clone())
        .await
        .expect("first decision");
    assert_eq!(denied.status, ApplicationStatus::Denied);
    assert_eq!(denied.term_fields(), Default::default());

    let err = h
        .service
        .resolve_application(&h.actor, id, deny)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn stale_expected_version_is_a_conflict() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;
    h.service
        .update_application(
            &h.actor,
            id,
            ApplicationUpdate {
                status: Some("pending".to_string()),
                ..ApplicationUpdate::default()
            },
        )
        .await
        .expect("move to pending");

    let err = h
        .service
        .resolve_application(
            &h.actor,
            id,
            ResolutionRequest {
                approve: Some(false),
                expected_version: Some(1),
                ..ResolutionRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.field(), Some("expected_version"));
}

#[tokio::test]
async fn scholarship_outcome_can_be_recorded() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;

    let resolved = h
        .service
        .resolve_application(
            &h.actor,
            id,
            ResolutionRequest {
                approve: Some(false),
                status: Some("retroactive_scholarship".to_string()),
                ..ResolutionRequest::default()
            },
        )
        .await
        .expect("decision");
    assert_eq!(resolved.status, ApplicationStatus::RetroactiveScholarship);
}

#[tokio::test]
async fn amending_terms_keeps_the_coupling() {
    let h = Harness::new();
    let university_id = h.university("University of Ghana").await;
    let id = h.applicant("UG-1").await;
    h.service
        .resolve_application(&h.actor, id, approval(university_id))
        .await
        .expect("approval");

    let amended = h
        .service
        .amend_terms(
            &h.actor,
            id,
            TermsAmendment {
                arrears_amount: Some(dec("120.00")),
                ..TermsAmendment::default()
            },
        )
        .await
        .expect("amendment");
    assert_eq!(amended.arrears_amount, Some(dec("120.00")));
    assert_eq!(amended.tuition_amount, Some(dec("5000.00")));

    let err = h
        .service
        .amend_terms(
            &h.actor,
            id,
            TermsAmendment {
                university_id: Some(404),
                ..TermsAmendment::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn internal_field_names_round_trip_through_intake() {
    let h = Harness::new();
    let payload: ApplicationCreate = serde_json::from_value(json!({
        "basicInformation_firstname": "Yaa",
        "basicInformation_lastname": "Boakye",
        "academicInformation_studentID": "UCC-9",
        "basicInformation_regionofresidence": "Central",
    }))
    .expect("deserializes");

    let created = h
        .service
        .create_application(&h.actor, payload)
        .await
        .expect("created");
    let fetched = h.service.get_application(created.id).await.expect("fetch");
    assert_eq!(fetched.first_name, "Yaa");
    assert_eq!(fetched.region.as_deref(), Some("Central"));

    let body = serde_json::to_value(&fetched).expect("serializes");
    assert_eq!(body["first_name"], "Yaa");
    assert!(body.get("basicInformation_firstname").is_none());

    let by_mat = h
        .service
        .get_application_by_mat("UCC-9")
        .await
        .expect("lookup");
    assert_eq!(by_mat.id, created.id);
}

#[tokio::test]
async fn finances_follow_the_ledger() {
    let h = Harness::new();
    let university_id = h.university("University of Ghana").await;
    let id = h.applicant("UG-1").await;

    let before_approval = h.service.finances(id).await.expect("finances");
    assert_eq!(before_approval.application_fee, None);
    assert_eq!(before_approval.total_remaining, None);

    h.service
        .resolve_application(&h.actor, id, approval(university_id))
        .await
        .expect("approval");
    let empty = h.service.finances(id).await.expect("finances");
    assert_eq!(empty.application_fee, Some(dec("175.00")));
    assert_eq!(empty.total_remaining, empty.application_fee);

    h.service
        .create_invoice(
            &h.actor,
            InvoiceCreate {
                student_id: Some(id),
                memo: Some("semester advance".to_string()),
                amount: Some(dec("1000")),
                kind: Some("advance".to_string()),
            },
        )
        .await
        .expect("invoice");
    let deposits = h
        .service
        .create_deposits(
            &h.actor,
            id,
            vec![
                DepositCreate {
                    date: Some("2025-02-01".to_string()),
                    memo: Some("first instalment".to_string()),
                    amount: Some(dec("300")),
                    ..DepositCreate::default()
                },
                DepositCreate {
                    date: Some("2025-03-01".to_string()),
                    memo: Some("pending transfer".to_string()),
                    amount: Some(dec("200")),
                    complete: Some(false),
                    ..DepositCreate::default()
                },
            ],
        )
        .await
        .expect("deposits");
    assert_eq!(deposits[0].student.student_mat.as_deref(), Some("UG-1"));

    let summary = h.service.finances(id).await.expect("finances");
    assert_eq!(summary.total_advances, dec("1000.00"));
    assert_eq!(summary.total_deposited, dec("300.00"));
    assert_eq!(summary.total_pending_deposits, dec("200.00"));
    assert_eq!(summary.total_remaining, Some(dec("875.00")));

    h.service
        .void_deposit(&h.actor, deposits[0].id)
        .await
        .expect("void");
    let after_void = h.service.finances(id).await.expect("finances");
    assert_eq!(after_void.total_deposited, Decimal::ZERO);
    assert_eq!(after_void.total_remaining, Some(dec("1175.00")));

    let err = h
        .service
        .void_deposit(&h.actor, deposits[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn unlinked_deposit_is_matched_by_mat_number() {
    let h = Harness::new();
    let id = h.applicant("KNUST-5").await;

    let unlinked = h
        .service
        .create_deposit(
            &h.actor,
            DepositCreate {
                date: Some("2025-05-05".to_string()),
                memo: Some("bank feed KNUST-5".to_string()),
                amount: Some(dec("75.25")),
                ..DepositCreate::default()
            },
        )
        .await
        .expect("unlinked deposit");
    assert_eq!(unlinked.student_id, None);

    let matched = h
        .service
        .resolve_deposit(
            &h.actor,
            unlinked.id,
            DepositResolve {
                student_mat: Some("KNUST-5".to_string()),
            },
        )
        .await
        .expect("matched");
    assert_eq!(matched.student_id, Some(id));
    assert_eq!(
        matched.student.student_name.as_deref(),
        Some("Abena Asante")
    );

    let err = h
        .service
        .resolve_deposit(
            &h.actor,
            unlinked.id,
            DepositResolve {
                student_mat: Some("KNUST-5".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let search = h
        .service
        .search_deposits(SearchQuery {
            q: Some("abena".to_string()),
            ..SearchQuery::default()
        })
        .await
        .expect("search");
    assert_eq!(search.total, 1);
}

#[tokio::test]
async fn unknown_enum_strings_are_rejected() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;

    let list_err = h
        .service
        .list_applications(ApplicationListQuery {
            status: Some("archived".to_string()),
            ..ApplicationListQuery::default()
        })
        .await
        .unwrap_err();
    assert_eq!(list_err.kind(), ErrorKind::InvalidEnum);

    let invoice_err = h
        .service
        .create_invoice(
            &h.actor,
            InvoiceCreate {
                student_id: Some(id),
                memo: Some("fee".to_string()),
                amount: Some(dec("10")),
                kind: Some("Advance".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(invoice_err.kind(), ErrorKind::InvalidEnum);
}

#[tokio::test]
async fn voided_invoices_leave_default_listing() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;
    let invoice = h
        .service
        .create_invoice(
            &h.actor,
            InvoiceCreate {
                student_id: Some(id),
                memo: Some("membership".to_string()),
                amount: Some(dec("20")),
                kind: Some("membership_fee".to_string()),
            },
        )
        .await
        .expect("invoice");
    h.service
        .void_invoice(&h.actor, invoice.id)
        .await
        .expect("void");

    let listing = h
        .service
        .list_invoices(LedgerListQuery {
            student_id: Some(id),
            ..LedgerListQuery::default()
        })
        .await
        .expect("list");
    assert_eq!(listing.total, 0);

    let err = h
        .service
        .update_invoice(
            &h.actor,
            invoice.id,
            bursar_core::contracts::InvoiceUpdate {
                memo: Some("membership".to_string()),
                amount: Some(dec("25")),
                kind: Some("membership_fee".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn comments_require_an_existing_application() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;

    h.service
        .create_comment(
            &h.actor,
            CommentCreate {
                student_id: Some(id),
                message: Some("called guardian".to_string()),
            },
        )
        .await
        .expect("comment");
    let err = h
        .service
        .create_comment(
            &h.actor,
            CommentCreate {
                student_id: Some(id + 100),
                message: Some("orphan".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.field(), Some("student_id"));

    let comments = h.service.list_comments(id).await.expect("list");
    assert_eq!(comments.total, 1);
    assert_eq!(comments.results[0].message, "called guardian");
}

#[tokio::test]
async fn deposit_edits_move_money_between_settled_and_pending() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;
    let deposit = h
        .service
        .create_deposit(
            &h.actor,
            DepositCreate {
                student_id: Some(id),
                date: Some("2025-02-01".to_string()),
                memo: Some("bank transfer".to_string()),
                amount: Some(dec("300")),
                ..DepositCreate::default()
            },
        )
        .await
        .expect("deposit");

    let corrected = h
        .service
        .update_deposit(
            &h.actor,
            deposit.id,
            DepositUpdate {
                date: Some("2025-02-02".to_string()),
                memo: Some("bank transfer, corrected".to_string()),
                amount: Some(dec("320.5")),
                ..DepositUpdate::default()
            },
        )
        .await
        .expect("amount edit");
    assert_eq!(corrected.amount, dec("320.50"));
    assert!(corrected.complete);
    assert_eq!(corrected.version, deposit.version + 1);
    let settled = h.service.finances(id).await.expect("finances");
    assert_eq!(settled.total_deposited, dec("320.50"));
    assert_eq!(settled.total_pending_deposits, dec("0.00"));

    h.service
        .update_deposit(
            &h.actor,
            deposit.id,
            DepositUpdate {
                date: Some("2025-02-02".to_string()),
                memo: Some("bounced, awaiting resubmission".to_string()),
                amount: Some(dec("320.50")),
                complete: Some(false),
                ..DepositUpdate::default()
            },
        )
        .await
        .expect("mark pending");
    let pending = h.service.finances(id).await.expect("finances");
    assert_eq!(pending.total_deposited, dec("0.00"));
    assert_eq!(pending.total_pending_deposits, dec("320.50"));

    h.service
        .void_deposit(&h.actor, deposit.id)
        .await
        .expect("void");
    let err = h
        .service
        .update_deposit(
            &h.actor,
            deposit.id,
            DepositUpdate {
                date: Some("2025-02-02".to_string()),
                memo: Some("after void".to_string()),
                amount: Some(dec("1")),
                complete: Some(true),
                ..DepositUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(err.field(), Some("voided_at"));
    let after_void = h.service.finances(id).await.expect("finances");
    assert_eq!(after_void.total_pending_deposits, dec("0.00"));
}

#[tokio::test]
async fn deposit_edit_requires_full_replacement() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;
    let deposit = h
        .service
        .create_deposit(
            &h.actor,
            DepositCreate {
                student_id: Some(id),
                date: Some("2025-02-01".to_string()),
                memo: Some("momo".to_string()),
                amount: Some(dec("50")),
                ..DepositCreate::default()
            },
        )
        .await
        .expect("deposit");

    let err = h
        .service
        .update_deposit(
            &h.actor,
            deposit.id,
            DepositUpdate {
                date: Some("2025-02-01".to_string()),
                memo: Some("momo".to_string()),
                ..DepositUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::MissingField { field: "amount" }));

    let err = h
        .service
        .update_deposit(
            &h.actor,
            deposit.id + 100,
            DepositUpdate {
                date: Some("2025-02-01".to_string()),
                memo: Some("momo".to_string()),
                amount: Some(dec("50")),
                ..DepositUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn comment_edits_check_message_then_existence() {
    let h = Harness::new();
    let id = h.applicant("UG-1").await;
    let comment = h
        .service
        .create_comment(
            &h.actor,
            CommentCreate {
                student_id: Some(id),
                message: Some("called guardian".to_string()),
            },
        )
        .await
        .expect("comment");

    let err = h
        .service
        .update_comment(
            &h.actor,
            comment.id + 100,
            CommentUpdate {
                message: Some("edited".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.field(), Some("comment"));

    let err = h
        .service
        .update_comment(
            &h.actor,
            comment.id,
            CommentUpdate {
                message: Some("   ".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::MissingField { field: "message" }));

    let edited = h
        .service
        .update_comment(
            &h.actor,
            comment.id,
            CommentUpdate {
                message: Some("called guardian, promised payment".to_string()),
            },
        )
        .await
        .expect("edit");
    assert_eq!(edited.message, "called guardian, promised payment");
    let comments = h.service.list_comments(id).await.expect("list");
    assert_eq!(comments.total, 1);
    assert_eq!(comments.results[0].message, edited.message);
}
