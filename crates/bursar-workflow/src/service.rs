use std::sync::Arc;

use bursar_core::contracts::{
    ApplicationCreate, ApplicationListQuery, ApplicationUpdate, CommentCreate, CommentUpdate,
    DepositCreate, DepositResolve, DepositUpdate, InvoiceCreate, InvoiceUpdate, LedgerListQuery,
    ResolutionRequest, SearchQuery, TermsAmendment, UniversityCreate,
};
use bursar_core::{
    Application, ApplicationFilter, ApplicationStore, Comment, CommentStore, Deposit, DomainError,
    DomainResult, Invoice, LedgerFilter, LedgerStore, Listing, Page, StaffActor, Store, University,
    UniversityStore,
};
use bursar_finance::{Finances, summarize};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::resolution::{Resolution, decide, ensure_resolvable, ensure_version};
use crate::validation;

pub fn generate_reference_code() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("BUR-{}", &id[..8])
}

/// Orchestrates validation, resolution and persistence for every staff operation.
#[derive(Clone)]
pub struct BursarService {
    store: Arc<dyn Store>,
}

impl BursarService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load_application(&self, id: i64) -> DomainResult<Application> {
        self.store
            .fetch_application(id)
            .await?
            .ok_or_else(|| DomainError::not_found("application", id))
    }

    async fn load_deposit(&self, id: i64) -> DomainResult<Deposit> {
        self.store
            .fetch_deposit(id)
            .await?
            .ok_or_else(|| DomainError::not_found("deposit", id))
    }

    async fn load_invoice(&self, id: i64) -> DomainResult<Invoice> {
        self.store
            .fetch_invoice(id)
            .await?
            .ok_or_else(|| DomainError::not_found("invoice", id))
    }

    /// Linked ledger rows must point at an existing application; `field` names the payload key.
    async fn linked_application(&self, field: &'static str, id: i64) -> DomainResult<Application> {
        self.store
            .fetch_application(id)
            .await?
            .ok_or_else(|| DomainError::not_found(field, id))
    }

    async fn ensure_university(&self, university_id: Option<i64>) -> DomainResult<()> {
        let Some(id) = university_id else {
            return Ok(());
        };
        match self.store.fetch_university(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("university_id", id)),
        }
    }

    // applications

    pub async fn create_application(
        &self,
        actor: &StaffActor,
        payload: ApplicationCreate,
    ) -> DomainResult<Application> {
        let new = validation::validate_application_create(payload, generate_reference_code)?;
        self.ensure_university(new.terms.as_ref().map(|terms| terms.university_id))
            .await?;

        let application = self.store.insert_application(new).await?;
        info!(
            application_id = application.id,
            reference_code = %application.reference_code,
            status = %application.status,
            %actor,
            "application created"
        );
        Ok(application)
    }

    pub async fn get_application(&self, id: i64) -> DomainResult<Application> {
        self.load_application(id).await
    }

    pub async fn get_application_by_mat(&self, mat_number: &str) -> DomainResult<Application> {
        self.store
            .fetch_application_by_mat(mat_number.trim())
            .await?
            .ok_or_else(|| DomainError::not_found("mat_number", mat_number))
    }

    pub async fn update_application(
        &self,
        actor: &StaffActor,
        id: i64,
        payload: ApplicationUpdate,
    ) -> DomainResult<Application> {
        let current = self.load_application(id).await?;
        ensure_version(&current, payload.expected_version)?;

        let next = validation::apply_application_update(&current, payload)?;
        if next.university_id != current.university_id {
            self.ensure_university(next.university_id).await?;
        }

        let saved = self.store.update_application(&next).await?;
        info!(
            application_id = saved.id,
            version = saved.version,
            status = %saved.status,
            %actor,
            "application updated"
        );
        Ok(saved)
    }

    pub async fn resolve_application(
        &self,
        actor: &StaffActor,
        id: i64,
        request: ResolutionRequest,
    ) -> DomainResult<Application> {
        let resolution = decide(&request)?;

        let current = self.load_application(id).await?;
        if let Err(err) = ensure_resolvable(&current, request.expected_version) {
            warn!(
                application_id = id,
                status = %current.status,
                %actor,
                error = %err,
                "resolution rejected"
            );
            return Err(err);
        }
        if let Resolution::Approve(terms) = &resolution {
            self.ensure_university(Some(terms.university_id)).await?;
        }

        let status = resolution.status();
        let saved = self
            .store
            .commit_resolution(id, current.version, resolution.into_write())
            .await?;
        info!(
            application_id = id,
            from = %current.status,
            to = %status,
            version = saved.version,
            %actor,
            "application resolved"
        );
        Ok(saved)
    }

    pub async fn amend_terms(
        &self,
        actor: &StaffActor,
        id: i64,
        payload: TermsAmendment,
    ) -> DomainResult<Application> {
        let current = self.load_application(id).await?;
        ensure_version(&current, payload.expected_version)?;

        let next = validation::apply_terms_amendment(&current, payload)?;
        if next.university_id != current.university_id {
            self.ensure_university(next.university_id).await?;
        }

        let saved = self.store.update_application(&next).await?;
        info!(
            application_id = saved.id,
            version = saved.version,
            %actor,
            "approved terms amended"
        );
        Ok(saved)
    }

    pub async fn list_applications(
        &self,
        query: ApplicationListQuery,
    ) -> DomainResult<Listing<Application>> {
        let filter = ApplicationFilter {
            status: validation::parse_status_filter(query.status.as_deref())?,
        };
        let page = Page::new(query.limit, query.offset);
        Ok(self.store.list_applications(&filter, page).await?)
    }

    pub async fn search_applications(
        &self,
        query: SearchQuery,
    ) -> DomainResult<Listing<Application>> {
        let q = validation::require_query(query.q)?;
        let page = Page::new(query.limit, query.offset);
        Ok(self.store.search_applications(&q, page).await?)
    }

    pub async fn finances(&self, id: i64) -> DomainResult<Finances> {
        let application = self.load_application(id).await?;
        let university = match application.university_id {
            Some(university_id) => self.store.fetch_university(university_id).await?,
            None => None,
        };
        let ledger = self.store.ledger_for(id).await?;

        summarize(
            &application,
            university.as_ref(),
            &ledger.deposits,
            &ledger.invoices,
        )
    }

    // deposits

    pub async fn create_deposit(
        &self,
        actor: &StaffActor,
        payload: DepositCreate,
    ) -> DomainResult<Deposit> {
        let mut new = validation::validate_deposit_create(payload)?;
        if let Some(student_id) = new.student_id {
            new.student = self
                .linked_application("student_id", student_id)
                .await?
                .snapshot();
        }

        let mut inserted = self.store.insert_deposits(vec![new]).await?;
        let deposit = inserted
            .pop()
            .ok_or_else(|| DomainError::Storage {
                reason: "deposit insert returned no row".to_string(),
            })?;
        info!(
            deposit_id = deposit.id,
            student_id = ?deposit.student_id,
            amount = %deposit.amount,
            %actor,
            "deposit recorded"
        );
        Ok(deposit)
    }

    /// Records several deposits for one application; all of them are stored or none.
    pub async fn create_deposits(
        &self,
        actor: &StaffActor,
        student_id: i64,
        payloads: Vec<DepositCreate>,
    ) -> DomainResult<Vec<Deposit>> {
        if payloads.is_empty() {
            return Err(DomainError::missing("deposits"));
        }
        let snapshot = self.load_application(student_id).await?.snapshot();

        let mut batch = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let mut new = validation::validate_deposit_create(DepositCreate {
                student_id: Some(student_id),
                ..payload
            })?;
            new.student = snapshot.clone();
            batch.push(new);
        }

        let deposits = self.store.insert_deposits(batch).await?;
        info!(
            student_id,
            count = deposits.len(),
            %actor,
            "deposit batch recorded"
        );
        Ok(deposits)
    }

    pub async fn get_deposit(&self, id: i64) -> DomainResult<Deposit> {
        self.load_deposit(id).await
    }

    pub async fn update_deposit(
        &self,
        actor: &StaffActor,
        id: i64,
        payload: DepositUpdate,
    ) -> DomainResult<Deposit> {
        let current = self.load_deposit(id).await?;
        let next = validation::apply_deposit_update(&current, payload)?;

        let saved = self.store.update_deposit(&next).await?;
        info!(deposit_id = id, amount = %saved.amount, %actor, "deposit updated");
        Ok(saved)
    }

    /// Links an unmatched deposit to the application holding the given mat number.
    pub async fn resolve_deposit(
        &self,
        actor: &StaffActor,
        id: i64,
        payload: DepositResolve,
    ) -> DomainResult<Deposit> {
        let student_mat = validation::require_text(payload.student_mat, "student_mat")?;
        let current = self.load_deposit(id).await?;
        validation::ensure_not_voided(current.is_voided())?;
        if let Some(student_id) = current.student_id {
            return Err(DomainError::conflict(
                "student_id",
                format!("deposit is already linked to application {student_id}"),
            ));
        }

        let application = self
            .store
            .fetch_application_by_mat(&student_mat)
            .await?
            .ok_or_else(|| DomainError::not_found("student_mat", &student_mat))?;

        let mut next = current;
        next.student_id = Some(application.id);
        next.student = application.snapshot();

        let saved = self.store.update_deposit(&next).await?;
        info!(
            deposit_id = id,
            application_id = application.id,
            %actor,
            "deposit matched to application"
        );
        Ok(saved)
    }

    pub async fn void_deposit(&self, actor: &StaffActor, id: i64) -> DomainResult<Deposit> {
        let current = self.load_deposit(id).await?;
        if current.is_voided() {
            return Err(DomainError::conflict("voided_at", "deposit is already voided"));
        }

        let mut next = current;
        next.voided_at = Some(Utc::now());
        let saved = self.store.update_deposit(&next).await?;
        warn!(deposit_id = id, amount = %saved.amount, %actor, "deposit voided");
        Ok(saved)
    }

    pub async fn list_deposits(&self, query: LedgerListQuery) -> DomainResult<Listing<Deposit>> {
        let filter = LedgerFilter {
            student_id: query.student_id,
            include_voided: query.include_voided.unwrap_or(false),
        };
        let page = Page::new(query.limit, query.offset);
        Ok(self.store.list_deposits(&filter, page).await?)
    }

    pub async fn search_deposits(&self, query: SearchQuery) -> DomainResult<Listing<Deposit>> {
        let q = validation::require_query(query.q)?;
        let page = Page::new(query.limit, query.offset);
        Ok(self.store.search_deposits(&q, page).await?)
    }

    // invoices

    pub async fn create_invoice(
        &self,
        actor: &StaffActor,
        payload: InvoiceCreate,
    ) -> DomainResult<Invoice> {
        let mut new = validation::validate_invoice_create(payload)?;
        new.student = self
            .linked_application("student_id", new.student_id)
            .await?
            .snapshot();

        let invoice = self.store.insert_invoice(new).await?;
        info!(
            invoice_id = invoice.id,
            student_id = invoice.student_id,
            kind = %invoice.kind,
            amount = %invoice.amount,
            %actor,
            "invoice issued"
        );
        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: i64) -> DomainResult<Invoice> {
        self.load_invoice(id).await
    }

    pub async fn update_invoice(
        &self,
        actor: &StaffActor,
        id: i64,
        payload: InvoiceUpdate,
    ) -> DomainResult<Invoice> {
        let current = self.load_invoice(id).await?;
        let next = validation::apply_invoice_update(&current, payload)?;

        let saved = self.store.update_invoice(&next).await?;
        info!(invoice_id = id, kind = %saved.kind, amount = %saved.amount, %actor, "invoice updated");
        Ok(saved)
    }

    pub async fn void_invoice(&self, actor: &StaffActor, id: i64) -> DomainResult<Invoice> {
        let current = self.load_invoice(id).await?;
        if current.is_voided() {
            return Err(DomainError::conflict("voided_at", "invoice is already voided"));
        }

        let mut next = current;
        next.voided_at = Some(Utc::now());
        let saved = self.store.update_invoice(&next).await?;
        warn!(invoice_id = id, amount = %saved.amount, %actor, "invoice voided");
        Ok(saved)
    }

    pub async fn list_invoices(&self, query: LedgerListQuery) -> DomainResult<Listing<Invoice>> {
        let filter = LedgerFilter {
            student_id: query.student_id,
            include_voided: query.include_voided.unwrap_or(false),
        };
        let page = Page::new(query.limit, query.offset);
        Ok(self.store.list_invoices(&filter, page).await?)
    }

    pub async fn search_invoices(&self, query: SearchQuery) -> DomainResult<Listing<Invoice>> {
        let q = validation::require_query(query.q)?;
        let page = Page::new(query.limit, query.offset);
        Ok(self.store.search_invoices(&q, page).await?)
    }

    // comments

    pub async fn create_comment(
        &self,
        actor: &StaffActor,
        payload: CommentCreate,
    ) -> DomainResult<Comment> {
        let new = validation::validate_comment_create(payload)?;
        self.linked_application("student_id", new.student_id).await?;

        let comment = self.store.insert_comment(new).await?;
        info!(
            comment_id = comment.id,
            student_id = comment.student_id,
            %actor,
            "comment added"
        );
        Ok(comment)
    }

    pub async fn update_comment(
        &self,
        actor: &StaffActor,
        id: i64,
        payload: CommentUpdate,
    ) -> DomainResult<Comment> {
        let message = validation::validate_comment_update(payload)?;
        if self.store.fetch_comment(id).await?.is_none() {
            return Err(DomainError::not_found("comment", id));
        }

        let comment = self.store.update_comment(id, &message).await?;
        info!(comment_id = id, %actor, "comment edited");
        Ok(comment)
    }

    pub async fn list_comments(&self, student_id: i64) -> DomainResult<Listing<Comment>> {
        self.load_application(student_id).await?;
        let comments = self.store.list_comments(student_id).await?;
        Ok(Listing {
            total: comments.len() as i64,
            results: comments,
        })
    }

    // universities

    pub async fn create_university(
        &self,
        actor: &StaffActor,
        payload: UniversityCreate,
    ) -> DomainResult<University> {
        let new = validation::validate_university_create(payload)?;
        let university = self.store.insert_university(new).await?;
        info!(university_id = university.id, name = %university.name, %actor, "university registered");
        Ok(university)
    }

    pub async fn get_university(&self, id: i64) -> DomainResult<University> {
        self.store
            .fetch_university(id)
            .await?
            .ok_or_else(|| DomainError::not_found("university", id))
    }

    pub async fn list_universities(&self) -> DomainResult<Listing<University>> {
        let universities = self.store.list_universities().await?;
        Ok(Listing {
            total: universities.len() as i64,
            results: universities,
        })
    }
}
