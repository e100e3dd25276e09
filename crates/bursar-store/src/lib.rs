use std::collections::BTreeMap;

use async_trait::async_trait;
use bursar_core::{
    Application, ApplicationField, ApplicationFilter, ApplicationStore, Comment, CommentStore,
    Deposit, Invoice, Ledger, LedgerFilter, LedgerStore, Listing, NewApplication, NewComment,
    NewDeposit, NewInvoice, NewUniversity, Page, ResolutionWrite, StoreError, StudentSnapshot,
    University, UniversityStore,
};
use chrono::Utc;
use tokio::sync::RwLock;

/// Failure injected into the next matching write, for exercising all-or-nothing behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// Resolution fails after the status is staged and before the terms are.
    ResolutionTerms,
    /// Deposit batch fails once this many rows are staged.
    DepositBatch { after: usize },
}

#[derive(Default)]
struct Sequences {
    application: i64,
    deposit: i64,
    invoice: i64,
    comment: i64,
    university: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    applications: BTreeMap<i64, Application>,
    deposits: BTreeMap<i64, Deposit>,
    invoices: BTreeMap<i64, Invoice>,
    comments: BTreeMap<i64, Comment>,
    universities: BTreeMap<i64, University>,
    sequences: Sequences,
    armed_fault: Option<FaultPoint>,
}

impl Tables {
    fn take_fault(&mut self, matches: impl Fn(FaultPoint) -> bool) -> Option<FaultPoint> {
        match self.armed_fault {
            Some(fault) if matches(fault) => self.armed_fault.take(),
            _ => None,
        }
    }
}

/// Store backed by in-process maps. Every write runs inside one write-lock section and
/// only publishes a fully staged record.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn arm_fault(&self, fault: FaultPoint) {
        self.tables.write().await.armed_fault = Some(fault);
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|text| text.to_lowercase().contains(needle))
}

fn snapshot_matches(snapshot: &StudentSnapshot, needle: &str) -> bool {
    contains_ci(snapshot.student_name.as_deref(), needle)
        || contains_ci(snapshot.student_email.as_deref(), needle)
        || contains_ci(snapshot.student_mat.as_deref(), needle)
}

/// Newest first, then sliced; `total` counts the whole match set.
fn paginate<'a, T: Clone + 'a>(rows: impl DoubleEndedIterator<Item = &'a T>, page: Page) -> Listing<T> {
    let matched: Vec<T> = rows.rev().cloned().collect();
    Listing {
        total: matched.len() as i64,
        results: page.apply(matched),
    }
}

fn ledger_filter_matches(filter: &LedgerFilter, student_id: Option<i64>, voided: bool) -> bool {
    (filter.include_voided || !voided)
        && filter.student_id.is_none_or(|wanted| student_id == Some(wanted))
}

#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .applications
            .values()
            .any(|existing| existing.reference_code == application.reference_code)
        {
            return Err(StoreError::Duplicate {
                field: "reference_code",
                value: application.reference_code,
            });
        }

        let now = Utc::now();
        let mut record = Application {
            id: next_id(&mut tables.sequences.application),
            reference_code: application.reference_code,
            date_applied: application.date_applied,
            email: application.email,
            email2: application.email2,
            first_name: application.first_name,
            last_name: application.last_name,
            phone_number: application.phone_number,
            mat_number: application.mat_number,
            university_string: application.university_string,
            country: application.country,
            region: application.region,
            address: application.address,
            graduation_date: application.graduation_date,
            references: application.references,
            loan_preferences: application.loan_preferences,
            status: application.status,
            university_id: None,
            start_date: None,
            tuition_amount: None,
            arrears_amount: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        record.set_terms(application.terms);

        tables.applications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_application(&self, id: i64) -> Result<Option<Application>, StoreError> {
        Ok(self.tables.read().await.applications.get(&id).cloned())
    }

    async fn fetch_application_by_mat(
        &self,
        mat_number: &str,
    ) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .applications
            .values()
            .find(|application| application.mat_number == mat_number)
            .cloned())
    }

    async fn update_application(
        &self,
        application: &Application,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .applications
            .get(&application.id)
            .ok_or(StoreError::NotFound {
                entity: "application",
                id: application.id,
            })?;
        if stored.version != application.version {
            return Err(StoreError::VersionConflict {
                entity: "application",
                id: application.id,
            });
        }

        let mut record = application.clone();
        record.created_at = stored.created_at;
        record.version += 1;
        record.updated_at = Utc::now();
        tables.applications.insert(record.id, record.clone());
        Ok(record)
    }

    async fn commit_resolution(
        &self,
        id: i64,
        expected_version: i64,
        write: ResolutionWrite,
    ) -> Result<Application, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables.applications.get(&id).ok_or(StoreError::NotFound {
            entity: "application",
            id,
        })?;
        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                entity: "application",
                id,
            });
        }

        let mut staged = stored.clone();
        staged.status = write.status;
        if tables
            .take_fault(|fault| fault == FaultPoint::ResolutionTerms)
            .is_some()
        {
            return Err(StoreError::Backend(
                "injected fault while writing resolution terms".to_string(),
            ));
        }
        staged.set_terms(write.terms);
        staged.version += 1;
        staged.updated_at = Utc::now();

        tables.applications.insert(id, staged.clone());
        Ok(staged)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> Result<Listing<Application>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables
            .applications
            .values()
            .filter(|application| filter.status.is_none_or(|status| application.status == status));
        Ok(paginate(rows, page))
    }

    async fn search_applications(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Application>, StoreError> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;
        let rows = tables.applications.values().filter(|application| {
            ApplicationField::SEARCHABLE
                .into_iter()
                .any(|field| contains_ci(field.text_of(application), &needle))
        });
        Ok(paginate(rows, page))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_deposits(&self, deposits: Vec<NewDeposit>) -> Result<Vec<Deposit>, StoreError> {
        let mut tables = self.tables.write().await;
        let mut sequence = tables.sequences.deposit;
        let now = Utc::now();

        let mut staged = Vec::with_capacity(deposits.len());
        for deposit in deposits {
            if tables
                .take_fault(|fault| fault == FaultPoint::DepositBatch { after: staged.len() })
                .is_some()
            {
                return Err(StoreError::Backend(format!(
                    "injected fault after staging {} deposits",
                    staged.len()
                )));
            }
            staged.push(Deposit {
                id: next_id(&mut sequence),
                student_id: deposit.student_id,
                amount: deposit.amount,
                date: deposit.date,
                memo: deposit.memo,
                reference_id: deposit.reference_id,
                student: deposit.student,
                complete: deposit.complete,
                voided_at: None,
                version: 1,
                created_at: now,
                updated_at: now,
            });
        }

        tables.sequences.deposit = sequence;
        for deposit in &staged {
            tables.deposits.insert(deposit.id, deposit.clone());
        }
        Ok(staged)
    }

    async fn fetch_deposit(&self, id: i64) -> Result<Option<Deposit>, StoreError> {
        Ok(self.tables.read().await.deposits.get(&id).cloned())
    }

    async fn update_deposit(&self, deposit: &Deposit) -> Result<Deposit, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables.deposits.get(&deposit.id).ok_or(StoreError::NotFound {
            entity: "deposit",
            id: deposit.id,
        })?;
        if stored.version != deposit.version || stored.is_voided() {
            return Err(StoreError::VersionConflict {
                entity: "deposit",
                id: deposit.id,
            });
        }

        let mut record = deposit.clone();
        record.created_at = stored.created_at;
        record.version += 1;
        record.updated_at = Utc::now();
        tables.deposits.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_deposits(
        &self,
        filter: &LedgerFilter,
        page: Page,
    ) -> Result<Listing<Deposit>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables.deposits.values().filter(|deposit| {
            ledger_filter_matches(filter, deposit.student_id, deposit.is_voided())
        });
        Ok(paginate(rows, page))
    }

    async fn search_deposits(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Deposit>, StoreError> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;
        let rows = tables.deposits.values().filter(|deposit| {
            !deposit.is_voided()
                && (contains_ci(Some(deposit.memo.as_str()), &needle)
                    || snapshot_matches(&deposit.student, &needle))
        });
        Ok(paginate(rows, page))
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let record = Invoice {
            id: next_id(&mut tables.sequences.invoice),
            student_id: invoice.student_id,
            amount: invoice.amount,
            memo: invoice.memo,
            kind: invoice.kind,
            student: invoice.student,
            voided_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        tables.invoices.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_invoice(&self, id: i64) -> Result<Option<Invoice>, StoreError> {
        Ok(self.tables.read().await.invoices.get(&id).cloned())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables.invoices.get(&invoice.id).ok_or(StoreError::NotFound {
            entity: "invoice",
            id: invoice.id,
        })?;
        if stored.version != invoice.version || stored.is_voided() {
            return Err(StoreError::VersionConflict {
                entity: "invoice",
                id: invoice.id,
            });
        }

        let mut record = invoice.clone();
        record.created_at = stored.created_at;
        record.version += 1;
        record.updated_at = Utc::now();
        tables.invoices.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_invoices(
        &self,
        filter: &LedgerFilter,
        page: Page,
    ) -> Result<Listing<Invoice>, StoreError> {
        let tables = self.tables.read().await;
        let rows = tables.invoices.values().filter(|invoice| {
            ledger_filter_matches(filter, Some(invoice.student_id), invoice.is_voided())
        });
        Ok(paginate(rows, page))
    }

    async fn search_invoices(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Invoice>, StoreError> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables.read().await;
        let rows = tables.invoices.values().filter(|invoice| {
            !invoice.is_voided()
                && (contains_ci(Some(invoice.memo.as_str()), &needle)
                    || snapshot_matches(&invoice.student, &needle))
        });
        Ok(paginate(rows, page))
    }

    async fn ledger_for(&self, student_id: i64) -> Result<Ledger, StoreError> {
        let tables = self.tables.read().await;
        Ok(Ledger {
            deposits: tables
                .deposits
                .values()
                .filter(|deposit| deposit.student_id == Some(student_id) && !deposit.is_voided())
                .cloned()
                .collect(),
            invoices: tables
                .invoices
                .values()
                .filter(|invoice| invoice.student_id == student_id && !invoice.is_voided())
                .cloned()
                .collect(),
        })
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let record = Comment {
            id: next_id(&mut tables.sequences.comment),
            student_id: comment.student_id,
            message: comment.message,
            created_at: now,
            updated_at: now,
        };

        tables.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn update_comment(&self, id: i64, message: &str) -> Result<Comment, StoreError> {
        let mut tables = self.tables.write().await;
        let comment = tables.comments.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "comment",
            id,
        })?;

        comment.message = message.to_string();
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn list_comments(&self, student_id: i64) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .values()
            .filter(|comment| comment.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UniversityStore for InMemoryStore {
    async fn insert_university(
        &self,
        university: NewUniversity,
    ) -> Result<University, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .universities
            .values()
            .any(|existing| existing.name.eq_ignore_ascii_case(&university.name))
        {
            return Err(StoreError::Duplicate {
                field: "name",
                value: university.name,
            });
        }

        let now = Utc::now();
        let record = University {
            id: next_id(&mut tables.sequences.university),
            name: university.name,
            app_fee_flat: university.app_fee_flat,
            app_fee_percentage: university.app_fee_percentage,
            during_studies_min_payment: university.during_studies_min_payment,
            during_studies_membership_fee: university.during_studies_membership_fee,
            after_studies_min_payment: university.after_studies_min_payment,
            after_studies_membership_fee: university.after_studies_membership_fee,
            created_at: now,
            updated_at: now,
        };

        tables.universities.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch_university(&self, id: i64) -> Result<Option<University>, StoreError> {
        Ok(self.tables.read().await.universities.get(&id).cloned())
    }

    async fn list_universities(&self) -> Result<Vec<University>, StoreError> {
        Ok(self.tables.read().await.universities.values().cloned().collect())
    }
}
