use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{
    Application, ApplicationStatus, ApprovedTerms, Comment, Deposit, Invoice, Ledger,
    NewApplication, NewComment, NewDeposit, NewInvoice, NewUniversity, University,
};

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// Slices an already ordered in-memory result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Pagination envelope returned by every list operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing<T> {
    pub results: Vec<T>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub student_id: Option<i64>,
    pub include_voided: bool,
}

/// The single write a resolution decision makes: status and terms land together or not at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionWrite {
    pub status: ApplicationStatus,
    pub terms: Option<ApprovedTerms>,
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError>;

    async fn fetch_application(&self, id: i64) -> Result<Option<Application>, StoreError>;

    async fn fetch_application_by_mat(
        &self,
        mat_number: &str,
    ) -> Result<Option<Application>, StoreError>;

    /// Writes every column of `application` if the stored version still equals
    /// `application.version`; the returned record carries the bumped version.
    async fn update_application(&self, application: &Application)
    -> Result<Application, StoreError>;

    async fn commit_resolution(
        &self,
        id: i64,
        expected_version: i64,
        write: ResolutionWrite,
    ) -> Result<Application, StoreError>;

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> Result<Listing<Application>, StoreError>;

    async fn search_applications(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Application>, StoreError>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts all deposits in one transaction.
    async fn insert_deposits(&self, deposits: Vec<NewDeposit>) -> Result<Vec<Deposit>, StoreError>;

    async fn fetch_deposit(&self, id: i64) -> Result<Option<Deposit>, StoreError>;

    /// Writes the row only while the stored copy is unvoided and still at `deposit.version`;
    /// otherwise `VersionConflict`. Voiding goes through here too.
    async fn update_deposit(&self, deposit: &Deposit) -> Result<Deposit, StoreError>;

    async fn list_deposits(
        &self,
        filter: &LedgerFilter,
        page: Page,
    ) -> Result<Listing<Deposit>, StoreError>;

    async fn search_deposits(&self, query: &str, page: Page)
    -> Result<Listing<Deposit>, StoreError>;

    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, StoreError>;

    async fn fetch_invoice(&self, id: i64) -> Result<Option<Invoice>, StoreError>;

    /// Same compare-and-set as [`LedgerStore::update_deposit`].
    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, StoreError>;

    async fn list_invoices(
        &self,
        filter: &LedgerFilter,
        page: Page,
    ) -> Result<Listing<Invoice>, StoreError>;

    async fn search_invoices(&self, query: &str, page: Page)
    -> Result<Listing<Invoice>, StoreError>;

    /// Every non-voided deposit and invoice linked to the application.
    async fn ledger_for(&self, student_id: i64) -> Result<Ledger, StoreError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;

    async fn fetch_comment(&self, id: i64) -> Result<Option<Comment>, StoreError>;

    async fn update_comment(&self, id: i64, message: &str) -> Result<Comment, StoreError>;

    async fn list_comments(&self, student_id: i64) -> Result<Vec<Comment>, StoreError>;
}

#[async_trait]
pub trait UniversityStore: Send + Sync {
    async fn insert_university(&self, university: NewUniversity)
    -> Result<University, StoreError>;

    async fn fetch_university(&self, id: i64) -> Result<Option<University>, StoreError>;

    async fn list_universities(&self) -> Result<Vec<University>, StoreError>;
}

/// Everything the workflow service needs from persistence.
pub trait Store: ApplicationStore + LedgerStore + CommentStore + UniversityStore {}

impl<T> Store for T where T: ApplicationStore + LedgerStore + CommentStore + UniversityStore {}
