pub mod actor;
pub mod contracts;
pub mod error;
pub mod fields;
pub mod models;
pub mod storage;

pub use actor::StaffActor;
pub use error::{DomainError, DomainResult, ErrorKind, StoreError};
pub use fields::ApplicationField;
pub use models::{
    Application, ApplicationStatus, ApprovedTerms, Comment, Deposit, Invoice, InvoiceType, Ledger,
    LoanPreferences, NewApplication, NewComment, NewDeposit, NewInvoice, NewUniversity, Reference,
    StudentSnapshot, TermFields, University, UnknownVariant,
};
pub use storage::{
    ApplicationFilter, ApplicationStore, CommentStore, LedgerFilter, LedgerStore, Listing, Page,
    ResolutionWrite, Store, UniversityStore,
};
