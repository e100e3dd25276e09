//! Postgres implementation of the storage traits.
//!
//! Application columns keep the intake form's spelling (see `ApplicationField::column`),
//! so every application query quotes its column names.

use std::sync::LazyLock;

use async_trait::async_trait;
use bursar_core::{
    Application, ApplicationField, ApplicationFilter, ApplicationStore, Comment, CommentStore,
    Deposit, Invoice, Ledger, LedgerFilter, LedgerStore, Listing, LoanPreferences, NewApplication,
    NewComment, NewDeposit, NewInvoice, NewUniversity, Page, Reference, ResolutionWrite,
    StoreError, StudentSnapshot, TermFields, University, UniversityStore,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

static APPLICATION_COLUMNS: LazyLock<String> = LazyLock::new(|| {
    let mut columns = vec!["id".to_string()];
    columns.extend(ApplicationField::ALL.iter().map(|field| field.quoted_column()));
    columns.extend(
        ["reference_contacts", "loan_preferences", "version", "created_at", "updated_at"]
            .map(String::from),
    );
    columns.join(", ")
});

static APPLICATION_SEARCH: LazyLock<String> = LazyLock::new(|| {
    ApplicationField::SEARCHABLE
        .iter()
        .map(|field| format!("{} ILIKE $1", field.quoted_column()))
        .collect::<Vec<_>>()
        .join(" OR ")
});

const DEPOSIT_COLUMNS: &str = "id, student_id, amount, date, memo, reference_id, student_name, \
     student_email, student_mat, complete, voided_at, version, created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, student_id, amount, memo, \"type\", student_name, \
     student_email, student_mat, voided_at, version, created_at, updated_at";

const UNIVERSITY_COLUMNS: &str = "id, name, app_fee_flat, app_fee_percentage, \
     during_studies_min_payment, during_studies_membership_fee, after_studies_min_payment, \
     after_studies_membership_fee, created_at, updated_at";

const LEDGER_SEARCH: &str = "voided_at IS NULL AND (memo ILIKE $1 OR student_name ILIKE $1 \
     OR student_email ILIKE $1 OR student_mat ILIKE $1)";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn unique_or_backend(err: sqlx::Error, field: &'static str, value: &str) -> StoreError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => StoreError::Duplicate {
            field,
            value: value.to_string(),
        },
        _ => backend(err),
    }
}

/// `%term%` with LIKE wildcards in the user's text escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|err| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    })
}

fn application_from_row(row: &PgRow) -> Result<Application, sqlx::Error> {
    let column = |field: ApplicationField| field.column();
    let Json(references): Json<Vec<Reference>> = row.try_get("reference_contacts")?;
    let Json(loan_preferences): Json<LoanPreferences> = row.try_get("loan_preferences")?;

    Ok(Application {
        id: row.try_get("id")?,
        reference_code: row.try_get(column(ApplicationField::ReferenceCode))?,
        date_applied: row.try_get(column(ApplicationField::DateApplied))?,
        email: row.try_get(column(ApplicationField::Email))?,
        email2: row.try_get(column(ApplicationField::Email2))?,
        first_name: row.try_get(column(ApplicationField::FirstName))?,
        last_name: row.try_get(column(ApplicationField::LastName))?,
        phone_number: row.try_get(column(ApplicationField::PhoneNumber))?,
        mat_number: row.try_get(column(ApplicationField::MatNumber))?,
        university_string: row.try_get(column(ApplicationField::UniversityString))?,
        country: row.try_get(column(ApplicationField::Country))?,
        region: row.try_get(column(ApplicationField::Region))?,
        address: row.try_get(column(ApplicationField::Address))?,
        graduation_date: row.try_get(column(ApplicationField::GraduationDate))?,
        references,
        loan_preferences,
        status: parse_column(row, column(ApplicationField::Status))?,
        university_id: row.try_get(column(ApplicationField::UniversityId))?,
        start_date: row.try_get(column(ApplicationField::StartDate))?,
        tuition_amount: row.try_get(column(ApplicationField::TuitionAmount))?,
        arrears_amount: row.try_get(column(ApplicationField::ArrearsAmount))?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> Result<StudentSnapshot, sqlx::Error> {
    Ok(StudentSnapshot {
        student_name: row.try_get("student_name")?,
        student_email: row.try_get("student_email")?,
        student_mat: row.try_get("student_mat")?,
    })
}

fn deposit_from_row(row: &PgRow) -> Result<Deposit, sqlx::Error> {
    Ok(Deposit {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        amount: row.try_get("amount")?,
        date: row.try_get("date")?,
        memo: row.try_get("memo")?,
        reference_id: row.try_get("reference_id")?,
        student: snapshot_from_row(row)?,
        complete: row.try_get("complete")?,
        voided_at: row.try_get("voided_at")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn invoice_from_row(row: &PgRow) -> Result<Invoice, sqlx::Error> {
    Ok(Invoice {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        amount: row.try_get("amount")?,
        memo: row.try_get("memo")?,
        kind: parse_column(row, "type")?,
        student: snapshot_from_row(row)?,
        voided_at: row.try_get("voided_at")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn comment_from_row(row: &PgRow) -> Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        message: row.try_get("message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn university_from_row(row: &PgRow) -> Result<University, sqlx::Error> {
    Ok(University {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        app_fee_flat: row.try_get("app_fee_flat")?,
        app_fee_percentage: row.try_get("app_fee_percentage")?,
        during_studies_min_payment: row.try_get("during_studies_min_payment")?,
        during_studies_membership_fee: row.try_get("during_studies_membership_fee")?,
        after_studies_min_payment: row.try_get("after_studies_min_payment")?,
        after_studies_membership_fee: row.try_get("after_studies_membership_fee")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows<T>(
    rows: &[PgRow],
    decode: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, StoreError> {
    rows.iter().map(|row| decode(row).map_err(backend)).collect()
}

impl PgStore {
    /// Tells a lost compare-and-set apart from a missing row.
    async fn missing_or_stale(&self, table: &str, entity: &'static str, id: i64) -> StoreError {
        match sqlx::query_scalar::<_, i64>(&format!("SELECT id FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(_)) => StoreError::VersionConflict { entity, id },
            Ok(None) => StoreError::NotFound { entity, id },
            Err(err) => backend(err),
        }
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, StoreError> {
        let terms = application.terms.clone().map(TermFields::from).unwrap_or_default();
        let sql = format!(
            r#"
            INSERT INTO applications (
                "jpfID", "startTime", email, "basicInformation_email",
                "basicInformation_firstname", "basicInformation_lastname", "basicInformation_mobile",
                "academicInformation_studentID", "academicInformation_school",
                "basicInformation_countryofresidence", "basicInformation_regionofresidence",
                "basicInformation_address", "academicInformation_graduation",
                reference_contacts, loan_preferences, status,
                university_id, start_date, tuition_amount, arrears_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING {}
            "#,
            *APPLICATION_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&application.reference_code)
            .bind(application.date_applied)
            .bind(&application.email)
            .bind(&application.email2)
            .bind(&application.first_name)
            .bind(&application.last_name)
            .bind(&application.phone_number)
            .bind(&application.mat_number)
            .bind(&application.university_string)
            .bind(&application.country)
            .bind(&application.region)
            .bind(&application.address)
            .bind(application.graduation_date)
            .bind(Json(&application.references))
            .bind(Json(&application.loan_preferences))
            .bind(application.status.as_str())
            .bind(terms.university_id)
            .bind(terms.start_date)
            .bind(terms.tuition_amount)
            .bind(terms.arrears_amount)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| unique_or_backend(err, "reference_code", &application.reference_code))?;

        application_from_row(&row).map_err(backend)
    }

    async fn fetch_application(&self, id: i64) -> Result<Option<Application>, StoreError> {
        let sql = format!("SELECT {} FROM applications WHERE id = $1", *APPLICATION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref()
            .map(application_from_row)
            .transpose()
            .map_err(backend)
    }

    async fn fetch_application_by_mat(
        &self,
        mat_number: &str,
    ) -> Result<Option<Application>, StoreError> {
        let sql = format!(
            "SELECT {} FROM applications WHERE {} = $1 ORDER BY id LIMIT 1",
            *APPLICATION_COLUMNS,
            ApplicationField::MatNumber.quoted_column()
        );
        let row = sqlx::query(&sql)
            .bind(mat_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref()
            .map(application_from_row)
            .transpose()
            .map_err(backend)
    }

    async fn update_application(
        &self,
        application: &Application,
    ) -> Result<Application, StoreError> {
        let sql = format!(
            r#"
            UPDATE applications SET
                "startTime" = $3,
                email = $4,
                "basicInformation_email" = $5,
                "basicInformation_firstname" = $6,
                "basicInformation_lastname" = $7,
                "basicInformation_mobile" = $8,
                "academicInformation_studentID" = $9,
                "academicInformation_school" = $10,
                "basicInformation_countryofresidence" = $11,
                "basicInformation_regionofresidence" = $12,
                "basicInformation_address" = $13,
                "academicInformation_graduation" = $14,
                reference_contacts = $15,
                loan_preferences = $16,
                status = $17,
                university_id = $18,
                start_date = $19,
                tuition_amount = $20,
                arrears_amount = $21,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            *APPLICATION_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(application.id)
            .bind(application.version)
            .bind(application.date_applied)
            .bind(&application.email)
            .bind(&application.email2)
            .bind(&application.first_name)
            .bind(&application.last_name)
            .bind(&application.phone_number)
            .bind(&application.mat_number)
            .bind(&application.university_string)
            .bind(&application.country)
            .bind(&application.region)
            .bind(&application.address)
            .bind(application.graduation_date)
            .bind(Json(&application.references))
            .bind(Json(&application.loan_preferences))
            .bind(application.status.as_str())
            .bind(application.university_id)
            .bind(application.start_date)
            .bind(application.tuition_amount)
            .bind(application.arrears_amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => application_from_row(&row).map_err(backend),
            None => Err(self.missing_or_stale("applications", "application", application.id).await),
        }
    }

    async fn commit_resolution(
        &self,
        id: i64,
        expected_version: i64,
        write: ResolutionWrite,
    ) -> Result<Application, StoreError> {
        let terms = write.terms.map(TermFields::from).unwrap_or_default();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let version = sqlx::query_scalar::<_, i64>(
            "SELECT version FROM applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        match version {
            None => {
                return Err(StoreError::NotFound {
                    entity: "application",
                    id,
                });
            }
            Some(version) if version != expected_version => {
                return Err(StoreError::VersionConflict {
                    entity: "application",
                    id,
                });
            }
            Some(_) => {}
        }

        let sql = format!(
            r#"
            UPDATE applications SET
                status = $2,
                university_id = $3,
                start_date = $4,
                tuition_amount = $5,
                arrears_amount = $6,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            *APPLICATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(write.status.as_str())
            .bind(terms.university_id)
            .bind(terms.start_date)
            .bind(terms.tuition_amount)
            .bind(terms.arrears_amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(backend)?;
        let application = application_from_row(&row).map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(application)
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
        page: Page,
    ) -> Result<Listing<Application>, StoreError> {
        let status = filter.status.map(|status| status.as_str());

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM applications WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let sql = format!(
            "SELECT {} FROM applications WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY id DESC LIMIT $2 OFFSET $3",
            *APPLICATION_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(status)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(Listing {
            results: map_rows(&rows, application_from_row)?,
            total,
        })
    }

    async fn search_applications(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Application>, StoreError> {
        let pattern = like_pattern(query);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM applications WHERE {}",
            *APPLICATION_SEARCH
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let sql = format!(
            "SELECT {} FROM applications WHERE {} ORDER BY id DESC LIMIT $2 OFFSET $3",
            *APPLICATION_COLUMNS, *APPLICATION_SEARCH
        );
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        Ok(Listing {
            results: map_rows(&rows, application_from_row)?,
            total,
        })
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_deposits(&self, deposits: Vec<NewDeposit>) -> Result<Vec<Deposit>, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO deposits (
                student_id, amount, date, memo, reference_id,
                student_name, student_email, student_mat, complete
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DEPOSIT_COLUMNS}
            "#
        );

        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut inserted = Vec::with_capacity(deposits.len());
        for deposit in deposits {
            let row = sqlx::query(&sql)
                .bind(deposit.student_id)
                .bind(deposit.amount)
                .bind(deposit.date)
                .bind(&deposit.memo)
                .bind(&deposit.reference_id)
                .bind(&deposit.student.student_name)
                .bind(&deposit.student.student_email)
                .bind(&deposit.student.student_mat)
                .bind(deposit.complete)
                .fetch_one(&mut *tx)
                .await
                .map_err(backend)?;
            inserted.push(deposit_from_row(&row).map_err(backend)?);
        }

        tx.commit().await.map_err(backend)?;
        Ok(inserted)
    }

    async fn fetch_deposit(&self, id: i64) -> Result<Option<Deposit>, StoreError> {
        let row = sqlx::query(&format!("SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(deposit_from_row).transpose().map_err(backend)
    }

    async fn update_deposit(&self, deposit: &Deposit) -> Result<Deposit, StoreError> {
        let sql = format!(
            r#"
            UPDATE deposits SET
                student_id = $2,
                amount = $3,
                date = $4,
                memo = $5,
                reference_id = $6,
                student_name = $7,
                student_email = $8,
                student_mat = $9,
                complete = $10,
                voided_at = $11,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $12 AND voided_at IS NULL
            RETURNING {DEPOSIT_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(deposit.id)
            .bind(deposit.student_id)
            .bind(deposit.amount)
            .bind(deposit.date)
            .bind(&deposit.memo)
            .bind(&deposit.reference_id)
            .bind(&deposit.student.student_name)
            .bind(&deposit.student.student_email)
            .bind(&deposit.student.student_mat)
            .bind(deposit.complete)
            .bind(deposit.voided_at)
            .bind(deposit.version)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => deposit_from_row(&row).map_err(backend),
            None => Err(self.missing_or_stale("deposits", "deposit", deposit.id).await),
        }
    }

    async fn list_deposits(
        &self,
        filter: &LedgerFilter,
        page: Page,
    ) -> Result<Listing<Deposit>, StoreError> {
        let condition = "($1::bigint IS NULL OR student_id = $1) AND ($2 OR voided_at IS NULL)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM deposits WHERE {condition}"
        ))
        .bind(filter.student_id)
        .bind(filter.include_voided)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE {condition} \
             ORDER BY id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.student_id)
        .bind(filter.include_voided)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Listing {
            results: map_rows(&rows, deposit_from_row)?,
            total,
        })
    }

    async fn search_deposits(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Deposit>, StoreError> {
        let pattern = like_pattern(query);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM deposits WHERE {LEDGER_SEARCH}"
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits WHERE {LEDGER_SEARCH} \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Listing {
            results: map_rows(&rows, deposit_from_row)?,
            total,
        })
    }

    async fn insert_invoice(&self, invoice: NewInvoice) -> Result<Invoice, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO invoices (
                student_id, amount, memo, "type", student_name, student_email, student_mat
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {INVOICE_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(invoice.student_id)
            .bind(invoice.amount)
            .bind(&invoice.memo)
            .bind(invoice.kind.as_str())
            .bind(&invoice.student.student_name)
            .bind(&invoice.student.student_email)
            .bind(&invoice.student.student_mat)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        invoice_from_row(&row).map_err(backend)
    }

    async fn fetch_invoice(&self, id: i64) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(invoice_from_row).transpose().map_err(backend)
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice, StoreError> {
        let sql = format!(
            r#"
            UPDATE invoices SET
                amount = $2,
                memo = $3,
                "type" = $4,
                student_name = $5,
                student_email = $6,
                student_mat = $7,
                voided_at = $8,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $9 AND voided_at IS NULL
            RETURNING {INVOICE_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(invoice.id)
            .bind(invoice.amount)
            .bind(&invoice.memo)
            .bind(invoice.kind.as_str())
            .bind(&invoice.student.student_name)
            .bind(&invoice.student.student_email)
            .bind(&invoice.student.student_mat)
            .bind(invoice.voided_at)
            .bind(invoice.version)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => invoice_from_row(&row).map_err(backend),
            None => Err(self.missing_or_stale("invoices", "invoice", invoice.id).await),
        }
    }

    async fn list_invoices(
        &self,
        filter: &LedgerFilter,
        page: Page,
    ) -> Result<Listing<Invoice>, StoreError> {
        let condition = "($1::bigint IS NULL OR student_id = $1) AND ($2 OR voided_at IS NULL)";

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM invoices WHERE {condition}"
        ))
        .bind(filter.student_id)
        .bind(filter.include_voided)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE {condition} \
             ORDER BY id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(filter.student_id)
        .bind(filter.include_voided)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Listing {
            results: map_rows(&rows, invoice_from_row)?,
            total,
        })
    }

    async fn search_invoices(
        &self,
        query: &str,
        page: Page,
    ) -> Result<Listing<Invoice>, StoreError> {
        let pattern = like_pattern(query);

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM invoices WHERE {LEDGER_SEARCH}"
        ))
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let rows = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE {LEDGER_SEARCH} \
             ORDER BY id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Listing {
            results: map_rows(&rows, invoice_from_row)?,
            total,
        })
    }

    async fn ledger_for(&self, student_id: i64) -> Result<Ledger, StoreError> {
        let deposit_rows = sqlx::query(&format!(
            "SELECT {DEPOSIT_COLUMNS} FROM deposits \
             WHERE student_id = $1 AND voided_at IS NULL ORDER BY id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let invoice_rows = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE student_id = $1 AND voided_at IS NULL ORDER BY id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Ledger {
            deposits: map_rows(&deposit_rows, deposit_from_row)?,
            invoices: map_rows(&invoice_rows, invoice_from_row)?,
        })
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO comments (student_id, message)
            VALUES ($1, $2)
            RETURNING id, student_id, message, created_at, updated_at
            "#,
        )
        .bind(comment.student_id)
        .bind(&comment.message)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        comment_from_row(&row).map_err(backend)
    }

    async fn fetch_comment(&self, id: i64) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query(
            "SELECT id, student_id, message, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(comment_from_row).transpose().map_err(backend)
    }

    async fn update_comment(&self, id: i64, message: &str) -> Result<Comment, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE comments SET message = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, student_id, message, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(message)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => comment_from_row(&row).map_err(backend),
            None => Err(StoreError::NotFound {
                entity: "comment",
                id,
            }),
        }
    }

    async fn list_comments(&self, student_id: i64) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, student_id, message, created_at, updated_at
            FROM comments
            WHERE student_id = $1
            ORDER BY id
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        map_rows(&rows, comment_from_row)
    }
}

#[async_trait]
impl UniversityStore for PgStore {
    async fn insert_university(
        &self,
        university: NewUniversity,
    ) -> Result<University, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO universities (
                name, app_fee_flat, app_fee_percentage,
                during_studies_min_payment, during_studies_membership_fee,
                after_studies_min_payment, after_studies_membership_fee
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {UNIVERSITY_COLUMNS}
            "#
        );

        let row = sqlx::query(&sql)
            .bind(&university.name)
            .bind(university.app_fee_flat)
            .bind(university.app_fee_percentage)
            .bind(university.during_studies_min_payment)
            .bind(university.during_studies_membership_fee)
            .bind(university.after_studies_min_payment)
            .bind(university.after_studies_membership_fee)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| unique_or_backend(err, "name", &university.name))?;

        university_from_row(&row).map_err(backend)
    }

    async fn fetch_university(&self, id: i64) -> Result<Option<University>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {UNIVERSITY_COLUMNS} FROM universities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref()
            .map(university_from_row)
            .transpose()
            .map_err(backend)
    }

    async fn list_universities(&self) -> Result<Vec<University>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {UNIVERSITY_COLUMNS} FROM universities ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        map_rows(&rows, university_from_row)
    }
}
