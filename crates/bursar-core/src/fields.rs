//! Mapping between external application field names and their storage columns.
//!
//! Payloads and responses use the external names (`first_name`); the intake form
//! schema that the storage layer inherited uses prefixed names
//! (`basicInformation_firstname`). Deserialization accepts both, responses only emit
//! the external one.

use crate::models::Application;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationField {
    ReferenceCode,
    DateApplied,
    Email,
    Email2,
    FirstName,
    LastName,
    PhoneNumber,
    MatNumber,
    UniversityString,
    Country,
    Region,
    Address,
    GraduationDate,
    Status,
    UniversityId,
    StartDate,
    TuitionAmount,
    ArrearsAmount,
}

impl ApplicationField {
    pub const ALL: [ApplicationField; 18] = [
        ApplicationField::ReferenceCode,
        ApplicationField::DateApplied,
        ApplicationField::Email,
        ApplicationField::Email2,
        ApplicationField::FirstName,
        ApplicationField::LastName,
        ApplicationField::PhoneNumber,
        ApplicationField::MatNumber,
        ApplicationField::UniversityString,
        ApplicationField::Country,
        ApplicationField::Region,
        ApplicationField::Address,
        ApplicationField::GraduationDate,
        ApplicationField::Status,
        ApplicationField::UniversityId,
        ApplicationField::StartDate,
        ApplicationField::TuitionAmount,
        ApplicationField::ArrearsAmount,
    ];

    /// Fields covered by application text search.
    pub const SEARCHABLE: [ApplicationField; 7] = [
        ApplicationField::Email,
        ApplicationField::FirstName,
        ApplicationField::LastName,
        ApplicationField::Address,
        ApplicationField::Country,
        ApplicationField::Region,
        ApplicationField::MatNumber,
    ];

    pub const fn external(self) -> &'static str {
        match self {
            ApplicationField::ReferenceCode => "reference_code",
            ApplicationField::DateApplied => "date_applied",
            ApplicationField::Email => "email",
            ApplicationField::Email2 => "email2",
            ApplicationField::FirstName => "first_name",
            ApplicationField::LastName => "last_name",
            ApplicationField::PhoneNumber => "phone_number",
            ApplicationField::MatNumber => "mat_number",
            ApplicationField::UniversityString => "university_string",
            ApplicationField::Country => "country",
            ApplicationField::Region => "region",
            ApplicationField::Address => "address",
            ApplicationField::GraduationDate => "graduation_date",
            ApplicationField::Status => "status",
            ApplicationField::UniversityId => "university_id",
            ApplicationField::StartDate => "start_date",
            ApplicationField::TuitionAmount => "tuition_amount",
            ApplicationField::ArrearsAmount => "arrears_amount",
        }
    }

    pub const fn column(self) -> &'static str {
        match self {
            ApplicationField::ReferenceCode => "jpfID",
            ApplicationField::DateApplied => "startTime",
            ApplicationField::Email => "email",
            ApplicationField::Email2 => "basicInformation_email",
            ApplicationField::FirstName => "basicInformation_firstname",
            ApplicationField::LastName => "basicInformation_lastname",
            ApplicationField::PhoneNumber => "basicInformation_mobile",
            ApplicationField::MatNumber => "academicInformation_studentID",
            ApplicationField::UniversityString => "academicInformation_school",
            ApplicationField::Country => "basicInformation_countryofresidence",
            ApplicationField::Region => "basicInformation_regionofresidence",
            ApplicationField::Address => "basicInformation_address",
            ApplicationField::GraduationDate => "academicInformation_graduation",
            ApplicationField::Status => "status",
            ApplicationField::UniversityId => "university_id",
            ApplicationField::StartDate => "start_date",
            ApplicationField::TuitionAmount => "tuition_amount",
            ApplicationField::ArrearsAmount => "arrears_amount",
        }
    }

    /// Text value of a string-typed field; `None` for unset or non-text fields.
    pub fn text_of(self, application: &Application) -> Option<&str> {
        match self {
            ApplicationField::ReferenceCode => Some(application.reference_code.as_str()),
            ApplicationField::Email => application.email.as_deref(),
            ApplicationField::Email2 => application.email2.as_deref(),
            ApplicationField::FirstName => Some(application.first_name.as_str()),
            ApplicationField::LastName => Some(application.last_name.as_str()),
            ApplicationField::PhoneNumber => application.phone_number.as_deref(),
            ApplicationField::MatNumber => Some(application.mat_number.as_str()),
            ApplicationField::UniversityString => application.university_string.as_deref(),
            ApplicationField::Country => application.country.as_deref(),
            ApplicationField::Region => application.region.as_deref(),
            ApplicationField::Address => application.address.as_deref(),
            ApplicationField::DateApplied
            | ApplicationField::GraduationDate
            | ApplicationField::Status
            | ApplicationField::UniversityId
            | ApplicationField::StartDate
            | ApplicationField::TuitionAmount
            | ApplicationField::ArrearsAmount => None,
        }
    }

    /// Column name quoted for SQL, preserving its case.
    pub fn quoted_column(self) -> String {
        format!("\"{}\"", self.column())
    }
}
