//! Rules gating ticket and comment creation.
//!
//! Each check reports the first failing condition only.

use std::sync::LazyLock;

use derive_more::Display;
use regex::Regex;

static EMPLOYEE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^VPPL(0[1-9]|[1-9][0-9])$").expect("valid regex")
});

static EMPLOYEE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9._-]*[A-Za-z]@venturebiz\.in$")
        .expect("valid regex")
});

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Error {
    #[display("{_0} is required")]
    MissingField(&'static str),

    #[display("employee ID must be VPPL followed by two digits 01-99")]
    InvalidEmployeeId,

    #[display("employee email must be an @venturebiz.in address")]
    InvalidEmailDomain,
}

impl std::error::Error for Error {}

/// Returns the value of a required field, which must not be blank.
pub fn required(
    field: &'static str,
    value: Option<String>,
) -> Result<String, Error> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(Error::MissingField(field))
}

pub fn employee_id(value: &str) -> Result<(), Error> {
    EMPLOYEE_ID
        .is_match(value)
        .then_some(())
        .ok_or(Error::InvalidEmployeeId)
}

pub fn employee_email(value: &str) -> Result<(), Error> {
    EMPLOYEE_EMAIL
        .is_match(value)
        .then_some(())
        .ok_or(Error::InvalidEmailDomain)
}
