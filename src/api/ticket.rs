use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{db, validation};

pub use crate::db::ticket::{Code, Id, Status};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Ticket {
    pub id: Id,
    pub ticket_id: Code,
    pub emp_id: String,
    pub emp_name: String,
    pub emp_email: String,
    pub department: String,
    pub priority: String,
    pub issue_type: String,
    pub description: String,
    pub status: Status,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<db::Ticket> for Ticket {
    fn from(ticket: db::Ticket) -> Self {
        Self {
            id: ticket.id,
            ticket_id: ticket.code,
            emp_id: ticket.employee_id,
            emp_name: ticket.employee_name,
            emp_email: ticket.employee_email,
            department: ticket.department,
            priority: ticket.priority,
            issue_type: ticket.issue_type,
            description: ticket.description,
            status: ticket.status,
            created_at: ticket.created_at,
            updated_at: ticket.updated_at,
        }
    }
}

/// Body of a ticket creation request.
///
/// Every field is optional on the wire so that an absent one is reported
/// as missing instead of as a malformed body.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NewTicket {
    #[serde(alias = "employee_id")]
    pub emp_id: Option<String>,
    #[serde(alias = "employee_name")]
    pub emp_name: Option<String>,
    #[serde(alias = "employee_email")]
    pub emp_email: Option<String>,
    pub department: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub description: Option<String>,
}

impl NewTicket {
    pub fn validate(self) -> Result<db::ticket::New, validation::Error> {
        use validation::required;

        let new = db::ticket::New {
            employee_id: required("emp_id", self.emp_id)?,
            employee_name: required("emp_name", self.emp_name)?,
            employee_email: required("emp_email", self.emp_email)?,
            department: required("department", self.department)?,
            priority: required("priority", self.priority)?,
            issue_type: required("issue_type", self.issue_type)?,
            description: required("description", self.description)?,
        };
        validation::employee_id(&new.employee_id)?;
        validation::employee_email(&new.employee_email)?;
        Ok(new)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

impl StatusUpdate {
    pub fn validate(self) -> Result<Status, validation::Error> {
        self.status
            .and_then(Status::new)
            .ok_or(validation::Error::MissingField("status"))
    }
}
