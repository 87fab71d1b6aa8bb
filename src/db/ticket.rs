use std::error::Error as StdError;

use constcat::concat;
use derive_more::Display;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{
    error::SqlState,
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};

use super::{Client, Error};

#[derive(Clone, Debug)]
pub struct Ticket {
    pub id: Id,
    pub code: Code,
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: String,
    pub department: String,
    pub priority: String,
    pub issue_type: String,
    pub description: String,
    pub status: Status,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated fields of a ticket that is about to be created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct New {
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: String,
    pub department: String,
    pub priority: String,
    pub issue_type: String,
    pub description: String,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct Id(i64);

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromSql<'_> for Id {
    accepts!(INT8);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i64::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT8);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

/// Human-facing ticket code, e.g. `VPPL7K2Q9X`.
#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    pub const PREFIX: &'static str = "VPPL";

    /// Number of random characters following [`Code::PREFIX`].
    pub const RANDOM_LEN: usize = 6;

    /// Total length of a code.
    pub const LEN: usize = Self::PREFIX.len() + Self::RANDOM_LEN;

    const ALPHABET: &'static [u8; 36] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Draws a fresh code. Uniqueness is only guaranteed by the store.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let mut code = String::with_capacity(Self::LEN);
        code.push_str(Self::PREFIX);
        for _ in 0..Self::RANDOM_LEN {
            let i = rng.random_range(0..Self::ALPHABET.len());
            code.push(char::from(Self::ALPHABET[i]));
        }
        Self(code)
    }

    /// Accepts `raw` only if it has exactly the shape of a generated code.
    pub fn parse(raw: &str) -> Option<Self> {
        let suffix = raw.strip_prefix(Self::PREFIX)?;
        (suffix.len() == Self::RANDOM_LEN
            && suffix.bytes().all(|b| Self::ALPHABET.contains(&b)))
        .then(|| Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromSql<'_> for Code {
    accepts!(VARCHAR, TEXT, BPCHAR);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Code {
    accepts!(VARCHAR, TEXT, BPCHAR);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

/// Free-form ticket status. Any non-blank value is accepted, and no
/// transition between values is forbidden.
#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
    pub const OPEN: &'static str = "Open";

    pub fn open() -> Self {
        Self(Self::OPEN.to_owned())
    }

    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.trim().is_empty()).then_some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromSql<'_> for Status {
    accepts!(VARCHAR, TEXT, BPCHAR);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        String::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Status {
    accepts!(VARCHAR, TEXT, BPCHAR);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

/// Which identity a deployment uses to address tickets from the outside.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Numeric primary identity.
    #[default]
    Id,

    /// Human-facing [`Code`].
    Code,
}

impl KeyKind {
    /// Parses a path segment as a ticket key of this kind.
    ///
    /// Returns `None` if `raw` can't possibly address a ticket.
    pub fn parse(self, raw: &str) -> Option<Key> {
        match self {
            Self::Id => {
                let canonical = raw.starts_with(|c: char| c != '0')
                    && raw.bytes().all(|b| b.is_ascii_digit());
                if !canonical {
                    return None;
                }
                raw.parse::<i64>().ok().map(|id| Key::Id(Id(id)))
            }
            Self::Code => Code::parse(raw).map(Key::Code),
        }
    }
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Key {
    Id(Id),
    Code(Code),
}

const COLUMNS: &str = "\
    id, ticket_id, emp_id, emp_name, emp_email, \
    department, priority, issue_type, description, \
    status, created_at, updated_at";

const SELECT: &str = concat!("SELECT ", COLUMNS, " FROM tickets ");

fn from_row(row: &Row) -> Ticket {
    Ticket {
        id: row.get("id"),
        code: row.get("ticket_id"),
        employee_id: row.get("emp_id"),
        employee_name: row.get("emp_name"),
        employee_email: row.get("emp_email"),
        department: row.get("department"),
        priority: row.get("priority"),
        issue_type: row.get("issue_type"),
        description: row.get("description"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl Client {
    pub(crate) async fn insert_ticket(
        &self,
        code: &Code,
        new: &New,
        at: OffsetDateTime,
    ) -> Result<Ticket, Error> {
        const SQL: &str = concat!(
            "INSERT INTO tickets (ticket_id, emp_id, emp_name, emp_email, \
                                  department, priority, issue_type, \
                                  description, status, \
                                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) \
             RETURNING ",
            COLUMNS,
        );

        self.0
            .query_one(
                SQL,
                &[
                    code,
                    &new.employee_id,
                    &new.employee_name,
                    &new.employee_email,
                    &new.department,
                    &new.priority,
                    &new.issue_type,
                    &new.description,
                    &Status::open(),
                    &at,
                ],
            )
            .await
            .map(|row| from_row(&row))
            .map_err(|e| {
                let code_taken = e.code() == Some(&SqlState::UNIQUE_VIOLATION)
                    && e.as_db_error().and_then(|e| e.constraint())
                        == Some("tickets_ticket_id_key");
                if code_taken {
                    Error::DuplicateCode(code.clone())
                } else {
                    e.into()
                }
            })
    }

    pub(crate) async fn list_tickets(&self) -> Result<Vec<Ticket>, Error> {
        const SQL: &str =
            concat!(SELECT, "ORDER BY created_at DESC, id DESC");
        Ok(self.0.query(SQL, &[]).await?.iter().map(from_row).collect())
    }

    pub(crate) async fn get_ticket(
        &self,
        key: &Key,
    ) -> Result<Option<Ticket>, Error> {
        let row = match key {
            Key::Id(id) => {
                const SQL: &str = concat!(SELECT, "WHERE id = $1");
                self.0.query_opt(SQL, &[id]).await?
            }
            Key::Code(code) => {
                const SQL: &str = concat!(SELECT, "WHERE ticket_id = $1");
                self.0.query_opt(SQL, &[code]).await?
            }
        };
        Ok(row.as_ref().map(from_row))
    }

    pub(crate) async fn update_ticket_status(
        &self,
        key: &Key,
        status: &Status,
        at: OffsetDateTime,
    ) -> Result<Option<Ticket>, Error> {
        const UPDATE: &str =
            "UPDATE tickets SET status = $1, updated_at = $2 ";
        let row = match key {
            Key::Id(id) => {
                const SQL: &str =
                    concat!(UPDATE, "WHERE id = $3 RETURNING ", COLUMNS);
                self.0.query_opt(SQL, &[status, &at, id]).await?
            }
            Key::Code(code) => {
                const SQL: &str = concat!(
                    UPDATE,
                    "WHERE ticket_id = $3 RETURNING ",
                    COLUMNS,
                );
                self.0.query_opt(SQL, &[status, &at, code]).await?
            }
        };
        Ok(row.as_ref().map(from_row))
    }

    pub(crate) async fn resolve_ticket(
        &self,
        key: &Key,
    ) -> Result<Option<Id>, Error> {
        let row = match key {
            Key::Id(id) => {
                const SQL: &str = "SELECT id FROM tickets WHERE id = $1";
                self.0.query_opt(SQL, &[id]).await?
            }
            Key::Code(code) => {
                const SQL: &str =
                    "SELECT id FROM tickets WHERE ticket_id = $1";
                self.0.query_opt(SQL, &[code]).await?
            }
        };
        Ok(row.map(|row| row.get("id")))
    }
}
