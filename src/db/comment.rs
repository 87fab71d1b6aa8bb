use std::error::Error as StdError;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::{
    types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    },
    Row,
};

use super::{ticket, Client, Error};

#[derive(Clone, Debug)]
pub struct Comment {
    pub id: Id,
    pub ticket: ticket::Id,
    pub comment: String,
    pub author: String,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct New {
    pub comment: String,
    pub author: String,
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

fn from_row(row: &Row) -> Comment {
    Comment {
        id: row.get("id"),
        ticket: row.get("ticket_id"),
        comment: row.get("comment"),
        author: row.get("author"),
        created_at: row.get("created_at"),
    }
}

impl Client {
    pub(crate) async fn insert_comment(
        &self,
        ticket: ticket::Id,
        new: &New,
        at: OffsetDateTime,
    ) -> Result<Comment, Error> {
        const SQL: &str = "\
            INSERT INTO comments (ticket_id, comment, author, created_at) \
            VALUES ($1, $2, $3, $4) \
            RETURNING id, ticket_id, comment, author, created_at";
        let row = self
            .0
            .query_one(SQL, &[&ticket, &new.comment, &new.author, &at])
            .await?;
        Ok(from_row(&row))
    }

    pub(crate) async fn list_comments(
        &self,
        ticket: ticket::Id,
    ) -> Result<Vec<Comment>, Error> {
        const SQL: &str = "\
            SELECT id, ticket_id, comment, author, created_at \
            FROM comments \
            WHERE ticket_id = $1 \
            ORDER BY created_at ASC, \
                     id ASC";
        Ok(self
            .0
            .query(SQL, &[&ticket])
            .await?
            .iter()
            .map(from_row)
            .collect())
    }
}
