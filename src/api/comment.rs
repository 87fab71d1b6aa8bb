use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{api::ticket, db, validation};

pub use crate::db::comment::Id;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Comment {
    pub id: Id,
    pub ticket_id: ticket::Id,
    pub comment: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<db::Comment> for Comment {
    fn from(comment: db::Comment) -> Self {
        Self {
            id: comment.id,
            ticket_id: comment.ticket,
            comment: comment.comment,
            author: comment.author,
            created_at: comment.created_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NewComment {
    pub comment: Option<String>,
    pub author: Option<String>,
}

impl NewComment {
    pub fn validate(self) -> Result<db::comment::New, validation::Error> {
        Ok(db::comment::New {
            comment: validation::required("comment", self.comment)?,
            author: validation::required("author", self.author)?,
        })
    }
}

/// Acknowledgment of an added comment.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Added {
    pub message: String,
    pub comment: Comment,
}

impl Added {
    pub const MESSAGE: &'static str = "Comment added successfully";
}
