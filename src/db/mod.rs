pub mod comment;
pub mod migration;
pub mod ticket;

use std::error::Error as StdError;

use async_trait::async_trait;
use derive_more::Display;
use time::OffsetDateTime;
use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

use crate::config;

pub use self::{comment::Comment, ticket::Ticket};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

pub async fn connect(
    config: config::Db,
) -> Result<(Client, Connection), Error> {
    tokio_postgres::connect(&config.url, NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
        .map_err(Into::into)
}

pub struct Client(tokio_postgres::Client);

#[derive(Debug, Display)]
pub enum Error {
    /// Another ticket already carries this code.
    #[display("ticket code {_0} is already taken")]
    DuplicateCode(ticket::Code),

    #[display("{_0}")]
    Backend(Box<dyn StdError + Send + Sync>),
}

impl StdError for Error {}

impl From<tokio_postgres::Error> for Error {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Backend(Box::new(e))
    }
}

/// Datastore operations the HTTP layer is written against.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new ticket under `code`, with `status` set to `Open` and
    /// both timestamps set to `at`.
    ///
    /// Fails with [`Error::DuplicateCode`] if `code` is already taken.
    async fn insert_ticket(
        &self,
        code: &ticket::Code,
        new: &ticket::New,
        at: OffsetDateTime,
    ) -> Result<Ticket, Error>;

    /// Returns all tickets, newest first.
    async fn list_tickets(&self) -> Result<Vec<Ticket>, Error>;

    async fn get_ticket(
        &self,
        key: &ticket::Key,
    ) -> Result<Option<Ticket>, Error>;

    async fn update_ticket_status(
        &self,
        key: &ticket::Key,
        status: &ticket::Status,
        at: OffsetDateTime,
    ) -> Result<Option<Ticket>, Error>;

    /// Resolves `key` to the primary identity of an existing ticket.
    async fn resolve_ticket(
        &self,
        key: &ticket::Key,
    ) -> Result<Option<ticket::Id>, Error>;

    async fn insert_comment(
        &self,
        ticket: ticket::Id,
        new: &comment::New,
        at: OffsetDateTime,
    ) -> Result<Comment, Error>;

    /// Returns the comments of `ticket`, oldest first.
    async fn list_comments(
        &self,
        ticket: ticket::Id,
    ) -> Result<Vec<Comment>, Error>;
}

// `Client::*` paths below resolve to the inherent SQL methods in `ticket`
// and `comment`, which shadow the trait methods of the same name.
#[async_trait]
impl Store for Client {
    async fn insert_ticket(
        &self,
        code: &ticket::Code,
        new: &ticket::New,
        at: OffsetDateTime,
    ) -> Result<Ticket, Error> {
        Client::insert_ticket(self, code, new, at).await
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>, Error> {
        Client::list_tickets(self).await
    }

    async fn get_ticket(
        &self,
        key: &ticket::Key,
    ) -> Result<Option<Ticket>, Error> {
        Client::get_ticket(self, key).await
    }

    async fn update_ticket_status(
        &self,
        key: &ticket::Key,
        status: &ticket::Status,
        at: OffsetDateTime,
    ) -> Result<Option<Ticket>, Error> {
        Client::update_ticket_status(self, key, status, at).await
    }

    async fn resolve_ticket(
        &self,
        key: &ticket::Key,
    ) -> Result<Option<ticket::Id>, Error> {
        Client::resolve_ticket(self, key).await
    }

    async fn insert_comment(
        &self,
        ticket: ticket::Id,
        new: &comment::New,
        at: OffsetDateTime,
    ) -> Result<Comment, Error> {
        Client::insert_comment(self, ticket, new, at).await
    }

    async fn list_comments(
        &self,
        ticket: ticket::Id,
    ) -> Result<Vec<Comment>, Error> {
        Client::list_comments(self, ticket).await
    }
}
