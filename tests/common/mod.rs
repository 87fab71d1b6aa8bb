#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use helpdesk::{
    api,
    db::{self, comment, ticket, Store},
    http,
};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tokio::net::TcpListener;

pub use helpdesk::db::ticket::KeyKind;

/// [`Store`] keeping everything in memory.
#[derive(Clone, Default)]
pub struct MemoryStore(Arc<Mutex<Inner>>);

#[derive(Default)]
struct Inner {
    tickets: Vec<db::Ticket>,
    comments: Vec<db::Comment>,
    next_ticket_id: i64,
    next_comment_id: i64,
    collisions_left: usize,
    insert_attempts: usize,
    broken: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the next `n` generated codes as already taken.
    pub fn with_collisions(n: usize) -> Self {
        let store = Self::default();
        store.0.lock().unwrap().collisions_left = n;
        store
    }

    /// Fails every operation as an unreachable database would.
    pub fn broken() -> Self {
        let store = Self::default();
        store.0.lock().unwrap().broken = true;
        store
    }

    pub fn ticket_count(&self) -> usize {
        self.0.lock().unwrap().tickets.len()
    }

    pub fn comment_count(&self) -> usize {
        self.0.lock().unwrap().comments.len()
    }

    pub fn insert_attempts(&self) -> usize {
        self.0.lock().unwrap().insert_attempts
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, db::Error> {
        let inner = self.0.lock().unwrap();
        if inner.broken {
            return Err(db::Error::Backend("connection refused".into()));
        }
        Ok(inner)
    }
}

impl Inner {
    fn find(&mut self, key: &ticket::Key) -> Option<&mut db::Ticket> {
        self.tickets.iter_mut().find(|t| match key {
            ticket::Key::Id(id) => t.id == *id,
            ticket::Key::Code(code) => t.code == *code,
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_ticket(
        &self,
        code: &ticket::Code,
        new: &ticket::New,
        at: OffsetDateTime,
    ) -> Result<db::Ticket, db::Error> {
        let mut inner = self.lock()?;
        inner.insert_attempts += 1;
        if inner.collisions_left > 0
            || inner.tickets.iter().any(|t| t.code == *code)
        {
            inner.collisions_left = inner.collisions_left.saturating_sub(1);
            return Err(db::Error::DuplicateCode(code.clone()));
        }

        inner.next_ticket_id += 1;
        let ticket = db::Ticket {
            id: ticket::Id::from(inner.next_ticket_id),
            code: code.clone(),
            employee_id: new.employee_id.clone(),
            employee_name: new.employee_name.clone(),
            employee_email: new.employee_email.clone(),
            department: new.department.clone(),
            priority: new.priority.clone(),
            issue_type: new.issue_type.clone(),
            description: new.description.clone(),
            status: ticket::Status::open(),
            created_at: at,
            updated_at: at,
        };
        inner.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn list_tickets(&self) -> Result<Vec<db::Ticket>, db::Error> {
        let mut tickets = self.lock()?.tickets.clone();
        tickets.sort_by(|a, b| {
            (b.created_at, b.id).cmp(&(a.created_at, a.id))
        });
        Ok(tickets)
    }

    async fn get_ticket(
        &self,
        key: &ticket::Key,
    ) -> Result<Option<db::Ticket>, db::Error> {
        Ok(self.lock()?.find(key).cloned())
    }

    async fn update_ticket_status(
        &self,
        key: &ticket::Key,
        status: &ticket::Status,
        at: OffsetDateTime,
    ) -> Result<Option<db::Ticket>, db::Error> {
        let mut inner = self.lock()?;
        Ok(inner.find(key).map(|ticket| {
            ticket.status = status.clone();
            ticket.updated_at = at;
            ticket.clone()
        }))
    }

    async fn resolve_ticket(
        &self,
        key: &ticket::Key,
    ) -> Result<Option<ticket::Id>, db::Error> {
        Ok(self.lock()?.find(key).map(|ticket| ticket.id))
    }

    async fn insert_comment(
        &self,
        ticket: ticket::Id,
        new: &comment::New,
        at: OffsetDateTime,
    ) -> Result<db::Comment, db::Error> {
        let mut inner = self.lock()?;
        if !inner.tickets.iter().any(|t| t.id == ticket) {
            return Err(db::Error::Backend("foreign key violation".into()));
        }

        inner.next_comment_id += 1;
        let comment = db::Comment {
            id: comment::Id::from(inner.next_comment_id),
            ticket,
            comment: new.comment.clone(),
            author: new.author.clone(),
            created_at: at,
        };
        inner.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(
        &self,
        ticket: ticket::Id,
    ) -> Result<Vec<db::Comment>, db::Error> {
        let mut comments = self
            .lock()?
            .comments
            .iter()
            .filter(|c| c.ticket == ticket)
            .cloned()
            .collect::<Vec<_>>();
        comments.sort_by_key(|c| (c.created_at, c.id));
        Ok(comments)
    }
}

/// Serves the application over a [`MemoryStore`] on an ephemeral port.
pub async fn spawn(store: MemoryStore, lookup_key: KeyKind) -> Client {
    serve(store, lookup_key).await
}

/// Serves the application over `store` on an ephemeral port.
pub async fn serve(
    store: impl Store + 'static,
    lookup_key: KeyKind,
) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local address");

    let app = http::router(http::AppState {
        store: Box::new(store),
        lookup_key,
        create_attempts: 3,
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server failed");
    });

    Client::new(format!("http://{addr}"))
}

pub fn valid_ticket() -> Value {
    json!({
        "emp_id": "VPPL07",
        "emp_name": "John Doe",
        "emp_email": "john.doe@venturebiz.in",
        "department": "Finance",
        "priority": "High",
        "issue_type": "Hardware",
        "description": "Laptop does not boot",
    })
}

pub struct Client {
    inner: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(base_url: String) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/tickets{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        req: RequestBuilder,
        expected: StatusCode,
    ) -> Result<T, StatusCode> {
        let res = req.send().await.expect("failed to send a request");
        if res.status() != expected {
            return Err(res.status());
        }
        Ok(res.json::<T>().await.expect("failed to get a response"))
    }

    /// Sends `body` verbatim and returns the status with the decoded body.
    pub async fn raw(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &str,
    ) -> (StatusCode, Value) {
        let res = self
            .inner
            .request(method, self.url(path))
            .header("Content-Type", "application/json")
            .body(body.to_owned())
            .send()
            .await
            .expect("failed to send a request");
        let status = res.status();
        let body = res.json::<Value>().await.expect("failed to get a response");
        (status, body)
    }

    pub async fn add_ticket(
        &self,
        payload: &Value,
    ) -> Result<api::Ticket, StatusCode> {
        Self::send(
            self.inner.post(self.url("")).json(payload),
            StatusCode::CREATED,
        )
        .await
    }

    pub async fn get_tickets(&self) -> Result<Vec<api::Ticket>, StatusCode> {
        Self::send(self.inner.get(self.url("")), StatusCode::OK).await
    }

    pub async fn get_ticket(
        &self,
        key: impl std::fmt::Display,
    ) -> Result<api::Ticket, StatusCode> {
        Self::send(self.inner.get(self.url(&format!("/{key}"))), StatusCode::OK)
            .await
    }

    pub async fn set_status(
        &self,
        key: impl std::fmt::Display,
        payload: &Value,
    ) -> Result<api::Ticket, StatusCode> {
        Self::send(
            self.inner
                .put(self.url(&format!("/{key}/status")))
                .json(payload),
            StatusCode::OK,
        )
        .await
    }

    pub async fn patch_status(
        &self,
        key: impl std::fmt::Display,
        status: &str,
    ) -> Result<api::Ticket, StatusCode> {
        Self::send(
            self.inner
                .patch(self.url(&format!("/{key}/status")))
                .json(&json!({ "status": status })),
            StatusCode::OK,
        )
        .await
    }

    pub async fn add_comment(
        &self,
        key: impl std::fmt::Display,
        payload: &Value,
    ) -> Result<api::comment::Added, StatusCode> {
        Self::send(
            self.inner
                .post(self.url(&format!("/{key}/comments")))
                .json(payload),
            StatusCode::CREATED,
        )
        .await
    }

    pub async fn get_comments(
        &self,
        key: impl std::fmt::Display,
    ) -> Result<Vec<api::Comment>, StatusCode> {
        Self::send(
            self.inner.get(self.url(&format!("/{key}/comments"))),
            StatusCode::OK,
        )
        .await
    }
}
