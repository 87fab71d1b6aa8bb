use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use derive_more::From;
use serde_json::json;
use time::OffsetDateTime;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::{
    api,
    db::{self, ticket::KeyKind},
    validation,
};

pub type SharedAppState = Arc<AppState>;

pub struct AppState {
    pub store: Box<dyn db::Store>,

    /// Identity carried by the `{key}` segment of ticket routes.
    pub lookup_key: KeyKind,

    /// Upper bound of codes drawn for a single ticket creation.
    pub create_attempts: usize,
}

pub fn router(state: AppState) -> Router {
    let state = AppState {
        create_attempts: state.create_attempts.max(1),
        ..state
    };
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/:key", get(get_ticket))
        .route(
            "/api/tickets/:key/status",
            put(update_ticket_status).patch(update_ticket_status),
        )
        .route(
            "/api/tickets/:key/comments",
            get(list_comments).post(add_comment),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Resolves once the process is asked to stop.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutting down");
}

fn error(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

fn internal_error(e: &dyn std::fmt::Display) -> Response {
    tracing::error!("request failed: {e}");
    error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Ticket not found")
}

async fn create_ticket(
    State(state): State<SharedAppState>,
    input: Result<Json<api::ticket::NewTicket>, JsonRejection>,
) -> Result<(StatusCode, Json<api::Ticket>), CreateTicketError> {
    use CreateTicketError as E;

    let Json(input) = input?;
    let new = input.validate()?;

    let now = OffsetDateTime::now_utc();
    for attempt in 1..=state.create_attempts {
        let code = db::ticket::Code::generate();
        match state.store.insert_ticket(&code, &new, now).await {
            Ok(ticket) => {
                tracing::info!(
                    id = %ticket.id,
                    code = %ticket.code,
                    "ticket created",
                );
                return Ok((StatusCode::CREATED, Json(ticket.into())));
            }
            Err(db::Error::DuplicateCode(code)) => {
                tracing::warn!(%code, attempt, "ticket code collision");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(E::CodesExhausted)
}

#[derive(Debug, From)]
pub enum CreateTicketError {
    #[from]
    DbError(db::Error),
    #[from]
    InvalidInput(validation::Error),
    #[from]
    MalformedBody(JsonRejection),
    CodesExhausted,
}

impl IntoResponse for CreateTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(e) => error(StatusCode::BAD_REQUEST, e),
            Self::MalformedBody(e) => {
                error(StatusCode::BAD_REQUEST, e.body_text())
            }
            Self::DbError(e) => internal_error(&e),
            Self::CodesExhausted => {
                internal_error(&"no free ticket code after retries")
            }
        }
    }
}

async fn list_tickets(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<api::Ticket>>, ListTicketsError> {
    let tickets = state.store.list_tickets().await?;
    Ok(Json(tickets.into_iter().map(Into::into).collect()))
}

#[derive(Debug, From)]
pub enum ListTicketsError {
    #[from]
    DbError(db::Error),
}

impl IntoResponse for ListTicketsError {
    fn into_response(self) -> Response {
        match self {
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn get_ticket(
    State(state): State<SharedAppState>,
    Path(key): Path<String>,
) -> Result<Json<api::Ticket>, GetTicketError> {
    use GetTicketError as E;

    let key = state.lookup_key.parse(&key).ok_or(E::TicketNotFound)?;
    let ticket = state
        .store
        .get_ticket(&key)
        .await?
        .ok_or(E::TicketNotFound)?;

    Ok(Json(ticket.into()))
}

#[derive(Debug, From)]
pub enum GetTicketError {
    #[from]
    DbError(db::Error),
    TicketNotFound,
}

impl IntoResponse for GetTicketError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound => not_found(),
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn update_ticket_status(
    State(state): State<SharedAppState>,
    Path(key): Path<String>,
    input: Result<Json<api::ticket::StatusUpdate>, JsonRejection>,
) -> Result<Json<api::Ticket>, UpdateTicketStatusError> {
    use UpdateTicketStatusError as E;

    let Json(input) = input?;
    let status = input.validate()?;

    let key = state.lookup_key.parse(&key).ok_or(E::TicketNotFound)?;
    let ticket = state
        .store
        .update_ticket_status(&key, &status, OffsetDateTime::now_utc())
        .await?
        .ok_or(E::TicketNotFound)?;

    tracing::info!(
        id = %ticket.id,
        status = %ticket.status,
        "ticket status updated",
    );
    Ok(Json(ticket.into()))
}

#[derive(Debug, From)]
pub enum UpdateTicketStatusError {
    #[from]
    DbError(db::Error),
    #[from]
    InvalidInput(validation::Error),
    #[from]
    MalformedBody(JsonRejection),
    TicketNotFound,
}

impl IntoResponse for UpdateTicketStatusError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(e) => error(StatusCode::BAD_REQUEST, e),
            Self::MalformedBody(e) => {
                error(StatusCode::BAD_REQUEST, e.body_text())
            }
            Self::TicketNotFound => not_found(),
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn add_comment(
    State(state): State<SharedAppState>,
    Path(key): Path<String>,
    input: Result<Json<api::comment::NewComment>, JsonRejection>,
) -> Result<(StatusCode, Json<api::comment::Added>), AddCommentError> {
    use AddCommentError as E;

    let Json(input) = input?;
    let new = input.validate()?;

    // A missing ticket is a 404, never a foreign key violation.
    let key = state.lookup_key.parse(&key).ok_or(E::TicketNotFound)?;
    let ticket = state
        .store
        .resolve_ticket(&key)
        .await?
        .ok_or(E::TicketNotFound)?;

    let comment = state
        .store
        .insert_comment(ticket, &new, OffsetDateTime::now_utc())
        .await?;

    tracing::info!(id = %comment.id, ticket = %ticket, "comment added");
    Ok((
        StatusCode::CREATED,
        Json(api::comment::Added {
            message: api::comment::Added::MESSAGE.to_owned(),
            comment: comment.into(),
        }),
    ))
}

#[derive(Debug, From)]
pub enum AddCommentError {
    #[from]
    DbError(db::Error),
    #[from]
    InvalidInput(validation::Error),
    #[from]
    MalformedBody(JsonRejection),
    TicketNotFound,
}

impl IntoResponse for AddCommentError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(e) => error(StatusCode::BAD_REQUEST, e),
            Self::MalformedBody(e) => {
                error(StatusCode::BAD_REQUEST, e.body_text())
            }
            Self::TicketNotFound => not_found(),
            Self::DbError(e) => internal_error(&e),
        }
    }
}

async fn list_comments(
    State(state): State<SharedAppState>,
    Path(key): Path<String>,
) -> Result<Json<Vec<api::Comment>>, ListCommentsError> {
    use ListCommentsError as E;

    let key = state.lookup_key.parse(&key).ok_or(E::TicketNotFound)?;
    let ticket = state
        .store
        .resolve_ticket(&key)
        .await?
        .ok_or(E::TicketNotFound)?;
    let comments = state.store.list_comments(ticket).await?;

    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

#[derive(Debug, From)]
pub enum ListCommentsError {
    #[from]
    DbError(db::Error),
    TicketNotFound,
}

impl IntoResponse for ListCommentsError {
    fn into_response(self) -> Response {
        match self {
            Self::TicketNotFound => not_found(),
            Self::DbError(e) => internal_error(&e),
        }
    }
}
