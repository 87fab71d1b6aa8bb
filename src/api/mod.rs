pub mod comment;
pub mod ticket;

pub use self::{comment::Comment, ticket::Ticket};
