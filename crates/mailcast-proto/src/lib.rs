//! Shared building blocks for the mailcast client: the message model, the
//! search-query builder, the backend API client and configuration.

pub mod api;
pub mod config;
pub mod error;
pub mod message;
pub mod platform;
pub mod query;

pub use api::MailApi;
pub use error::ApiError;
pub use message::MessageSummary;
pub use query::{build_query, Filter, SearchQuery};
