//! Clio REST API client library
//!
//! Typed models for the contact and matter collections plus a paginated,
//! bearer-authenticated `ApiClient` over a `clio_auth::AuthSession`. The
//! client owns two reliability rules: a 401 triggers exactly one token
//! refresh and one retry of the same page, and a configured page cap
//! stops runaway fetches with an explicit `truncated` flag instead of an
//! error.

pub mod client;
pub mod error;
pub mod models;

pub use client::{ApiClient, DEFAULT_BASE_URL, FetchOutcome};
pub use error::{Error, Result};
pub use models::{
    Address, ContactRecord, ContactType, MatterClient, MatterRecord, Page, Paging, PhoneNumber,
};
