//! `dashkit-client`
//!
//! **Responsibility:** the HTTP capability used by dashboard screens.
//!
//! This crate provides:
//! - An [`ApiClient`] seam plus a reqwest-backed [`HttpClient`] (bearer tokens,
//!   one-shot token refresh on 401)
//! - Response envelope helpers (wrapped `{ data }` or bare bodies)
//! - A keyed [`QueryCache`] with coarse invalidation
//! - Cancellable fetches and the delete, upload and email mutations
//! - An explicit [`Session`] holding tokens, principal and cache

pub mod cache;
pub mod client;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod mutations;
pub mod request;
pub mod session;

pub use cache::QueryCache;
pub use client::{ApiClient, AuthTokens, ClientConfig, HttpClient, TokenStore};
pub use envelope::{unwrap_entity, unwrap_list};
pub use error::{ServerMessage, TransportError};
pub use fetch::{FetchHandle, FetchState, fetch_list, fetch_single, spawn_fetch};
pub use mutations::{
    DEFAULT_EMAIL_ENDPOINT, EmailParams, EmailResponse, Recipients, UploadOptions, UploadRequest, delete_item,
    send_email, upload_file,
};
pub use request::{ApiRequest, FilePart, Method, PartValue, Payload};
pub use session::Session;
