//! Synchronous client for the Authena identity service.
//!
//! # Overview
//! Maps user management, token issuance and permission lookup onto the
//! service's HTTP endpoints. `AuthenaClient` builds `HttpRequest` values and
//! parses `HttpResponse` values without touching the network; `UserClient`
//! runs each round-trip through an injected `Transport`.
//!
//! # Design
//! - `AuthenaClient` is stateless: it holds only `base_url`.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - `Transport` is the only seam to the network. The `ureq` feature (on by
//!   default) provides `UreqTransport`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "ureq")]
pub mod transport;
pub mod types;
pub mod user;

pub use client::AuthenaClient;
pub use self::config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Challenge, CreateUser, Token, TokenResponse, UpdateUser, User, UserFilter};
pub use user::UserClient;
