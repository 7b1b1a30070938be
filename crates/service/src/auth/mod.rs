//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, email verification, login, token refresh, logout and password reset.
//! Access tokens are stateless; the single live refresh token per user sits in a
//! [`session::SessionStore`].

pub mod domain;
pub mod errors;
pub mod validation;
pub mod password;
pub mod codes;
pub mod tokens;
pub mod session;
pub mod repository;
pub mod service;
pub mod repo;

pub use errors::AuthError;
pub use service::{AuthService, AuthSettings};
