use models::errors::ModelError;
use thiserror::Error;

use super::session::SessionError;
use super::tokens::TokenError;

/// Business errors for auth workflows.
///
/// The `String` payload of client-facing variants is the message returned to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    InvalidOrExpired(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
    #[error("session store error: {0}")]
    Session(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict(_) => 1002,
            AuthError::InvalidCredentials(_) => 1003,
            AuthError::InvalidOrExpired(_) => 1004,
            AuthError::Unauthorized(_) => 1005,
            AuthError::Forbidden(_) => 1006,
            AuthError::NotFound(_) => 1007,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Repository(_) => 1200,
            AuthError::Session(_) => 1201,
        }
    }

    /// True for failures the caller cannot fix (store, cache, crypto).
    pub fn is_internal(&self) -> bool {
        self.code() > 1100
    }
}

impl From<ModelError> for AuthError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(m) => AuthError::Validation(m),
            ModelError::Conflict(m) => AuthError::Conflict(m),
            ModelError::Db(m) => AuthError::Repository(m),
        }
    }
}

impl From<SessionError> for AuthError {
    fn from(e: SessionError) -> Self { AuthError::Session(e.to_string()) }
}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self { AuthError::TokenError(e.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_split_client_and_internal_errors() {
        assert!(!AuthError::Conflict("Email already exists".into()).is_internal());
        assert!(!AuthError::Forbidden("Invalid refresh token".into()).is_internal());
        assert!(AuthError::Repository("down".into()).is_internal());
        assert!(AuthError::Session("down".into()).is_internal());
    }

    #[test]
    fn unique_violation_becomes_conflict() {
        let e: AuthError = ModelError::Conflict("Username already exists".into()).into();
        assert_eq!(e.code(), 1002);
        assert_eq!(e.to_string(), "Username already exists");
    }
}
