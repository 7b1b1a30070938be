use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
}

impl From<DbErr> for ModelError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => ModelError::Conflict(conflict_message(&detail)),
            _ => ModelError::Db(e.to_string()),
        }
    }
}

/// Translate a unique-violation detail into the message clients see.
pub fn conflict_message(detail: &str) -> String {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("email") {
        "Email already exists".into()
    } else if lower.contains("username") {
        "Username already exists".into()
    } else if lower.contains("stripe_session_id") {
        "Order already recorded".into()
    } else {
        "Record already exists".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_names_the_column() {
        assert_eq!(conflict_message("duplicate key value violates unique constraint \"users_email_key\""), "Email already exists");
        assert_eq!(conflict_message("Key (username)=(alice) already exists."), "Username already exists");
        assert_eq!(conflict_message("something else"), "Record already exists");
    }
}
