use models::errors::ModelError;
use thiserror::Error;

/// Errors for the CRUD services (users, listings, orders, payments).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::Validation(m) => ServiceError::Validation(m),
            ModelError::Conflict(m) => ServiceError::Conflict(m),
            ModelError::Db(m) => ServiceError::Db(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_conflict_keeps_its_message() {
        let e: ServiceError = ModelError::Conflict("Order already recorded".into()).into();
        assert!(matches!(e, ServiceError::Conflict(ref m) if m == "Order already recorded"));
        assert_eq!(ServiceError::not_found("Service").to_string(), "Service not found");
    }
}
