use chrono::{DateTime, Utc};
use models::user::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validation::password_pattern;

/// Registration input
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 15, message = "Username must be between 3 and 15 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "password_pattern"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

impl RegisterInput {
    pub const FIELD_ORDER: [&'static str; 4] = ["username", "email", "password", "confirm_password"];

    /// Trim the username and canonicalize the email before validation.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self
    }
}

/// Login input; either identifier may be used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginInput {
    /// Blank identifiers count as absent.
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            username: clean(self.username),
            email: clean(self.email).map(|e| e.to_lowercase()),
            password: self.password,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyInput {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordInput {
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResetPasswordInput {
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

/// Domain user (client-visible view). Secrets never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub account_verification: bool,
    pub created_at: DateTime<Utc>,
}

/// Full persisted row as the auth workflows need it.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user: AuthUser,
    pub password_hash: String,
    pub verification_code: Option<String>,
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

/// Row to create at registration.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verification_code: String,
    pub verification_code_expires_at: DateTime<Utc>,
}

/// Login result (session)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<models::user::Model> for StoredUser {
    fn from(m: models::user::Model) -> Self {
        StoredUser {
            user: AuthUser {
                id: m.id,
                username: m.username,
                email: m.email,
                role: m.role,
                account_verification: m.account_verification,
                created_at: m.created_at.with_timezone(&Utc),
            },
            password_hash: m.password,
            verification_code: m.verification_code,
            verification_code_expires_at: m.verification_code_expire_at.map(|t| t.with_timezone(&Utc)),
            reset_token: m.reset_token,
            reset_token_expires_at: m.reset_token_expire_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl From<models::user::Model> for AuthUser {
    fn from(m: models::user::Model) -> Self {
        StoredUser::from(m).user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validation::first_message;

    fn input(username: &str, email: &str, password: &str, confirm: &str) -> RegisterInput {
        RegisterInput {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
        .normalized()
    }

    fn message(i: &RegisterInput) -> Option<String> {
        i.validate().err().map(|e| first_message(&e, &RegisterInput::FIELD_ORDER))
    }

    #[test]
    fn valid_registration_passes() {
        assert_eq!(message(&input("alice", "alice@x.com", "abc123", "abc123")), None);
    }

    #[test]
    fn username_is_trimmed_before_length_check() {
        let i = input("  al  ", "alice@x.com", "abc123", "abc123");
        assert_eq!(i.username, "al");
        assert_eq!(message(&i).as_deref(), Some("Username must be between 3 and 15 characters"));
    }

    #[test]
    fn email_is_lowercased() {
        let i = input("alice", " Alice@X.com ", "abc123", "abc123");
        assert_eq!(i.email, "alice@x.com");
    }

    #[test]
    fn first_error_follows_field_order() {
        let i = input("al", "nope", "abc", "xyz");
        assert_eq!(message(&i).as_deref(), Some("Username must be between 3 and 15 characters"));
        let i = input("alice", "nope", "abc", "xyz");
        assert_eq!(message(&i).as_deref(), Some("Invalid email address"));
    }

    #[test]
    fn confirm_must_match() {
        let i = input("alice", "alice@x.com", "abc123", "abc124");
        assert_eq!(message(&i).as_deref(), Some("Passwords do not match"));
    }

    #[test]
    fn blank_login_identifiers_are_absent() {
        let l = LoginInput { username: Some("alice".into()), email: Some("  ".into()), password: "abc123".into() }.normalized();
        assert_eq!(l.username.as_deref(), Some("alice"));
        assert!(l.email.is_none());
    }

    #[test]
    fn register_body_uses_camel_case() {
        let i: RegisterInput = serde_json::from_value(serde_json::json!({
            "username": "alice", "email": "alice@x.com", "password": "abc123", "confirmPassword": "abc123"
        }))
        .unwrap();
        assert_eq!(i.confirm_password, "abc123");
    }
}
