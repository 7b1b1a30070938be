use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::codes;
use super::domain::{AuthSession, AuthUser, LoginInput, NewAccount, RegisterInput, ResetPasswordInput};
use super::errors::AuthError;
use super::password::{hash_password, verify_password};
use super::repository::AuthRepository;
use super::session::SessionStore;
use super::tokens::{TokenError, TokenIssuer};
use super::validation::{password_pattern, validate_input, PASSWORD_RULE};
use crate::mail::{templates, MailDispatcher};

/// Lifetimes of the one-time secrets and where emailed links point.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub verification_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub client_url: String,
}

impl AuthSettings {
    pub fn from_config(cfg: &configs::AuthConfig, client_url: &str) -> Self {
        Self {
            verification_ttl: Duration::minutes(cfg.verification_ttl_mins),
            reset_token_ttl: Duration::minutes(cfg.reset_token_ttl_mins),
            client_url: client_url.to_string(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            verification_ttl: Duration::minutes(10),
            reset_token_ttl: Duration::minutes(10),
            client_url: "http://localhost:5173".into(),
        }
    }
}

/// Auth business service independent of web framework
pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    sessions: Arc<dyn SessionStore>,
    tokens: TokenIssuer,
    mail: MailDispatcher,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        repo: Arc<dyn AuthRepository>,
        sessions: Arc<dyn SessionStore>,
        tokens: TokenIssuer,
        mail: MailDispatcher,
        settings: AuthSettings,
    ) -> Self {
        Self { repo, sessions, tokens, mail, settings }
    }

    pub fn tokens(&self) -> &TokenIssuer { &self.tokens }

    /// Register a new, unverified user and mail them a verification code.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::{AuthService, AuthSettings};
    /// use service::auth::domain::RegisterInput;
    /// use service::auth::repository::mock::MockAuthRepository;
    /// use service::auth::session::mock::InMemorySessionStore;
    /// use service::auth::tokens::TokenIssuer;
    /// use service::mail::{LogMailer, MailDispatcher};
    ///
    /// tokio_test::block_on(async {
    ///     let svc = AuthService::new(
    ///         Arc::new(MockAuthRepository::default()),
    ///         Arc::new(InMemorySessionStore::new()),
    ///         TokenIssuer::new("a", "r", chrono::Duration::minutes(15), chrono::Duration::days(7)),
    ///         MailDispatcher::new(Arc::new(LogMailer)),
    ///         AuthSettings::default(),
    ///     );
    ///     let input = RegisterInput {
    ///         username: "alice".into(),
    ///         email: "alice@x.com".into(),
    ///         password: "abc123".into(),
    ///         confirm_password: "abc123".into(),
    ///     };
    ///     let user = svc.register(input).await.unwrap();
    ///     assert!(!user.account_verification);
    /// });
    /// ```
    #[instrument(skip(self, input), fields(username = %input.username.trim()))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        let input = input.normalized();
        validate_input(&input, &RegisterInput::FIELD_ORDER)?;

        if self.repo.find_by_email(&input.email).await?.is_some() {
            debug!("email already registered");
            return Err(AuthError::Conflict("Email already exists".into()));
        }
        if self.repo.find_by_username(&input.username).await?.is_some() {
            debug!("username already taken");
            return Err(AuthError::Conflict("Username already exists".into()));
        }

        let code = codes::verification_code();
        let stored = self
            .repo
            .create_user(NewAccount {
                username: input.username,
                email: input.email,
                password_hash: hash_password(&input.password)?,
                verification_code: code.clone(),
                verification_code_expires_at: Utc::now() + self.settings.verification_ttl,
            })
            .await?;
        let user = stored.user;

        self.mail.dispatch(templates::verification_email(&user.email, &user.username, &code, &self.settings.client_url));
        info!(user_id = %user.id, email = %user.email, "user_registered");
        Ok(user)
    }

    /// Consume a verification code and mark the account verified.
    #[instrument(skip(self, code))]
    pub async fn verify_account(&self, code: &str) -> Result<AuthUser, AuthError> {
        let invalid = || AuthError::InvalidOrExpired("Invalid or expired verification code".into());
        let code = code.trim();
        if code.is_empty() {
            return Err(invalid());
        }
        let stored = self.repo.find_by_verification_code(code, Utc::now()).await?.ok_or_else(invalid)?;
        // Another request may have consumed the code between the lookup and here.
        let user = self.repo.complete_verification(stored.user.id, code).await?.ok_or_else(invalid)?;

        self.mail.dispatch(templates::welcome_email(&user.email, &user.username));
        info!(user_id = %user.id, "account_verified");
        Ok(user)
    }

    /// Authenticate a verified user, issue both tokens and record the refresh token.
    #[instrument(skip(self, input), fields(username = ?input.username, email = ?input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let input = input.normalized();
        let stored = self
            .repo
            .find_by_login(input.username.as_deref(), input.email.as_deref())
            .await?
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid username or email".into()))?;

        if !verify_password(&input.password, &stored.password_hash)? {
            return Err(AuthError::InvalidCredentials("Invalid password".into()));
        }
        if !stored.user.account_verification {
            return Err(AuthError::InvalidCredentials(
                "Account not verified. Please check your email for the verification code.".into(),
            ));
        }

        let user = stored.user;
        let access_token = self.tokens.issue_access_token(user.id)?;
        let refresh_token = self.tokens.issue_refresh_token(user.id)?;
        let ttl = self.tokens.refresh_ttl().num_seconds().max(0) as u64;
        self.sessions.put(user.id, &refresh_token, ttl).await?;

        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, access_token, refresh_token })
    }

    /// Drop the cached refresh token if the presented one verifies.
    ///
    /// Best effort: a bad token or an unreachable session store is logged, never returned.
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let Some(token) = refresh_token.filter(|t| !t.is_empty()) else {
            return Ok(());
        };
        match self.tokens.verify_refresh(token) {
            Ok(claims) => match self.sessions.delete(claims.sub).await {
                Ok(_) => info!(user_id = %claims.sub, "user_logged_out"),
                Err(e) => warn!(user_id = %claims.sub, error = %e, "session delete failed on logout"),
            },
            Err(e) => debug!(error = %e, "logout with unverifiable refresh token"),
        }
        Ok(())
    }

    /// Mint a new access token; the refresh token is not rotated.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<String, AuthError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("No refresh token provided".into()))?;
        let claims = self.tokens.verify_refresh(token).map_err(|e| {
            debug!(error = %e, "refresh token rejected");
            AuthError::Forbidden("Invalid refresh token".into())
        })?;

        let cached = self.sessions.get(claims.sub).await?;
        if cached.as_deref() != Some(token) {
            warn!(user_id = %claims.sub, "refresh token does not match cached session");
            return Err(AuthError::Forbidden("Refresh token does not match".into()));
        }

        let access = self.tokens.issue_access_token(claims.sub)?;
        info!(user_id = %claims.sub, "access_token_refreshed");
        Ok(access)
    }

    /// Store a fresh reset token and mail the reset link.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim().to_lowercase();
        let stored = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::NotFound("Email not found".into()))?;

        let token = codes::reset_token();
        self.repo
            .set_reset_token(stored.user.id, &token, Utc::now() + self.settings.reset_token_ttl)
            .await?;

        let link = templates::reset_link(&self.settings.client_url, &token);
        self.mail.dispatch(templates::password_reset_email(&stored.user.email, &link));
        info!(user_id = %stored.user.id, "password_reset_requested");
        Ok(())
    }

    /// Replace the password if `token` is live, consuming the token.
    #[instrument(skip(self, token, input))]
    pub async fn reset_password(&self, token: &str, input: ResetPasswordInput) -> Result<AuthUser, AuthError> {
        let invalid = || AuthError::InvalidOrExpired("Invalid or expired reset token".into());
        let stored = self.repo.find_by_reset_token(token, Utc::now()).await?.ok_or_else(invalid)?;

        let (Some(new_password), Some(confirm)) = (
            input.new_password.filter(|p| !p.is_empty()),
            input.confirm_password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::Validation("New password and confirm password are required".into()));
        };
        if password_pattern(&new_password).is_err() {
            return Err(AuthError::Validation(PASSWORD_RULE.into()));
        }
        if new_password != confirm {
            return Err(AuthError::Validation("Passwords do not match".into()));
        }

        let hash = hash_password(&new_password)?;
        if !self.repo.consume_reset_token(stored.user.id, token, &hash).await? {
            return Err(invalid());
        }
        info!(user_id = %stored.user.id, "password_reset");
        Ok(stored.user)
    }

    /// Resolve an access token to the user id it was issued for.
    pub fn authenticate(&self, access_token: &str) -> Result<Uuid, TokenError> {
        self.tokens.verify_access(access_token).map(|c| c.sub)
    }

    /// Public view of a user; `NotFound` once the row is gone.
    #[instrument(skip(self))]
    pub async fn current_user(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        self.repo
            .find_by_id(user_id)
            .await?
            .map(|s| s.user)
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }
}
