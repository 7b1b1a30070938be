//! Environment/runtime helpers
//!
//! Sanity checks run once at startup, before any connection is opened.

use tracing::warn;

/// Variables that must never fall back to a default in production.
pub const REQUIRED_IN_PRODUCTION: &[&str] = &["ACCESS_TOKEN_SECRET", "REFRESH_TOKEN_SECRET", "DATABASE_URL"];

/// True when `APP_ENV` (or the legacy `NODE_ENV`) is `production`.
pub fn is_production() -> bool {
    ["APP_ENV", "NODE_ENV"]
        .iter()
        .filter_map(|k| std::env::var(k).ok())
        .any(|v| v.eq_ignore_ascii_case("production"))
}

/// Warn about missing variables; fail only when running in production.
pub fn ensure_env() -> anyhow::Result<()> {
    let missing: Vec<&str> = REQUIRED_IN_PRODUCTION
        .iter()
        .copied()
        .filter(|k| std::env::var(k).map(|v| v.trim().is_empty()).unwrap_or(true))
        .collect();
    if !missing.is_empty() {
        if is_production() {
            return Err(anyhow::anyhow!("missing required environment variables: {}", missing.join(", ")));
        }
        warn!(?missing, "environment variables not set; relying on config file or development defaults");
    }
    Ok(())
}
