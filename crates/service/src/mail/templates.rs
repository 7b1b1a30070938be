//! HTML bodies for account emails. User-supplied values are HTML-escaped before substitution.

use super::OutgoingMail;

pub const VERIFICATION_EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Verify your email</h2>
  <p>Hello {username},</p>
  <p>Thanks for signing up. Your verification code is:</p>
  <p style="font-size: 28px; font-weight: bold; letter-spacing: 6px;">{verificationCode}</p>
  <p>Enter it on the verification page at <a href="{clientUrl}/verify-email">{clientUrl}/verify-email</a>.</p>
  <p>The code expires in 10 minutes.</p>
</body>
</html>"#;

pub const WELCOME_EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Welcome, {name}!</h2>
  <p>Your account is verified. You can now sign in and browse services.</p>
</body>
</html>"#;

pub const PASSWORD_RESET_REQUEST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Password reset</h2>
  <p>We received a request to reset your password. Click the link below to choose a new one:</p>
  <p><a href="{resetURL}">Reset password</a></p>
  <p>This link expires in 10 minutes. If you did not ask for a reset, ignore this email.</p>
</body>
</html>"#;

/// Escape text for an HTML body or a quoted attribute value.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn verification_email(to: &str, username: &str, code: &str, client_url: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Account Verification".into(),
        html: VERIFICATION_EMAIL_TEMPLATE
            .replace("{username}", &escape_html(username))
            .replace("{verificationCode}", code)
            .replace("{clientUrl}", client_url),
    }
}

pub fn welcome_email(to: &str, username: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Welcome to Our Service".into(),
        html: WELCOME_EMAIL_TEMPLATE.replace("{name}", &escape_html(username)),
    }
}

pub fn reset_link(client_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", client_url.trim_end_matches('/'), token)
}

pub fn password_reset_email(to: &str, reset_url: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Password Reset Request".into(),
        html: PASSWORD_RESET_REQUEST_TEMPLATE.replace("{resetURL}", reset_url),
    }
}
