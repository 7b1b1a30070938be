//! Session cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// HttpOnly + SameSite=Strict always; `Secure` in production.
#[derive(Clone, Debug)]
pub struct CookiePolicy {
    pub secure: bool,
    pub access_max_age: time::Duration,
    pub refresh_max_age: time::Duration,
}

impl CookiePolicy {
    pub fn new(secure: bool, access_max_age: chrono::Duration, refresh_max_age: chrono::Duration) -> Self {
        Self {
            secure,
            access_max_age: time::Duration::seconds(access_max_age.num_seconds()),
            refresh_max_age: time::Duration::seconds(refresh_max_age.num_seconds()),
        }
    }

    fn build(&self, name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(max_age)
            .build()
    }

    pub fn access(&self, token: String) -> Cookie<'static> {
        self.build(ACCESS_COOKIE, token, self.access_max_age)
    }

    pub fn refresh(&self, token: String) -> Cookie<'static> {
        self.build(REFRESH_COOKIE, token, self.refresh_max_age)
    }

    /// Jar with both session cookies expired.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
            .remove(Cookie::build(REFRESH_COOKIE).path("/"))
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::new(false, chrono::Duration::minutes(15), chrono::Duration::days(7))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_are_http_only_strict_and_rooted() {
        let c = CookiePolicy::new(true, chrono::Duration::minutes(15), chrono::Duration::days(7)).access("tok".into());
        assert_eq!(c.name(), ACCESS_COOKIE);
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Strict));
        assert_eq!(c.path(), Some("/"));
        assert_eq!(c.max_age(), Some(time::Duration::minutes(15)));
    }

    #[test]
    fn refresh_cookie_lives_seven_days() {
        let c = CookiePolicy::default().refresh("tok".into());
        assert_eq!(c.max_age(), Some(time::Duration::days(7)));
        assert_eq!(c.secure(), Some(false));
    }
}
