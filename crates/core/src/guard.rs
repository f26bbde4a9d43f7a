//! Console route guard
//!
//! Everything under `/admin` requires a session. Unauthenticated visits are
//! sent to the login page with the original location kept in `callbackUrl`
//! so the console can return there after signing in.

use url::form_urlencoded;

/// Prefix of the routes that require a session
pub const PROTECTED_PREFIX: &str = "/admin";

/// Path of the login page
pub const LOGIN_PATH: &str = "/auth/login";

/// Outcome of checking a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin(String),
}

/// Decide whether `path` (with its `query`, including the leading `?` when
/// present) may be served
pub fn route_guard(path: &str, query: &str, authenticated: bool) -> RouteDecision {
    if !path.starts_with(PROTECTED_PREFIX) || authenticated {
        return RouteDecision::Allow;
    }
    RouteDecision::RedirectToLogin(login_redirect(&format!("{path}{query}")))
}

/// Login page location that returns to `callback` after signing in
pub fn login_redirect(callback: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("callbackUrl", callback)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_routes_pass() {
        assert_eq!(route_guard("/", "", false), RouteDecision::Allow);
        assert_eq!(route_guard("/auth/login", "", false), RouteDecision::Allow);
    }

    #[test]
    fn test_admin_routes_with_session_pass() {
        assert_eq!(route_guard("/admin/jobs", "?page=2", true), RouteDecision::Allow);
    }

    #[test]
    fn test_admin_routes_without_session_redirect() {
        assert_eq!(
            route_guard("/admin/jobs", "?page=2&limit=10", false),
            RouteDecision::RedirectToLogin(
                "/auth/login?callbackUrl=%2Fadmin%2Fjobs%3Fpage%3D2%26limit%3D10".to_string()
            )
        );
        assert_eq!(
            route_guard("/admin", "", false),
            RouteDecision::RedirectToLogin("/auth/login?callbackUrl=%2Fadmin".to_string())
        );
    }
}
