use axum::response::{IntoResponse, Redirect, Response};

/// Query parameter carrying the page to return to after signing in.
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// RedirectTarget
///
/// Where a rejected request is sent: a path plus query parameters, kept
/// unencoded until `location()` renders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl RedirectTarget {
    /// A redirect to `path` with no query string.
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// A sign-in redirect that brings the caller back to `original_path`.
    pub fn with_callback(path: impl Into<String>, original_path: &str) -> Self {
        Self::to(path).param(CALLBACK_PARAM, original_path)
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Looks up a query parameter by name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The `Location` header value, with query values percent-encoded.
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.path, query)
    }
}

impl IntoResponse for RedirectTarget {
    fn into_response(self) -> Response {
        Redirect::temporary(&self.location()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_target_has_no_query() {
        assert_eq!(RedirectTarget::to("/onboarding").location(), "/onboarding");
    }

    #[test]
    fn callback_is_percent_encoded() {
        let target = RedirectTarget::with_callback("/login", "/dashboard/settings");
        assert_eq!(target.get(CALLBACK_PARAM), Some("/dashboard/settings"));
        assert_eq!(
            target.location(),
            "/login?callbackUrl=%2Fdashboard%2Fsettings"
        );
    }
}
