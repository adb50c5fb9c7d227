use axum::http::Uri;
use reqwest::Url;

use crate::error::TargetError;

/// RequestTarget
///
/// The request path in the form the upstream will receive it.
///
/// The raw target is run through the same URL parser the forwarder uses, so
/// `.`/`..` segments (and their `%2e` spellings) are resolved *before* any
/// policy is consulted. Policy matching then runs on the percent-decoded
/// path, which must not contain dot segments of its own (`%2f..%2f`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    uri: Uri,
    path: String,
}

impl RequestTarget {
    pub fn parse(uri: &Uri) -> Result<Self, TargetError> {
        let raw = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        if !raw.starts_with('/') {
            return Err(TargetError::Malformed(raw.to_string()));
        }

        let url = Url::parse(&format!("http://gateway{raw}"))
            .map_err(|_| TargetError::Malformed(raw.to_string()))?;

        let mut normalized = url.path().to_string();
        if let Some(query) = url.query() {
            normalized.push('?');
            normalized.push_str(query);
        }
        let uri = normalized
            .parse::<Uri>()
            .map_err(|_| TargetError::Malformed(raw.to_string()))?;

        let path = urlencoding::decode(url.path())
            .map_err(|_| TargetError::Malformed(raw.to_string()))?
            .into_owned();
        if path.split(['/', '\\']).any(|segment| segment == "." || segment == "..") {
            return Err(TargetError::DotSegment(raw.to_string()));
        }

        Ok(Self { uri, path })
    }

    /// Normalized origin-form URI; this is what gets forwarded.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Decoded path used for health, public and policy matching.
    pub fn path(&self) -> &str {
        &self.path
    }
}
