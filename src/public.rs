/// PublicPaths
///
/// The set of literal path prefixes that bypass policy lookup entirely
/// (landing page, login, auth callbacks, static assets).
///
/// Matching is a case-sensitive `starts_with` against each prefix. The bare
/// root entry `/` is the one exception: it only matches the root page itself,
/// since every request path begins with `/`.
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `path` is exempt from every route policy.
    pub fn is_public(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            if prefix == "/" {
                path == "/"
            } else {
                path.starts_with(prefix.as_str())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_only_matches_itself() {
        let public = PublicPaths::new(["/", "/login"]);
        assert!(public.is_public("/"));
        assert!(!public.is_public("/dashboard"));
        assert!(public.is_public("/login"));
        assert!(public.is_public("/login/callback"));
    }

    #[test]
    fn prefix_match_is_case_sensitive() {
        let public = PublicPaths::new(["/_next/static"]);
        assert!(public.is_public("/_next/static/chunks/app.js"));
        assert!(!public.is_public("/_NEXT/static/chunks/app.js"));
    }
}
