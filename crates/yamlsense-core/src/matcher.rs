//! File pattern matching against document URIs.

use std::borrow::Cow;

use glob::{MatchOptions, Pattern};
use url::Url;

/// Answers "does this document URI match this file pattern".
pub trait PatternMatcher: Send + Sync {
    fn matches(&self, pattern: &str, uri: &str) -> bool;
}

/// True if `uri` matches any of `patterns`, stopping at the first hit.
pub fn matches_any<'a, M, I>(matcher: &M, patterns: I, uri: &str) -> bool
where
    M: PatternMatcher + ?Sized,
    I: IntoIterator<Item = &'a String>,
{
    patterns
        .into_iter()
        .any(|pattern| matcher.matches(pattern, uri))
}

/// Glob matcher backed by the `glob` crate.
///
/// Patterns without a `/` are matched against the file name only
/// (`*.yaml` matches any YAML file). Patterns with a `/` are matched against
/// the whole path; relative ones may start at any directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobMatcher;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl PatternMatcher for GlobMatcher {
    fn matches(&self, pattern: &str, uri: &str) -> bool {
        let path = uri_path(uri);

        if !pattern.contains('/') {
            let file_name = path.rsplit('/').next().unwrap_or(&path);
            return Pattern::new(pattern).is_ok_and(|p| p.matches_with(file_name, MATCH_OPTIONS));
        }

        let anchored: Cow<'_, str> = if pattern.starts_with('/') || pattern.starts_with("**") {
            Cow::Borrowed(pattern)
        } else {
            Cow::Owned(format!("**/{}", pattern.trim_start_matches("./")))
        };
        Pattern::new(&anchored).is_ok_and(|p| p.matches_with(&path, MATCH_OPTIONS))
    }
}

/// The path component of a URI, decoded for `file:` URIs.
fn uri_path(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|()| url.path().to_string()),
        Ok(url) => url.path().to_string(),
        Err(_) => uri.replace('\\', "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_file_name_pattern() {
        let m = GlobMatcher;
        assert!(m.matches("*.yaml", "file:///work/deploy/app.yaml"));
        assert!(!m.matches("*.yaml", "file:///work/deploy/app.yml"));
        assert!(m.matches("docker-compose.yml", "file:///w/docker-compose.yml"));
    }

    #[test]
    fn test_relative_path_pattern_matches_any_directory() {
        let m = GlobMatcher;
        assert!(m.matches("ci/*.yaml", "file:///home/me/project/ci/build.yaml"));
        assert!(m.matches("./ci/*.yaml", "file:///home/me/project/ci/build.yaml"));
        assert!(!m.matches("ci/*.yaml", "file:///home/me/project/ci/nested/build.yaml"));
    }

    #[test]
    fn test_globstar_pattern() {
        let m = GlobMatcher;
        assert!(m.matches("**/templates/**/*.yaml", "file:///p/templates/a/b/c.yaml"));
    }

    #[test]
    fn test_absolute_pattern() {
        let m = GlobMatcher;
        assert!(m.matches("/p/only/*.yaml", "file:///p/only/x.yaml"));
        assert!(!m.matches("/p/only/*.yaml", "file:///q/p/only/x.yaml"));
    }

    #[test]
    fn test_percent_encoded_file_uri() {
        let m = GlobMatcher;
        assert!(m.matches("my file.yaml", "file:///tmp/my%20file.yaml"));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let m = GlobMatcher;
        assert!(!m.matches("[", "file:///tmp/a.yaml"));
    }

    /// Counts calls and matches only its `hit` pattern.
    struct CountingMatcher {
        hit: &'static str,
        calls: AtomicUsize,
    }

    impl PatternMatcher for CountingMatcher {
        fn matches(&self, pattern: &str, _uri: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            pattern == self.hit
        }
    }

    #[test]
    fn test_matches_any_short_circuits() {
        let m = CountingMatcher {
            hit: "first",
            calls: Default::default(),
        };
        let patterns = vec!["first".to_string(), "second".to_string()];

        assert!(matches_any(&m, &patterns, "file:///a/b.yaml"));
        assert_eq!(m.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_matches_any_without_hit_checks_every_pattern() {
        let m = CountingMatcher {
            hit: "none",
            calls: Default::default(),
        };
        let patterns = vec!["first".to_string(), "second".to_string()];

        assert!(!matches_any(&m, &patterns, "file:///a/b.toml"));
        assert_eq!(m.calls.load(Ordering::SeqCst), 2);
    }
}
