use std::collections::HashMap;
use std::fmt;

use reqwest::Url;
use serde::Serialize;

/// Processing category of a discovered URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlBucket {
    Bitbucket,
    Sourceware,
    Gitlab,
    Commit,
    Pull,
    Issues,
    Patch,
    Github,
    Other,
}

impl UrlBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlBucket::Bitbucket => "bitbucket",
            UrlBucket::Sourceware => "sourceware",
            UrlBucket::Gitlab => "gitlab",
            UrlBucket::Commit => "commit",
            UrlBucket::Pull => "pull",
            UrlBucket::Issues => "issues",
            UrlBucket::Patch => "patch",
            UrlBucket::Github => "github",
            UrlBucket::Other => "other",
        }
    }
}

impl fmt::Display for UrlBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets that have a processor, in the order they are worked through.
pub const DISPATCH_ORDER: [UrlBucket; 7] = [
    UrlBucket::Bitbucket,
    UrlBucket::Sourceware,
    UrlBucket::Gitlab,
    UrlBucket::Commit,
    UrlBucket::Pull,
    UrlBucket::Issues,
    UrlBucket::Patch,
];

pub const DEFAULT_EXCLUDES: &[&str] = &["redhat", "netapp"];

fn host_is(url: &str, domain: &str) -> bool {
    match Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase())) {
        Some(host) => host == domain || host.ends_with(&format!(".{}", domain)),
        None => false,
    }
}

/// Paths that make a GitHub URL more than a bare repository reference.
const PATH_MARKERS: &[&str] = &["/commit", "/pull", "/issues", "/security/advisories", "/tag"];

#[derive(Debug, Clone)]
pub struct UrlClassifier {
    excludes: Vec<String>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect())
    }
}

impl UrlClassifier {
    pub fn new(excludes: Vec<String>) -> Self {
        Self { excludes }
    }

    fn not_excluded(&self, url: &str) -> bool {
        self.excludes.iter().all(|item| !url.contains(item.as_str()))
    }

    /// Assign exactly one bucket. Rules are checked top to bottom and the
    /// first match wins.
    pub fn classify_url(&self, url: &str) -> UrlBucket {
        if url.contains("bitbucket") {
            UrlBucket::Bitbucket
        } else if host_is(url, "sourceware.org")
            && (url.contains("commitdiff") || url.contains("blobdiff") || url.contains(";h="))
        {
            UrlBucket::Sourceware
        } else if host_is(url, "gitlab.com") && url.contains("/-/commit") {
            UrlBucket::Gitlab
        } else if url.contains("/commit") && self.not_excluded(url) {
            UrlBucket::Commit
        } else if url.contains("/pull") && self.not_excluded(url) {
            UrlBucket::Pull
        } else if url.contains("/issues") && self.not_excluded(url) {
            UrlBucket::Issues
        } else if url.contains("/security/advisories") || url.contains("/tag") {
            UrlBucket::Patch
        } else if url.contains("github") && !PATH_MARKERS.iter().any(|m| url.contains(m)) {
            UrlBucket::Github
        } else {
            UrlBucket::Other
        }
    }

    pub fn classify<S: AsRef<str>>(&self, urls: &[S]) -> ClassifiedUrls {
        let mut buckets: HashMap<UrlBucket, Vec<String>> = HashMap::new();
        for url in urls {
            let url = url.as_ref();
            buckets.entry(self.classify_url(url)).or_default().push(url.to_string());
        }
        ClassifiedUrls { buckets }
    }
}

/// URLs grouped by bucket, each group in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedUrls {
    buckets: HashMap<UrlBucket, Vec<String>>,
}

impl ClassifiedUrls {
    pub fn get(&self, bucket: UrlBucket) -> &[String] {
        self.buckets.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, bucket: UrlBucket) -> usize {
        self.get(bucket).len()
    }

    /// Non-empty buckets with their counts, for logging.
    pub fn counts(&self) -> HashMap<&'static str, usize> {
        self.buckets
            .iter()
            .filter(|(_, urls)| !urls.is_empty())
            .map(|(bucket, urls)| (bucket.as_str(), urls.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> UrlBucket {
        UrlClassifier::default().classify_url(url)
    }

    #[test]
    fn test_platform_buckets() {
        let urls = [
            "https://gitlab.com/g/p/-/commit/abc123",
            "https://sourceware.org/git/gitweb.cgi?p=glibc.git;a=commitdiff;h=deadbeef",
            "https://bitbucket.org/x/y/commits/123",
        ];
        let classified = UrlClassifier::default().classify(&urls);
        assert_eq!(classified.get(UrlBucket::Gitlab), &[urls[0].to_string()]);
        assert_eq!(classified.get(UrlBucket::Sourceware), &[urls[1].to_string()]);
        assert_eq!(classified.get(UrlBucket::Bitbucket), &[urls[2].to_string()]);
        assert!(classified.get(UrlBucket::Commit).is_empty());
    }

    #[test]
    fn test_github_shapes() {
        assert_eq!(classify("https://github.com/acme/foo/commit/abc"), UrlBucket::Commit);
        assert_eq!(classify("https://github.com/acme/foo/pull/12"), UrlBucket::Pull);
        assert_eq!(classify("https://github.com/acme/foo/issues/7"), UrlBucket::Issues);
        assert_eq!(classify("https://github.com/acme/foo/security/advisories/GHSA-x"), UrlBucket::Patch);
        assert_eq!(classify("https://github.com/acme/foo/releases/tag/v1.2.3"), UrlBucket::Patch);
        assert_eq!(classify("https://github.com/acme/foo"), UrlBucket::Github);
        assert_eq!(classify("https://example.com/advisory"), UrlBucket::Other);
    }

    #[test]
    fn test_precedence_on_ambiguous_urls() {
        // commit rule precedes pull rule
        assert_eq!(classify("https://github.com/acme/foo/pull/3/commits/abc"), UrlBucket::Commit);
        // bitbucket precedes everything
        assert_eq!(classify("https://bitbucket.org/x/y/pull-requests/1/commits"), UrlBucket::Bitbucket);
        // gitlab without /-/commit falls through to generic rules
        assert_eq!(classify("https://gitlab.com/g/p/-/issues/4"), UrlBucket::Issues);
        // sourceware page that is not a diff
        assert_eq!(classify("https://sourceware.org/bugzilla/show_bug.cgi?id=1"), UrlBucket::Other);
    }

    #[test]
    fn test_excluded_hosts_skip_generic_rules() {
        assert_eq!(classify("https://access.redhat.com/commit/abc"), UrlBucket::Other);
        assert_eq!(classify("https://security.netapp.com/advisory/issues/1"), UrlBucket::Other);
        assert_eq!(classify("https://bugzilla.redhat.com/show_bug.cgi?id=1&tag=x"), UrlBucket::Other);
        assert_eq!(classify("https://access.redhat.com/errata/tag/1"), UrlBucket::Patch);
    }

    #[test]
    fn test_excluded_github_paths_are_dropped() {
        assert_eq!(classify("https://github.com/redhat-developer/foo/commit/abc"), UrlBucket::Other);
        assert_eq!(classify("https://github.com/netapp/foo/pull/3"), UrlBucket::Other);
        assert_eq!(classify("https://github.com/redhat-developer/foo/issues/9"), UrlBucket::Other);
        assert_eq!(classify("https://github.com/redhat-developer/foo"), UrlBucket::Github);
    }

    #[test]
    fn test_host_check_is_not_substring() {
        assert_eq!(
            classify("https://mirror.example.com/sourceware.org/commitdiff"),
            UrlBucket::Commit
        );
    }

    #[test]
    fn test_classification_is_idempotent_and_order_independent() {
        let urls = vec![
            "https://github.com/a/b/commit/1".to_string(),
            "https://github.com/a/b/pull/2".to_string(),
            "https://gitlab.com/g/p/-/commit/3".to_string(),
            "https://nvd.nist.gov/vuln/detail/CVE-1".to_string(),
        ];
        let classifier = UrlClassifier::default();
        let first = classifier.classify(&urls);
        let second = classifier.classify(&urls);
        assert_eq!(first, second);

        let mut reversed = urls.clone();
        reversed.reverse();
        let third = classifier.classify(&reversed);
        for bucket in DISPATCH_ORDER {
            let mut a = first.get(bucket).to_vec();
            let mut b = third.get(bucket).to_vec();
            a.sort();
            b.sort();
            assert_eq!(a, b);
        }
    }
}
