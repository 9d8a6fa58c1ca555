//! Resolution policy: turn a record's source facts into one decision.

use crate::errors::FailureKind;
use crate::types::{Outcome, SourceFacts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Repositories that prompt for credentials and cannot be fetched unattended.
pub const DEFAULT_DENY_REPO_URLS: &[&str] = &[
    "https://github.com/TypeNetwork/Alegreya",
    "https://github.com/googlefonts/glory",
];

/// Repository URLs excluded from fetching. Matching is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denylist(BTreeSet<String>);

impl Denylist {
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(urls.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.0.contains(url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_DENY_REPO_URLS.iter().copied())
    }
}

/// Decide the outcome for one record. Total and side-effect free.
///
/// First match wins:
/// 1. several repository URLs → `inconsistent_repo_urls`
/// 2. several archive URLs → `inconsistent_archive_urls`
/// 3. nothing declared → `no_source`
/// 4. archive without repository → `archive_only`
/// 5. the single repository is denylisted → `denylisted_repo_url`
/// 6. otherwise resolved to that repository
pub fn resolve(facts: &SourceFacts, denylist: &Denylist) -> Outcome {
    if facts.repo_urls.len() > 1 {
        let urls: Vec<&str> = facts.repo_urls.iter().map(String::as_str).collect();
        return Outcome::unresolved_with(FailureKind::InconsistentRepoUrls, urls.join(" "));
    }
    if facts.archive_urls.len() > 1 {
        let urls: Vec<&str> = facts.archive_urls.iter().map(String::as_str).collect();
        return Outcome::unresolved_with(FailureKind::InconsistentArchiveUrls, urls.join(" "));
    }

    let Some(repository_url) = facts.repo_urls.first() else {
        return if facts.archive_urls.is_empty() {
            Outcome::unresolved(FailureKind::NoSource)
        } else {
            Outcome::unresolved(FailureKind::ArchiveOnly)
        };
    };

    if denylist.contains(repository_url) {
        return Outcome::unresolved(FailureKind::DenylistedRepoUrl);
    }

    Outcome::Resolved {
        repository_url: repository_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn facts(repos: &[&str], archives: &[&str]) -> SourceFacts {
        SourceFacts::from_urls(repos.iter().copied(), archives.iter().copied())
    }

    #[test]
    fn single_repository_resolves() {
        let outcome = resolve(&facts(&["https://host/a/b"], &[]), &Denylist::default());
        assert_eq!(
            outcome,
            Outcome::Resolved {
                repository_url: "https://host/a/b".to_string()
            }
        );
    }

    #[test]
    fn repository_with_archive_resolves() {
        let outcome = resolve(
            &facts(&["https://host/a/b"], &["https://host/a/b/releases/x"]),
            &Denylist::empty(),
        );
        assert_eq!(outcome.kind(), None);
    }

    #[test]
    fn conflicting_repositories_win_over_everything() {
        for archives in [&[][..], &["x"][..], &["x", "y"][..]] {
            let outcome = resolve(
                &facts(&["https://host/a/b", "https://host/c/d"], archives),
                &Denylist::default(),
            );
            assert_eq!(outcome.kind(), Some(FailureKind::InconsistentRepoUrls));
        }
    }

    #[test]
    fn conflicting_archives_detected() {
        let outcome = resolve(&facts(&["r"], &["x", "y"]), &Denylist::empty());
        assert_eq!(outcome.kind(), Some(FailureKind::InconsistentArchiveUrls));
        let outcome = resolve(&facts(&[], &["x", "y"]), &Denylist::empty());
        assert_eq!(outcome.kind(), Some(FailureKind::InconsistentArchiveUrls));
    }

    #[test]
    fn nothing_declared_is_no_source() {
        let outcome = resolve(&SourceFacts::default(), &Denylist::default());
        assert_eq!(outcome, Outcome::unresolved(FailureKind::NoSource));
    }

    #[test]
    fn archive_without_repository_is_archive_only() {
        let outcome = resolve(
            &facts(&[], &["https://host/a/b/releases/x"]),
            &Denylist::default(),
        );
        assert_eq!(outcome.kind(), Some(FailureKind::ArchiveOnly));
    }

    #[test]
    fn default_denylist_blocks_known_urls() {
        for url in DEFAULT_DENY_REPO_URLS {
            let outcome = resolve(&facts(&[*url], &[]), &Denylist::default());
            assert_eq!(outcome.kind(), Some(FailureKind::DenylistedRepoUrl));
        }
    }

    #[test]
    fn denylist_match_is_exact() {
        let outcome = resolve(
            &facts(&["https://github.com/googlefonts/glory/"], &[]),
            &Denylist::default(),
        );
        assert_eq!(outcome.kind(), None);
    }

    #[test]
    fn denylist_deserializes_from_a_list() {
        let list: Denylist = serde_json::from_str(r#"["https://h/a", "https://h/a"]"#).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.contains("https://h/a"));
    }

    fn url_set() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("https://h/[a-c]/[a-c]", 0..4)
    }

    proptest! {
        #[test]
        fn resolve_is_total_and_deterministic(
            repos in url_set(),
            archives in url_set(),
            deny in url_set(),
        ) {
            let facts = SourceFacts::from_urls(repos, archives);
            let denylist = Denylist::new(deny);
            let first = resolve(&facts, &denylist);
            prop_assert_eq!(&first, &resolve(&facts, &denylist));

            if let Outcome::Resolved { repository_url } = &first {
                prop_assert_eq!(facts.repo_urls.len(), 1);
                prop_assert!(facts.archive_urls.len() <= 1);
                prop_assert!(!denylist.contains(repository_url));
            }
            if facts.repo_urls.len() > 1 {
                prop_assert_eq!(first.kind(), Some(FailureKind::InconsistentRepoUrls));
            }
        }
    }
}
