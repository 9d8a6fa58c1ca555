//! End-to-end runs of the acquisition pipeline against a temporary corpus.
//!
//! Version control is replaced by `RecordingVcs`; nothing touches the network.

mod common;

use common::{CorpusFixture, init_test_logging, repo_metadata, tree_snapshot};
use fontsrc_common::errors::PipelineError;
use fontsrc_common::metadata::{MetadataError, MetadataStore};
use fontsrc_common::types::DeclaredSource;
use fontsrc_common::upstream::FsUpstreamStore;
use fontsrc_common::vcs::VcsCall;
use fontsrc_common::{FailureKind, FetchOptions, Pipeline, RecordLocator, RecordingVcs};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

const URL_X: &str = "https://github.com/example/shared";

fn shared_repo_vcs() -> RecordingVcs {
    RecordingVcs::new()
        .with_file("README.md", "shared sources\n")
        .with_file("sources/Family.glyphs", "{ glyphs = (); }\n")
        .with_file("venv/lib/site.py", "# dependency\n")
}

#[test]
fn shared_url_clones_once_and_copies_locally() {
    init_test_logging();
    crate::test_log!("TEST START: shared_url_clones_once_and_copies_locally");

    let fx = CorpusFixture::new();
    fx.record("ofl/alpha", &repo_metadata("Alpha", URL_X), None)
        .record("ofl/beta", "name: \"Beta\"\n", Some(&format!("repository_url: {URL_X}\n")))
        .record(
            "ofl/gamma",
            &repo_metadata("Gamma", "https://github.com/example/gamma"),
            Some("repository_url: https://github.com/example/gamma-fork\n"),
        );

    let vcs = shared_repo_vcs();
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    assert_eq!(vcs.clone_count(), 1);
    assert_eq!(summary.clones, 1);
    assert_eq!(summary.local_copies, 1);
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failures.get(&FailureKind::InconsistentRepoUrls), Some(&1));
    assert_eq!(summary.failure_count(), 1);
    assert_ne!(summary.exit_code(), 0);

    assert_eq!(
        fx.report("inconsistent_repo_urls").as_deref(),
        Some("ofl/gamma https://github.com/example/gamma https://github.com/example/gamma-fork\n")
    );

    // Copy fidelity: identical except the excluded dependency directory.
    let original: Vec<_> = tree_snapshot(&fx.mirror("ofl/alpha"))
        .into_iter()
        .filter(|(rel, _)| !rel.starts_with("venv"))
        .collect();
    let copy = tree_snapshot(&fx.mirror("ofl/beta"));
    assert_eq!(copy, original);
    assert!(fx.mirror("ofl/beta/.git").is_dir());
    assert!(!fx.mirror("ofl/beta/venv").exists());

    crate::test_log!("TEST PASS: shared_url_clones_once_and_copies_locally");
}

/// Counts reads so the test can prove the store was never consulted.
struct CountingMetadata {
    reads: Cell<usize>,
}

impl MetadataStore for CountingMetadata {
    fn read_source(&self, _record: &RecordLocator) -> Result<DeclaredSource, MetadataError> {
        self.reads.set(self.reads.get() + 1);
        Ok(DeclaredSource::new(Some(URL_X.to_string()), None))
    }
}

#[test]
fn bad_yaml_is_recorded_without_reading_metadata() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("ofl/broken", "", Some("archive: [unterminated\n"));

    let metadata = CountingMetadata {
        reads: Cell::new(0),
    };
    let vcs = RecordingVcs::new();
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs)
        .with_stores(&metadata, &FsUpstreamStore)
        .run()
        .unwrap();

    assert_eq!(metadata.reads.get(), 0);
    assert_eq!(summary.failures.get(&FailureKind::BadYaml), Some(&1));
    assert_eq!(summary.failure_count(), 1);
    assert!(vcs.calls().is_empty());

    let report = fx.report("bad_yaml").unwrap();
    assert_eq!(report.lines().count(), 1);
    assert!(report.starts_with("ofl/broken "), "{report}");
}

#[test]
fn unparseable_metadata_is_recorded() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("apache/odd", "source { repository_url: ", None);

    let vcs = RecordingVcs::new();
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    assert_eq!(summary.failures.get(&FailureKind::UnparseableMetadata), Some(&1));
    assert!(fx.report("unparseable_metadata_file").unwrap().starts_with("apache/odd"));
}

#[test]
fn stale_reports_are_purged_between_runs() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fs::create_dir_all(fx.failures_dir()).unwrap();
    fs::write(fx.failures_dir().join("no_source.txt"), "ofl/gone\nofl/also-gone\n").unwrap();
    fs::write(fx.failures_dir().join("cmd_fail.txt"), "ofl/old git clone\n").unwrap();
    fx.record("ofl/alpha", &repo_metadata("Alpha", URL_X), None);

    let vcs = RecordingVcs::new();
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    assert!(summary.is_clean());
    assert_eq!(fx.report("no_source").unwrap_or_default(), "");
    assert_eq!(fx.report("cmd_fail").unwrap_or_default(), "");
}

#[test]
fn second_run_pulls_instead_of_recloning() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("ofl/alpha", &repo_metadata("Alpha", URL_X), None)
        .record("ofl/beta", &repo_metadata("Beta", URL_X), None);

    let vcs = shared_repo_vcs();
    let first = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();
    let second = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    assert!(first.is_clean());
    assert!(second.is_clean());
    assert_eq!(vcs.clone_count(), 1);
    assert_eq!(vcs.pull_count(), 1);
    assert_eq!(second.pulls, 1);
    assert_eq!(second.local_copies, 1);
    assert_eq!(
        vcs.calls().last(),
        Some(&VcsCall::Pull {
            dest: fx.mirror("ofl/alpha")
        })
    );
}

#[test]
fn existing_clones_left_alone_without_pull() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("ofl/alpha", &repo_metadata("Alpha", URL_X), None);

    let vcs = RecordingVcs::new();
    Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    let no_pull = FetchOptions {
        pull_existing: false,
        ..FetchOptions::default()
    };
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs)
        .with_options(no_pull)
        .run()
        .unwrap();

    assert!(summary.is_clean());
    assert_eq!(summary.succeeded, 1);
    assert_eq!(vcs.pull_count(), 0);
    assert_eq!(vcs.clone_count(), 1);
}

#[test]
fn failed_clone_is_recorded_with_command_output() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("ofl/alpha", &repo_metadata("Alpha", URL_X), None)
        .record("ofl/beta", &repo_metadata("Beta", URL_X), None);

    let vcs = RecordingVcs::new().fail_url(URL_X);
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    // A failed URL is never registered, so the second record retries it.
    assert_eq!(vcs.clone_count(), 2);
    assert_eq!(summary.failures.get(&FailureKind::CmdFail), Some(&2));
    assert_eq!(summary.local_copies, 0);

    let report = fx.report("cmd_fail").unwrap();
    let first = report.lines().next().unwrap();
    assert!(first.starts_with("ofl/alpha git clone --depth=1 "), "{first}");
    assert!(first.ends_with("| fatal: repository not found"), "{first}");
}

#[test]
fn policy_failures_land_in_their_own_reports() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("ofl/empty", "name: \"Empty\"\n", None)
        .record(
            "ofl/zipped",
            "name: \"Zipped\"\n",
            Some("archive: https://github.com/o/zipped/releases/download/v1/z.zip\n"),
        )
        .record(
            "ofl/glory",
            &repo_metadata("Glory", "https://github.com/googlefonts/glory"),
            None,
        )
        .record(
            "ofl/twozips",
            "source { archive_url: \"https://h/a.zip\" }\n",
            Some("archive: https://h/b.zip\n"),
        );

    let vcs = RecordingVcs::new();
    let summary = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap();

    let kinds: Vec<_> = summary.failures.keys().map(|k| k.as_str()).collect();
    assert_eq!(
        kinds,
        [
            "archive_only",
            "denylisted_repo_url",
            "inconsistent_archive_urls",
            "no_source"
        ]
    );
    assert_eq!(summary.succeeded, 0);
    assert!(vcs.calls().is_empty());
    assert_eq!(fx.report("no_source").as_deref(), Some("ofl/empty\n"));
    assert_eq!(
        summary.report_paths.get(&FailureKind::NoSource),
        Some(&fx.failures_dir().join("no_source.txt"))
    );
}

#[test]
fn unknown_license_category_is_fatal() {
    init_test_logging();

    let fx = CorpusFixture::new();
    fx.record("ofl/alpha", &repo_metadata("Alpha", URL_X), None)
        .record("unlicensed/beta", &repo_metadata("Beta", URL_X), None);

    let vcs = RecordingVcs::new();
    let err = Pipeline::new(&fx.corpus, &fx.sources, &vcs).run().unwrap_err();

    match err {
        PipelineError::UnknownLicenseCategory { category, record } => {
            assert_eq!(category, "unlicensed");
            assert_eq!(record, PathBuf::from("unlicensed/beta"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_corpus_is_fatal() {
    init_test_logging();

    let fx = CorpusFixture::new();
    let vcs = RecordingVcs::new();
    let err = Pipeline::new(fx.dir.path().join("absent"), &fx.sources, &vcs)
        .run()
        .unwrap_err();
    assert!(matches!(err, PipelineError::CorpusNotFound(_)));
}
