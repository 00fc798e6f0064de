//! Driver runs over git fixtures and in-memory stores.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lfscheck_config::LfsCheckConfig;
use lfscheck_core::checkpoint::{RemediationFile, map_file_name};
use lfscheck_core::{HashAlgorithm, KeyLayout, Oid, RemediationStatus, RepoReference};
use lfscheck_store::{CloudStore, LfsStore, RetryPolicy, StoreError};
use object_store::memory::InMemory;
use pretty_assertions::assert_eq;

use super::*;

const CONTENT: &[u8] = b"forty-two bytes of very large science data";

fn oid(fill: char) -> Oid {
    Oid::new(HashAlgorithm::Sha256, fill.to_string().repeat(64)).unwrap()
}

fn pointer_text(fill: char, size: usize) -> String {
    format!(
        "version https://git-lfs.github.com/spec/v1\noid sha256:{}\nsize {size}\n",
        fill.to_string().repeat(64)
    )
}

fn run_git(repo_path: &Path, args: &[&str]) {
    let output = std::process::Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .unwrap_or_else(|e| panic!("git {} failed: {}", args.join(" "), e));
    assert!(
        output.status.success(),
        "git {} failed:\nstderr: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A checkout at `<root>/lsst/<name>` with one pointer for `fill`, tagged `v1.0`.
fn tagged_checkout(root: &Path, name: &str, fill: char) -> RepoReference {
    let path = root.join("lsst").join(name);
    fs::create_dir_all(path.join("data")).unwrap();
    run_git(&path, &["init", "-q", "--initial-branch=main"]);
    run_git(&path, &["config", "user.email", "test@lfscheck.dev"]);
    run_git(&path, &["config", "user.name", "lfscheck Test"]);
    run_git(&path, &["config", "commit.gpgsign", "false"]);
    fs::write(path.join("data/obj.fits"), pointer_text(fill, CONTENT.len())).unwrap();
    run_git(&path, &["add", "."]);
    run_git(&path, &["commit", "-q", "-m", "add pointer"]);
    run_git(&path, &["tag", "v1.0"]);
    RepoReference::new("lsst", name)
}

fn memory_store(name: &str) -> Arc<CloudStore> {
    Arc::new(CloudStore::new(
        name,
        Arc::new(InMemory::new()),
        "",
        KeyLayout::Sharded,
        Duration::from_secs(5),
    ))
}

struct Fixture {
    _dir: tempfile::TempDir,
    checkouts: PathBuf,
    settings: PipelineSettings,
    source: Arc<CloudStore>,
    target: Arc<CloudStore>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::TempDir::new().expect("create tempdir");
        let checkouts = dir.path().join("checkouts");
        let mut config = LfsCheckConfig::default();
        config.paths.map_directory = dir.path().join("maps").to_string_lossy().into_owned();
        config.scan.checkout_root = checkouts.to_string_lossy().into_owned();
        config.scan.clone = false;
        config.scan.repo_concurrency = 2;

        let mut settings = PipelineSettings::from_config(&config).unwrap();
        let retry = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
        };
        settings.retry = retry;
        settings.remediation.retry = retry;

        Self {
            _dir: dir,
            checkouts,
            settings,
            source: memory_store("source"),
            target: memory_store("target"),
        }
    }

    async fn seed_source(&self, repo: &RepoReference, fill: char) {
        self.source.put(repo, &oid(fill), CONTENT.to_vec()).await.unwrap();
    }

    async fn check(&self, repos: Vec<RepoReference>) -> RunReport {
        run_check(repos, &self.settings, Arc::clone(&self.source), Arc::clone(&self.target))
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn missing_object_is_reported_remediated_then_resolved() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    fx.seed_source(&r1, 'a').await;

    fx.settings.stop_after = StopAfter::Check;
    let checked = fx.check(vec![r1.clone()]).await;
    assert_eq!(checked.stage, Stage::Check);
    assert_eq!(checked.totals.missing, 1);
    assert_eq!(checked.exit_code(), 1);

    let candidates = fx.settings.map_directory.join(DEFAULT_REMEDIATION_FILE);
    assert_eq!(
        checked.remediation_file.as_deref(),
        Some(candidates.display().to_string().as_str())
    );
    assert_eq!(RemediationFile::load(&candidates).unwrap().entry_count(), 1);

    fx.settings.stop_after = StopAfter::Never;
    let remediated = run_remediate(
        RemediateInput::File(candidates),
        &fx.settings,
        Arc::clone(&fx.source),
        Arc::clone(&fx.target),
    )
    .await
    .unwrap();
    assert_eq!(remediated.totals.remediated, 1);
    assert_eq!(remediated.exit_code(), 0);
    assert_eq!(fx.target.get(&r1, &oid('a')).await.unwrap(), CONTENT);

    fx.settings.stop_after = StopAfter::Check;
    let rechecked = fx.check(vec![r1]).await;
    assert_eq!(rechecked.totals.present, 1);
    assert_eq!(rechecked.totals.missing, 0);
    assert_eq!(rechecked.exit_code(), 0);
}

#[tokio::test]
async fn full_run_copies_and_writes_the_remediation_file() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    let r2 = tagged_checkout(&fx.checkouts, "r2", 'b');
    fx.seed_source(&r1, 'a').await;
    fx.target.put(&r2, &oid('b'), CONTENT.to_vec()).await.unwrap();

    let output = fx.settings.map_directory.join("out/remediation.json");
    fx.settings.remediation_output = Some(output.clone());
    let report = fx.check(vec![r2, r1]).await;

    assert_eq!(report.stage, Stage::Remediate);
    let names: Vec<&str> = report.repos.iter().map(|r| r.repo.as_str()).collect();
    assert_eq!(names, vec!["lsst/r1", "lsst/r2"]);
    assert_eq!(report.totals.present, 1);
    assert_eq!(report.totals.remediated, 1);
    assert_eq!(report.exit_code(), 0);

    let file = RemediationFile::load(&output).unwrap();
    assert_eq!(file.repos.len(), 1);
    assert_eq!(file.repos[0].objects[0].status, RemediationStatus::Uploaded);
}

#[tokio::test]
async fn object_absent_from_source_fails_with_reason() {
    let fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');

    let report = fx.check(vec![r1]).await;
    assert_eq!(report.totals.failed, 1);
    assert_eq!(report.repos[0].failures[0].reason, "not found in source");
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn dry_run_leaves_target_untouched() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    fx.seed_source(&r1, 'a').await;
    fx.settings.remediation.dry_run = true;

    let report = fx.check(vec![r1.clone()]).await;
    assert!(report.dry_run);
    assert_eq!(report.totals.pending, 1);
    assert_eq!(report.exit_code(), 1);
    assert!(!fx.target.exists(&r1, &oid('a')).await.unwrap());
}

#[tokio::test]
async fn unreadable_repository_is_skipped_not_fatal() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    fx.settings.stop_after = StopAfter::Scan;

    let report = fx
        .check(vec![r1, RepoReference::new("lsst", "not-cloned")])
        .await;
    assert_eq!(report.stage, Stage::Map);
    assert_eq!(report.totals.repos, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].repo, "lsst/not-cloned");
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn stop_after_scan_persists_maps_only() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    fx.settings.stop_after = StopAfter::Scan;

    let report = fx.check(vec![r1.clone()]).await;
    assert_eq!(report.totals.objects, 1);
    assert_eq!(report.remediation_file, None);
    assert_eq!(report.exit_code(), 0);
    assert!(fx.settings.map_directory.join(map_file_name(&r1)).is_file());
    assert!(!fx.settings.map_directory.join(DEFAULT_REMEDIATION_FILE).exists());
}

#[tokio::test]
async fn persisted_maps_are_reused_without_a_checkout() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    fx.settings.stop_after = StopAfter::Scan;
    fx.check(vec![r1.clone()]).await;

    fs::remove_dir_all(fx.checkouts.join("lsst/r1")).unwrap();
    let resumed = fx.check(vec![r1.clone()]).await;
    assert!(resumed.skipped.is_empty());
    assert_eq!(resumed.totals.objects, 1);

    fx.settings.rescan = true;
    let rescanned = fx.check(vec![r1]).await;
    assert_eq!(rescanned.skipped.len(), 1);
}

#[tokio::test]
async fn reloaded_map_checks_like_the_scanned_one() {
    let fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    let checkout = fx.checkouts.join("lsst").join("r1");
    fs::write(checkout.join("data/other.fits"), pointer_text('b', 7)).unwrap();
    run_git(&checkout, &["add", "."]);
    run_git(&checkout, &["commit", "-q", "-m", "add second pointer"]);
    run_git(&checkout, &["tag", "v1.1"]);
    fx.target.put(&r1, &oid('a'), CONTENT.to_vec()).await.unwrap();

    let mapped = map_stage(vec![r1.clone()], &fx.settings).await.unwrap();
    let scanned = &mapped.maps[0];
    let reloaded = ObjectMap::load(&fx.settings.map_directory.join(map_file_name(&r1))).unwrap();

    let checker = ExistenceChecker::new(Arc::clone(&fx.target), fx.settings.retry, 4, 1);
    let from_scan = checker.check(&r1, scanned.to_records()).await.unwrap();
    let from_file = checker.check(&r1, reloaded.to_records()).await.unwrap();

    assert_eq!(from_scan.present.len(), 1);
    assert_eq!(from_scan.missing.len(), 1);
    assert_eq!(from_file, from_scan);
}

#[tokio::test]
async fn remediate_from_maps_checks_then_copies() {
    let mut fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');
    fx.seed_source(&r1, 'a').await;
    run_map_one(&fx.checkouts.join("lsst/r1"), r1.clone(), &fx.settings)
        .await
        .unwrap();

    fx.settings.input_glob = "oids--lsst--*.json".to_string();
    let report = run_remediate(
        RemediateInput::Maps,
        &fx.settings,
        Arc::clone(&fx.source),
        Arc::clone(&fx.target),
    )
    .await
    .unwrap();
    assert_eq!(report.command, "remediate-lfs");
    assert_eq!(report.totals.objects, 1);
    assert_eq!(report.totals.missing, 1);
    assert_eq!(report.totals.remediated, 1);
    assert!(fx.target.exists(&r1, &oid('a')).await.unwrap());
}

#[tokio::test]
async fn map_one_reports_the_written_map() {
    let fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');

    let report = run_map_one(&fx.checkouts.join("lsst/r1"), r1.clone(), &fx.settings)
        .await
        .unwrap();
    assert_eq!(report.command, "oid-mapper");
    assert_eq!(report.totals.objects, 1);
    let map = ObjectMap::load(&fx.settings.map_directory.join(map_file_name(&r1))).unwrap();
    assert_eq!(map.refs_scanned.iter().collect::<Vec<_>>(), vec!["refs/heads/main", "refs/tags/v1.0"]);
}

#[tokio::test]
async fn map_one_rejects_a_non_repository() {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.checkouts).unwrap();
    let result = run_map_one(&fx.checkouts, RepoReference::new("lsst", "nothing"), &fx.settings).await;
    assert!(result.is_err());
}

/// Refuses every call, like a store reached with the wrong credentials.
struct DenyingStore;

impl LfsStore for DenyingStore {
    fn name(&self) -> &str {
        "target"
    }

    async fn exists(&self, _repo: &RepoReference, _oid: &Oid) -> Result<bool, StoreError> {
        Err(StoreError::Auth {
            store: "target".into(),
            reason: "403 Forbidden".into(),
        })
    }

    async fn get(&self, _repo: &RepoReference, _oid: &Oid) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::Auth {
            store: "target".into(),
            reason: "403 Forbidden".into(),
        })
    }

    async fn put(&self, _repo: &RepoReference, _oid: &Oid, _data: Vec<u8>) -> Result<(), StoreError> {
        Err(StoreError::Auth {
            store: "target".into(),
            reason: "403 Forbidden".into(),
        })
    }
}

#[tokio::test]
async fn authorization_failure_aborts_the_run() {
    let fx = Fixture::new();
    let r1 = tagged_checkout(&fx.checkouts, "r1", 'a');

    let error = run_check(vec![r1], &fx.settings, Arc::clone(&fx.source), Arc::new(DenyingStore))
        .await
        .unwrap_err();
    let chain = format!("{error:#}");
    assert!(chain.contains("existence check against target aborted"), "{chain}");
    assert!(!fx.settings.map_directory.join(DEFAULT_REMEDIATION_FILE).exists());
}

#[test]
fn candidates_include_missing_and_errored_records() {
    use lfscheck_core::ObjectRecord;
    use lfscheck_store::{CheckFailure, CheckOutcome};

    let repo = RepoReference::new("lsst", "r1");
    let checks = vec![
        RepoCheck {
            repo: repo.clone(),
            outcome: CheckOutcome {
                present: vec![ObjectRecord::new(oid('a'), 1)],
                missing: vec![ObjectRecord::new(oid('b'), 2)],
                errors: vec![CheckFailure {
                    record: ObjectRecord::new(oid('c'), 3),
                    reason: "timed out".to_string(),
                }],
            },
        },
        RepoCheck {
            repo: RepoReference::new("lsst", "r2"),
            outcome: CheckOutcome {
                present: vec![ObjectRecord::new(oid('d'), 4)],
                ..CheckOutcome::default()
            },
        },
    ];

    let file = remediation_candidates(&checks);
    assert_eq!(file.repos.len(), 1);
    assert_eq!(file.repos[0].repo(), repo);
    let oids: Vec<Oid> = file.repos[0].objects.iter().map(|e| e.oid.clone()).collect();
    assert_eq!(oids, vec![oid('b'), oid('c')]);
    assert!(file.repos[0].objects.iter().all(|e| e.status == RemediationStatus::Pending));
}
