//! Stage pipeline: map → check → remediate.
//!
//! Each stage is a function from the previous stage's output to its own:
//!
//! 1. [`map_stage`]: repository references → object maps (one per repository,
//!    persisted as soon as it is built)
//! 2. [`check_stage`]: object maps → present / missing / errored records
//! 3. [`remediate_stage`]: remediation entries → entries with final statuses
//!
//! The drivers ([`run_check`], [`run_map_one`], [`run_remediate`]) wire the
//! stages together, persist checkpoints at stage boundaries and decide
//! whether to stop early. Authorization failures abort the run; everything
//! per repository or per object is folded into the [`RunReport`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use lfscheck_config::LfsCheckConfig;
use lfscheck_core::checkpoint::{RemediationFile, load_object_maps};
use lfscheck_core::{CoreError, ObjectMap, RemediationEntry, RepoReference, RepoRemediation};
use lfscheck_git::{CloneOptions, GitError, ScanOptions, ensure_checkout, scan_repository};
use lfscheck_store::{
    CheckOutcome, ExistenceChecker, LfsStore, RemediationEngine, RemediationOptions, RetryPolicy,
    StoreError,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::progress::Progress;
use crate::report::{RepoReport, RunReport, SkippedRepo, Stage};

/// Remediation file written into the map directory when a run stops after
/// the check stage without an explicit output file.
pub const DEFAULT_REMEDIATION_FILE: &str = "remediation.json";

/// Stage boundary at which a driver persists and stops.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StopAfter {
    Scan,
    Check,
    Never,
}

/// Everything the stages need, resolved from configuration and flags.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub map_directory: PathBuf,
    pub input_glob: String,
    pub scan: Arc<ScanOptions>,
    /// `None` clones into a temporary directory removed after mapping.
    pub checkout_root: Option<PathBuf>,
    pub clone: CloneOptions,
    pub rescan: bool,
    pub repo_concurrency: usize,
    pub check_concurrency: usize,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub remediation: RemediationOptions,
    pub stop_after: StopAfter,
    pub remediation_output: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn from_config(config: &LfsCheckConfig) -> anyhow::Result<Self> {
        let scan = ScanOptions::new(
            &config.scan.branch_pattern,
            config.scan.max_pointer_size,
            config.scan.full_map,
        )
        .context("invalid scan.branch_pattern")?;
        let retry = RetryPolicy::from_config(&config.retry);

        Ok(Self {
            map_directory: config.paths.map_directory(),
            input_glob: config.paths.input_glob.clone(),
            scan: Arc::new(scan),
            checkout_root: config.scan.checkout_root(),
            clone: CloneOptions {
                enabled: config.scan.clone,
                timeout: config.scan.clone_timeout(),
            },
            rescan: config.scan.rescan,
            repo_concurrency: config.scan.repo_concurrency,
            check_concurrency: config.check.concurrency,
            batch_size: config.check.batch_size,
            retry,
            remediation: RemediationOptions {
                concurrency: config.remediate.concurrency,
                retry,
                dry_run: config.remediate.dry_run,
                verify_digest: config.remediate.verify_digest,
            },
            stop_after: StopAfter::Never,
            remediation_output: None,
        })
    }

    /// Where this run writes its remediation file, if anywhere.
    fn remediation_path(&self) -> Option<PathBuf> {
        self.remediation_output.clone().or_else(|| {
            (self.stop_after == StopAfter::Check)
                .then(|| self.map_directory.join(DEFAULT_REMEDIATION_FILE))
        })
    }
}

// ---------------------------------------------------------------------------
// Map stage
// ---------------------------------------------------------------------------

/// Object maps of the repositories that could be mapped, in name order.
#[derive(Debug, Default)]
pub struct MapOutcome {
    pub maps: Vec<ObjectMap>,
    pub skipped: Vec<SkippedRepo>,
}

enum MapFailure {
    /// The repository is skipped; the run continues.
    Repo(GitError),
    /// The map directory is unusable; the run stops.
    Persist(CoreError),
    /// The blocking scan task panicked or was cancelled.
    Task(tokio::task::JoinError),
}

/// Map every repository with at most `repo_concurrency` scans in flight.
///
/// A repository whose map is already persisted is not scanned again unless
/// `rescan` is set. Repositories that cannot be checked out or have no
/// selectable refs are reported as skipped.
///
/// # Errors
///
/// Fails if the temporary checkout directory cannot be created or an object
/// map cannot be written.
pub async fn map_stage(
    repos: Vec<RepoReference>,
    settings: &PipelineSettings,
) -> anyhow::Result<MapOutcome> {
    let scratch;
    let root = match &settings.checkout_root {
        Some(root) => root.clone(),
        None => {
            scratch = tempfile::Builder::new()
                .prefix("lfscheck-")
                .tempdir()
                .context("failed to create a temporary checkout directory")?;
            scratch.path().to_path_buf()
        }
    };

    let progress = Progress::stage("map", repos.len() as u64);
    let shared = Arc::new(settings.clone());
    let permits = Arc::new(Semaphore::new(settings.repo_concurrency.max(1)));
    let mut set = JoinSet::new();

    for repo in repos {
        let permit = Arc::clone(&permits)
            .acquire_owned()
            .await
            .context("repository worker pool closed")?;
        let settings = Arc::clone(&shared);
        let root = root.clone();
        set.spawn(async move {
            let _permit = permit;
            let result = map_repo(repo.clone(), root, settings).await;
            (repo, result)
        });
    }

    let mut outcome = MapOutcome::default();
    while let Some(joined) = set.join_next().await {
        let (repo, result) = joined.context("repository mapping task failed")?;
        progress.inc(1);
        progress.set_message(&repo.to_string());
        match result {
            Ok(map) => outcome.maps.push(map),
            Err(MapFailure::Repo(error)) => {
                tracing::warn!(repo = %repo, %error, "skipping repository");
                outcome.skipped.push(SkippedRepo {
                    repo: repo.to_string(),
                    reason: error.to_string(),
                });
            }
            Err(MapFailure::Persist(error)) => {
                progress.finish_err("aborted");
                set.abort_all();
                return Err(anyhow::Error::new(error)
                    .context(format!("failed to persist the object map of {repo}")));
            }
            Err(MapFailure::Task(error)) => {
                progress.finish_err("aborted");
                set.abort_all();
                return Err(anyhow::Error::new(error)
                    .context(format!("mapping task for {repo} failed")));
            }
        }
    }
    progress.finish_ok("done");

    outcome.maps.sort_by_key(|map| map.repo.slug());
    tracing::info!(
        mapped = outcome.maps.len(),
        skipped = outcome.skipped.len(),
        "mapping stage finished"
    );
    Ok(outcome)
}

/// Clone (async, under the clone timeout) then scan and persist on a
/// blocking thread.
async fn map_repo(
    repo: RepoReference,
    root: PathBuf,
    settings: Arc<PipelineSettings>,
) -> Result<ObjectMap, MapFailure> {
    if !settings.rescan {
        if let Some(map) = ObjectMap::load_existing(&settings.map_directory, &repo) {
            tracing::info!(repo = %repo, objects = map.len(), "reusing persisted object map");
            return Ok(map);
        }
    }

    let checkout = ensure_checkout(&root, &repo, &settings.clone)
        .await
        .map_err(MapFailure::Repo)?;
    tokio::task::spawn_blocking(move || {
        let map = scan_repository(&checkout, &repo, &settings.scan).map_err(MapFailure::Repo)?;
        map.write_atomic(&settings.map_directory)
            .map_err(MapFailure::Persist)?;
        Ok(map)
    })
    .await
    .map_err(MapFailure::Task)?
}

// ---------------------------------------------------------------------------
// Check stage
// ---------------------------------------------------------------------------

/// Existence check result for one repository.
#[derive(Debug, Clone)]
pub struct RepoCheck {
    pub repo: RepoReference,
    pub outcome: CheckOutcome,
}

/// Check every object of every map against the target store.
///
/// # Errors
///
/// Returns [`StoreError::Auth`] if the target store refuses a call.
pub async fn check_stage<T: LfsStore>(
    maps: &[ObjectMap],
    checker: &ExistenceChecker<T>,
) -> Result<Vec<RepoCheck>, StoreError> {
    let progress = Progress::stage("check", maps.len() as u64);
    let mut checks = Vec::with_capacity(maps.len());

    for map in maps {
        progress.set_message(&map.repo.to_string());
        let outcome = checker
            .check(&map.repo, map.to_records())
            .await
            .inspect_err(|_| progress.finish_err("aborted"))?;
        checks.push(RepoCheck {
            repo: map.repo.clone(),
            outcome,
        });
        progress.inc(1);
    }

    progress.finish_ok("done");
    Ok(checks)
}

/// Remediation candidates: missing records plus records whose check
/// errored, all `Pending`. Repositories with nothing to do are left out.
#[must_use]
pub fn remediation_candidates(checks: &[RepoCheck]) -> RemediationFile {
    let repos = checks
        .iter()
        .filter_map(|check| {
            let entries: Vec<RemediationEntry> = check
                .outcome
                .missing
                .iter()
                .chain(check.outcome.errors.iter().map(|failure| &failure.record))
                .map(RemediationEntry::pending)
                .collect();
            (!entries.is_empty()).then(|| RepoRemediation::new(&check.repo, entries))
        })
        .collect();
    RemediationFile::new(repos)
}

// ---------------------------------------------------------------------------
// Remediate stage
// ---------------------------------------------------------------------------

/// Run the remediation engine over every repository of `file`.
///
/// # Errors
///
/// Returns [`StoreError::Auth`] if either store refuses a call.
pub async fn remediate_stage<S: LfsStore, T: LfsStore>(
    file: RemediationFile,
    engine: &RemediationEngine<S, T>,
) -> Result<RemediationFile, StoreError> {
    let progress = Progress::stage("remediate", file.repos.len() as u64);
    let mut done = Vec::with_capacity(file.repos.len());

    for entry in file.repos {
        let repo = entry.repo();
        progress.set_message(&repo.to_string());
        let objects = engine
            .remediate(&repo, entry.objects)
            .await
            .inspect_err(|_| progress.finish_err("aborted"))?;
        done.push(RepoRemediation::new(&repo, objects));
        progress.inc(1);
    }

    progress.finish_ok("done");
    Ok(RemediationFile::new(done))
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// One run's stores and accumulated report state.
struct Run<'a, S, T> {
    command: &'static str,
    settings: &'a PipelineSettings,
    source: Arc<S>,
    target: Arc<T>,
    reports: BTreeMap<String, RepoReport>,
    skipped: Vec<SkippedRepo>,
    remediation_file: Option<PathBuf>,
}

impl<'a, S: LfsStore, T: LfsStore> Run<'a, S, T> {
    fn new(
        command: &'static str,
        settings: &'a PipelineSettings,
        source: Arc<S>,
        target: Arc<T>,
    ) -> Self {
        Self {
            command,
            settings,
            source,
            target,
            reports: BTreeMap::new(),
            skipped: Vec::new(),
            remediation_file: None,
        }
    }

    fn report_maps(&mut self, maps: &[ObjectMap]) {
        for map in maps {
            self.reports.insert(map.repo.slug(), RepoReport::mapped(map));
        }
    }

    async fn check(mut self, maps: &[ObjectMap]) -> anyhow::Result<RunReport> {
        let checker = ExistenceChecker::new(
            Arc::clone(&self.target),
            self.settings.retry,
            self.settings.check_concurrency,
            self.settings.batch_size,
        );
        let checks = check_stage(maps, &checker)
            .await
            .with_context(|| format!("existence check against {} aborted", self.target.name()))?;
        for check in &checks {
            if let Some(report) = self.reports.get_mut(&check.repo.slug()) {
                report.record_check(&check.outcome);
            }
        }

        let candidates = remediation_candidates(&checks);
        self.remediation_file = self.settings.remediation_path();
        if let Some(path) = &self.remediation_file {
            write_remediation(&candidates, path)?;
        }

        if self.settings.stop_after == StopAfter::Check {
            tracing::info!(candidates = candidates.entry_count(), "stopping after check");
            return Ok(self.finish(Stage::Check));
        }
        self.remediate(candidates).await
    }

    async fn remediate(mut self, candidates: RemediationFile) -> anyhow::Result<RunReport> {
        tracing::info!(
            entries = candidates.entry_count(),
            dry_run = self.settings.remediation.dry_run,
            "remediating objects"
        );
        let engine = RemediationEngine::new(
            Arc::clone(&self.source),
            Arc::clone(&self.target),
            self.settings.remediation,
        );
        let remediated = remediate_stage(candidates, &engine)
            .await
            .context("remediation aborted")?;

        for entry in &remediated.repos {
            let repo = entry.repo();
            self.reports
                .entry(repo.slug())
                .or_insert_with(|| RepoReport::new(&repo))
                .record_remediation(&entry.objects);
        }

        if self.remediation_file.is_none() {
            self.remediation_file = self.settings.remediation_path();
        }
        if let Some(path) = &self.remediation_file {
            write_remediation(&remediated, path)?;
        }
        Ok(self.finish(Stage::Remediate))
    }

    fn finish(self, stage: Stage) -> RunReport {
        finish_report(
            self.command,
            stage,
            self.settings,
            self.reports,
            self.skipped,
            self.remediation_file.as_deref(),
        )
    }
}

fn finish_report(
    command: &'static str,
    stage: Stage,
    settings: &PipelineSettings,
    reports: BTreeMap<String, RepoReport>,
    skipped: Vec<SkippedRepo>,
    remediation_file: Option<&Path>,
) -> RunReport {
    let mut report = RunReport::new(command, stage, reports, skipped);
    report.dry_run = settings.remediation.dry_run && stage == Stage::Remediate;
    report.remediation_file = remediation_file.map(|path| path.display().to_string());
    report
}

fn write_remediation(file: &RemediationFile, path: &Path) -> anyhow::Result<()> {
    file.write_atomic(path)
        .with_context(|| format!("failed to write remediation file {}", path.display()))?;
    tracing::info!(path = %path.display(), entries = file.entry_count(), "wrote remediation file");
    Ok(())
}

/// `check_lfs`: map every listed repository, check the target store, and
/// remediate whatever is missing, stopping early if asked to.
///
/// # Errors
///
/// Fails on an unusable map directory, an unwritable remediation file, or an
/// authorization failure in either store.
pub async fn run_check<S: LfsStore, T: LfsStore>(
    repos: Vec<RepoReference>,
    settings: &PipelineSettings,
    source: Arc<S>,
    target: Arc<T>,
) -> anyhow::Result<RunReport> {
    tracing::info!(repos = repos.len(), "mapping repositories");
    let mapped = map_stage(repos, settings).await?;

    let mut run = Run::new("check-lfs", settings, source, target);
    run.report_maps(&mapped.maps);
    run.skipped = mapped.skipped;

    if settings.stop_after == StopAfter::Scan {
        tracing::info!("stopping after scan");
        return Ok(run.finish(Stage::Map));
    }
    run.check(&mapped.maps).await
}

/// `oid_mapper`: map one local checkout and persist its object map.
///
/// # Errors
///
/// Fails if the checkout cannot be scanned or the map cannot be written.
pub async fn run_map_one(
    checkout: &Path,
    repo: RepoReference,
    settings: &PipelineSettings,
) -> anyhow::Result<RunReport> {
    let scan = Arc::clone(&settings.scan);
    let path = checkout.to_path_buf();
    let scanned = repo.clone();
    let map = tokio::task::spawn_blocking(move || scan_repository(&path, &scanned, &scan))
        .await
        .context("mapping task failed")?
        .with_context(|| format!("failed to map {} at {}", repo, checkout.display()))?;

    let written = map
        .write_atomic(&settings.map_directory)
        .context("failed to write object map")?;
    tracing::info!(repo = %repo, path = %written.display(), objects = map.len(), "wrote object map");

    let reports = BTreeMap::from([(repo.slug(), RepoReport::mapped(&map))]);
    Ok(finish_report("oid-mapper", Stage::Map, settings, reports, Vec::new(), None))
}

/// What `remediate_lfs` starts from.
#[derive(Clone, Debug)]
pub enum RemediateInput {
    /// Object maps in the map directory matching the input glob; they are
    /// checked against the target before remediation.
    Maps,
    /// A remediation file from an earlier run; only entries not yet
    /// uploaded are processed.
    File(PathBuf),
}

/// `remediate_lfs`: check persisted maps (or resume a remediation file) and
/// copy missing objects from the source store to the target store.
///
/// # Errors
///
/// Fails on unreadable checkpoints, an unwritable remediation file, or an
/// authorization failure in either store.
pub async fn run_remediate<S: LfsStore, T: LfsStore>(
    input: RemediateInput,
    settings: &PipelineSettings,
    source: Arc<S>,
    target: Arc<T>,
) -> anyhow::Result<RunReport> {
    let mut run = Run::new("remediate-lfs", settings, source, target);

    match input {
        RemediateInput::Maps => {
            let maps = load_object_maps(&settings.map_directory, &settings.input_glob)
                .with_context(|| {
                    format!(
                        "failed to load object maps from {}",
                        settings.map_directory.display()
                    )
                })?;
            if maps.is_empty() {
                tracing::warn!(
                    dir = %settings.map_directory.display(),
                    glob = %settings.input_glob,
                    "no object maps matched"
                );
            }
            run.report_maps(&maps);
            run.check(&maps).await
        }
        RemediateInput::File(path) => {
            let file = RemediationFile::load(&path)
                .with_context(|| format!("failed to load remediation file {}", path.display()))?;
            for entry in &file.repos {
                let mut report = RepoReport::new(&entry.repo());
                report.objects = entry.objects.len();
                report.missing = entry.outstanding().count();
                run.reports.insert(entry.repo().slug(), report);
            }
            run.remediate(file).await
        }
    }
}

#[cfg(test)]
mod tests;
