//! Run summary: per-repository counts, failures with reasons, and the exit
//! code derived from them.

use std::collections::BTreeMap;

use lfscheck_core::{ObjectMap, RemediationEntry, RemediationStatus, RepoReference};
use lfscheck_store::CheckOutcome;
use serde::Serialize;

use crate::output::{Column, TableSection, Tabular};

/// Last stage a run completed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Map,
    Check,
    Remediate,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Failure {
    pub oid: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RepoReport {
    pub repo: String,
    pub objects: usize,
    pub present: usize,
    pub missing: usize,
    pub errors: usize,
    pub remediated: usize,
    pub failed: usize,
    pub pending: usize,
    pub malformed_pointers: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<Failure>,
}

impl RepoReport {
    #[must_use]
    pub fn new(repo: &RepoReference) -> Self {
        Self {
            repo: repo.to_string(),
            ..Self::default()
        }
    }

    /// Counts known once the object map exists.
    #[must_use]
    pub fn mapped(map: &ObjectMap) -> Self {
        Self {
            objects: map.len(),
            malformed_pointers: map.malformed_pointers,
            notes: map.notes.clone(),
            ..Self::new(&map.repo)
        }
    }

    pub fn record_check(&mut self, outcome: &CheckOutcome) {
        self.present = outcome.present.len();
        self.missing = outcome.missing.len();
        self.errors = outcome.errors.len();
        self.failures = outcome
            .errors
            .iter()
            .map(|failure| Failure {
                oid: failure.record.oid.to_string(),
                reason: format!("check: {}", failure.reason),
            })
            .collect();
    }

    /// Replace check failures with the remediation result.
    pub fn record_remediation(&mut self, entries: &[RemediationEntry]) {
        self.remediated = 0;
        self.failed = 0;
        self.pending = 0;
        self.failures.clear();
        for entry in entries {
            match &entry.status {
                RemediationStatus::Uploaded => self.remediated += 1,
                RemediationStatus::Failed(reason) => {
                    self.failed += 1;
                    self.failures.push(Failure {
                        oid: entry.oid.to_string(),
                        reason: reason.clone(),
                    });
                }
                RemediationStatus::Pending
                | RemediationStatus::Fetched
                | RemediationStatus::Verified => self.pending += 1,
            }
        }
    }

    /// Worst condition left after `stage`, for the table view.
    #[must_use]
    pub const fn status(&self, stage: Stage) -> &'static str {
        match stage {
            Stage::Map => "ok",
            Stage::Check if self.errors > 0 => "error",
            Stage::Check if self.missing > 0 => "missing",
            Stage::Remediate if self.failed > 0 => "failed",
            Stage::Remediate if self.pending > 0 => "pending",
            Stage::Check | Stage::Remediate => "ok",
        }
    }

    /// Objects still not known to be in the target after `stage`.
    #[must_use]
    pub const fn unresolved(&self, stage: Stage) -> usize {
        match stage {
            Stage::Map => 0,
            Stage::Check => self.missing + self.errors,
            Stage::Remediate => self.failed + self.pending,
        }
    }
}

/// A repository that could not be mapped.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SkippedRepo {
    pub repo: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Totals {
    pub repos: usize,
    pub skipped: usize,
    pub objects: usize,
    pub present: usize,
    pub missing: usize,
    pub errors: usize,
    pub remediated: usize,
    pub failed: usize,
    pub pending: usize,
    pub malformed_pointers: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub command: &'static str,
    pub stage: Stage,
    pub dry_run: bool,
    pub repos: Vec<RepoReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedRepo>,
    pub totals: Totals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation_file: Option<String>,
}

impl RunReport {
    /// Assemble the report; repositories are ordered by name.
    #[must_use]
    pub fn new(
        command: &'static str,
        stage: Stage,
        repos: BTreeMap<String, RepoReport>,
        skipped: Vec<SkippedRepo>,
    ) -> Self {
        let repos: Vec<RepoReport> = repos.into_values().collect();
        let mut totals = Totals {
            repos: repos.len(),
            skipped: skipped.len(),
            ..Totals::default()
        };
        for repo in &repos {
            totals.objects += repo.objects;
            totals.present += repo.present;
            totals.missing += repo.missing;
            totals.errors += repo.errors;
            totals.remediated += repo.remediated;
            totals.failed += repo.failed;
            totals.pending += repo.pending;
            totals.malformed_pointers += repo.malformed_pointers;
        }
        Self {
            command,
            stage,
            dry_run: false,
            repos,
            skipped,
            totals,
            remediation_file: None,
        }
    }

    /// Record repositories dropped before mapping (e.g. bad list lines).
    pub fn add_skipped(&mut self, skipped: impl IntoIterator<Item = SkippedRepo>) {
        self.skipped.extend(skipped);
        self.totals.skipped = self.skipped.len();
    }

    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.repos.iter().map(|r| r.unresolved(self.stage)).sum()
    }

    /// `0` when nothing is left unresolved, `1` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.unresolved() > 0 || !self.skipped.is_empty() {
            1
        } else {
            0
        }
    }
}

impl Tabular for RunReport {
    fn sections(&self) -> Vec<TableSection> {
        let mut sections = vec![TableSection::new(
            None,
            &[
                Column::text("repo"),
                Column::status("status"),
                Column::count("objects"),
                Column::count("present"),
                Column::count("missing"),
                Column::count("errors"),
                Column::count("remediated"),
                Column::count("failed"),
                Column::count("pending"),
                Column::count("malformed"),
            ],
            self.repos
                .iter()
                .map(|r| {
                    vec![
                        r.repo.clone(),
                        r.status(self.stage).to_string(),
                        r.objects.to_string(),
                        r.present.to_string(),
                        r.missing.to_string(),
                        r.errors.to_string(),
                        r.remediated.to_string(),
                        r.failed.to_string(),
                        r.pending.to_string(),
                        r.malformed_pointers.to_string(),
                    ]
                })
                .collect(),
        )];

        let failures: Vec<Vec<String>> = self
            .repos
            .iter()
            .flat_map(|r| {
                r.failures
                    .iter()
                    .map(|f| vec![r.repo.clone(), f.oid.clone(), f.reason.clone()])
            })
            .collect();
        if !failures.is_empty() {
            sections.push(TableSection::new(
                Some("failures"),
                &[Column::text("repo"), Column::text("oid"), Column::text("reason")],
                failures,
            ));
        }

        let notes: Vec<Vec<String>> = self
            .repos
            .iter()
            .flat_map(|r| r.notes.iter().map(|n| vec![r.repo.clone(), n.clone()]))
            .collect();
        if !notes.is_empty() {
            sections.push(TableSection::new(
                Some("notes"),
                &[Column::text("repo"), Column::text("note")],
                notes,
            ));
        }

        if !self.skipped.is_empty() {
            sections.push(TableSection::new(
                Some("skipped"),
                &[Column::text("repo"), Column::status("status"), Column::text("reason")],
                self.skipped
                    .iter()
                    .map(|s| vec![s.repo.clone(), "skipped".to_string(), s.reason.clone()])
                    .collect(),
            ));
        }
        sections
    }
}
