//! Checkpoint documents against their generated JSON schemas, and against the
//! documented file shapes.

use chrono::Utc;
use pretty_assertions::assert_eq;
use schemars::schema_for;
use lfscheck_core::checkpoint::RemediationFile;
use lfscheck_core::object_map::ObjectMapFile;
use lfscheck_core::{
    HashAlgorithm, ObjectMap, ObjectRecord, Oid, RemediationEntry, RemediationStatus,
    RepoReference, RepoRemediation,
};

fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

fn oid(fill: char) -> Oid {
    Oid::new(HashAlgorithm::Sha256, fill.to_string().repeat(64)).unwrap()
}

#[test]
fn object_map_file_matches_schema() {
    let mut map = ObjectMap::new(RepoReference::from_url("https://github.com/lsst/afwdata").unwrap());
    map.refs_scanned.insert("refs/heads/main".into());
    map.refs_scanned.insert("refs/tags/w.2024.01".into());
    let mut record = ObjectRecord::new(oid('a'), 42);
    record.refs = vec!["refs/heads/main".into()];
    record.paths = vec!["data/image.fits".into()];
    map.insert(record);

    let schema = serde_json::to_value(schema_for!(ObjectMapFile)).unwrap();
    let instance = serde_json::to_value(map.to_file()).unwrap();
    let errors = validate_against_schema(&schema, &instance);
    assert!(errors.is_empty(), "schema validation failed: {errors:?}");
}

#[test]
fn remediation_file_matches_schema() {
    let mut failed = RemediationEntry::pending(&ObjectRecord::new(oid('b'), 7));
    failed
        .advance(RemediationStatus::Failed("size mismatch: declared 7, fetched 6".into()))
        .unwrap();
    let file = RemediationFile::new(vec![RepoRemediation::new(
        &RepoReference::new("lsst", "afwdata"),
        vec![RemediationEntry::pending(&ObjectRecord::new(oid('a'), 42)), failed],
    )]);

    let schema = serde_json::to_value(schema_for!(RemediationFile)).unwrap();
    let instance = serde_json::to_value(&file).unwrap();
    let errors = validate_against_schema(&schema, &instance);
    assert!(errors.is_empty(), "schema validation failed: {errors:?}");
}

#[test]
fn documented_object_map_shape_parses() {
    let digest = "a".repeat(64);
    let doc = serde_json::json!({
        "repoOwner": "lsst",
        "repoName": "afwdata",
        "refsScanned": ["refs/tags/v1.0"],
        "scannedAt": Utc::now(),
        "objects": [{ "oid": digest, "algorithm": "sha256", "size": 42 }]
    });

    let file: ObjectMapFile = serde_json::from_value(doc).unwrap();
    assert_eq!(file.format_version, 1);
    assert_eq!(file.malformed_pointers, 0);

    let map = ObjectMap::from_file(file).unwrap();
    assert_eq!(map.repo, RepoReference::new("lsst", "afwdata"));
    assert_eq!(map.to_records(), vec![ObjectRecord::new(oid('a'), 42)]);
}

#[test]
fn documented_remediation_shape_parses() {
    let digest = "b".repeat(64);
    let doc = serde_json::json!({
        "repoOwner": "lsst",
        "repoName": "afwdata",
        "objects": [
            { "oid": digest, "algorithm": "sha256", "size": 7, "status": "uploaded" },
            { "oid": digest, "algorithm": "sha256", "size": 7, "status": { "failed": "upload: timeout" } }
        ]
    });

    let repo: RepoRemediation = serde_json::from_value(doc).unwrap();
    assert_eq!(repo.objects[0].status, RemediationStatus::Uploaded);
    assert_eq!(
        repo.objects[1].status,
        RemediationStatus::Failed("upload: timeout".into())
    );
    assert_eq!(repo.outstanding().count(), 1);
}
