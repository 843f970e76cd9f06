//! Pipeline tests: extractions to will model to report, plus the
//! HTTP-backed oracle path against a mock endpoint.

use std::sync::Arc;

use crate::common::{
    ContainsJudge, StubClassifier, directive, mount_chat_reply, person, sample_population,
    sealed_will, start_oracle_mock,
};

use probate_engine::{
    ChecksumPolicy, DevolveError, DevolveOptions, PopulationStore, build_will_model, devolve,
    verify_checksum,
};
use probate_oracle::{HttpOracle, Oracle, RuleClassifier, SimilarityJudge};
use probate_types::{Asset, ExtractionsDoc};

const EXTRACTIONS: &str = r#"{
    "full_text": "I, John Doe, leave my red car to Tom Doe and Jack Doe.",
    "date_of_will": "2023-09-14",
    "extractions": {
        "entities": [{
            "Testator": {"id": "t1", "name": "John Doe"},
            "Beneficiary": [
                {"id": "b1", "name": "Tom Doe"},
                {"id": "b2", "name": "Jack Doe"}
            ],
            "Asset": [{"id": "a1", "description": "my red car"}]
        }],
        "events": [{
            "id": "e1",
            "type": "BequestAsset",
            "Asset": "a1",
            "Beneficiary": ["b1", "b2"]
        }]
    }
}"#;

#[tokio::test]
async fn extractions_build_then_devolve() {
    let doc: ExtractionsDoc = serde_json::from_str(EXTRACTIONS).unwrap();
    let will = build_will_model(&doc).unwrap();
    verify_checksum(&will, ChecksumPolicy::Enforce).unwrap();
    assert_eq!(
        will.directives[0].serialized_text,
        "Bequest asset/s 'my red car' to 'Tom Doe and Jack Doe'."
    );

    let store = sample_population();
    let report = devolve(
        &will,
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &DevolveOptions::default(),
    )
    .await
    .unwrap();

    let car = &report.assets["red car"];
    assert!((car.beneficiaries["Tom Doe"].share - 0.5).abs() < 1e-9);
    assert!((car.beneficiaries["Ann Doe"].share - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn tampering_is_caught_under_enforce() {
    let mut will = sealed_will(vec![directive("e1", &["my red car"], &["Tom Doe"])]);
    will.text.push_str(" Also, everything to someone else.");

    let store = sample_population();
    let enforcing = DevolveOptions {
        checksum_policy: ChecksumPolicy::Enforce,
        ..DevolveOptions::default()
    };
    let err = devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &enforcing)
        .await
        .unwrap_err();
    assert!(matches!(err, DevolveError::Checksum(_)));

    // The default policy logs and executes anyway.
    let report = devolve(
        &will,
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &DevolveOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.executed_count(), 1);
}

#[tokio::test]
async fn living_testator_blocks_when_checked() {
    let mut john = person(1, "John Doe", true, 79, &[]);
    john.assets = vec![Asset::named("red car")];
    let store = PopulationStore::from_people(vec![john, person(2, "Tom Doe", true, 44, &[])]);
    let will = sealed_will(vec![directive("e1", &["my red car"], &["Tom Doe"])]);

    let checking = DevolveOptions {
        testator_alive_check: true,
        ..DevolveOptions::default()
    };
    let err = devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &checking)
        .await
        .unwrap_err();
    assert!(matches!(err, DevolveError::TestatorAlive { name } if name == "John Doe"));

    // Without the check the will executes as written.
    let report = devolve(
        &will,
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &DevolveOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report.executed_count(), 1);
}

#[tokio::test]
async fn missing_testator_is_fatal() {
    let store = sample_population();
    let mut will = sealed_will(vec![directive("e1", &["my red car"], &["Tom Doe"])]);
    will.testator.name = "Stranger Person".to_owned();

    let err = devolve(
        &will,
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &DevolveOptions::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DevolveError::TestatorNotFound { name } if name == "Stranger Person"));
}

#[tokio::test]
async fn population_database_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people_db.json");
    std::fs::write(
        &path,
        r#"{"people": [
            {"id": 1, "full_name": "John Doe", "alive": "false", "age": 79,
             "children_ids": [2], "assets": [{"name": "red car"}]},
            {"id": 2, "full_name": "Tom Doe", "alive": "true", "age": 44}
        ]}"#,
    )
    .unwrap();

    let store = PopulationStore::load(&path).unwrap();
    let will = sealed_will(vec![directive("e1", &["my red car"], &["Tom Doe"])]);
    let report = devolve(
        &will,
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &DevolveOptions::default(),
    )
    .await
    .unwrap();
    assert!((report.assets["red car"].beneficiaries["Tom Doe"].share - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn http_oracle_drives_a_full_devolution() {
    let server = start_oracle_mock().await;
    // Judge prompts: asset matching says yes, residue detection says no.
    mount_chat_reply(&server, "matches with the following asset", "yes").await;
    mount_chat_reply(&server, "means ALL the rest", "no").await;
    // Every classification vote agrees on an equal division.
    mount_chat_reply(&server, "rule classifier", "{\"rule_ids\": [1]}").await;

    let oracle: Arc<dyn Oracle> = Arc::new(HttpOracle::new(
        format!("{}/v1/chat/completions", server.uri()),
        "chatgpt-4o-latest",
        "test-key",
    ));
    let classifier = RuleClassifier::new(oracle.clone()).with_quorum(3);
    let judge = SimilarityJudge::new(oracle);

    let store = sample_population();
    let will = sealed_will(vec![directive("e1", &["my red car"], &["Tom Doe", "Jack Doe"])]);

    let report = devolve(&will, &store, &classifier, &judge, &DevolveOptions::default())
        .await
        .unwrap();

    let car = &report.assets["red car"];
    assert!((car.beneficiaries["Tom Doe"].share - 0.5).abs() < 1e-9);
    assert!((car.beneficiaries["Ann Doe"].share - 0.5).abs() < 1e-9);
    assert_eq!(car.beneficiaries["Tom Doe"].rule_id, 1);
}
