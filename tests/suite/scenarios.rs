//! Devolution scenarios over the sample family.
//!
//! These run the full `devolve` entry point with stub oracles, checking
//! divisions, ledger accounting, and the per-directive audit trail.

use crate::common::{ContainsJudge, StubClassifier, directive, sample_population, sealed_will};

use probate_engine::{DevolveOptions, devolve};
use probate_types::{
    DirectiveStatus, RuleClassification, RuleEval, RuleKind, ShareTriple, SkipReason, SubDivision,
};

fn options() -> DevolveOptions {
    DevolveOptions::default()
}

#[tokio::test]
async fn red_car_divides_between_son_and_granddaughter() {
    let store = sample_population();
    let will = sealed_will(vec![directive("e1", &["my red car"], &["Tom Doe", "Jack Doe"])]);
    let classifier = StubClassifier::equal();

    let report = devolve(&will, &store, &classifier, &ContainsJudge, &options())
        .await
        .unwrap();

    // Jack predeceased John; his half passes to Ann per stirpes.
    let car = &report.assets["red car"];
    assert!((car.beneficiaries["Tom Doe"].share - 0.5).abs() < 1e-9);
    assert!((car.beneficiaries["Ann Doe"].share - 0.5).abs() < 1e-9);
    assert!(!car.beneficiaries.contains_key("Jack Doe"));
    assert!((car.allocation - 1.0).abs() < 1e-9);
    assert_eq!(car.source_text.as_deref(), Some("my red car"));
    assert_eq!(report.executed_count(), 1);
}

#[tokio::test]
async fn over_allocated_directive_is_rejected_whole() {
    let store = sample_population();
    let will = sealed_will(vec![
        directive("e1", &["my red car"], &["Tom Doe"]),
        directive("e2", &["my red car"], &["Ann Doe"]),
    ]);
    // 70% to Tom, then an attempted 40% to Ann.
    let classifier = StubClassifier::equal()
        .then(RuleClassification {
            kind: RuleKind::Proportional,
            eval: RuleEval::Proportions(vec![ShareTriple {
                person: "Tom Doe".to_owned(),
                asset: "red car".to_owned(),
                share: 0.7,
            }]),
        })
        .then(RuleClassification {
            kind: RuleKind::Proportional,
            eval: RuleEval::Proportions(vec![ShareTriple {
                person: "Ann Doe".to_owned(),
                asset: "red car".to_owned(),
                share: 0.4,
            }]),
        });

    let report = devolve(&will, &store, &classifier, &ContainsJudge, &options())
        .await
        .unwrap();

    let car = &report.assets["red car"];
    assert!((car.allocation - 0.7).abs() < 1e-9);
    assert!((car.beneficiaries["Tom Doe"].share - 0.7).abs() < 1e-9);
    assert!(!car.beneficiaries.contains_key("Ann Doe"));

    assert_eq!(report.executed_count(), 1);
    match &report.directives[1].status {
        DirectiveStatus::Skipped {
            reason: SkipReason::OverAllocation { asset, attempted },
        } => {
            assert_eq!(asset, "red car");
            assert!((attempted - 1.1).abs() < 1e-9);
        }
        other => panic!("expected an over-allocation skip, got {other:?}"),
    }
}

#[tokio::test]
async fn directive_order_is_first_come_first_served() {
    let store = sample_population();
    let to_tom = directive("e1", &["my red car"], &["Tom Doe"]);
    let to_ann = directive("e2", &["my red car"], &["Ann Doe"]);

    let report = devolve(
        &sealed_will(vec![to_tom.clone(), to_ann.clone()]),
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &options(),
    )
    .await
    .unwrap();
    assert!(report.assets["red car"].beneficiaries.contains_key("Tom Doe"));
    assert!(!report.assets["red car"].beneficiaries.contains_key("Ann Doe"));

    // Reversed, the car goes to Ann instead.
    let report = devolve(
        &sealed_will(vec![to_ann, to_tom]),
        &store,
        &StubClassifier::equal(),
        &ContainsJudge,
        &options(),
    )
    .await
    .unwrap();
    assert!(report.assets["red car"].beneficiaries.contains_key("Ann Doe"));
    assert!(!report.assets["red car"].beneficiaries.contains_key("Tom Doe"));
}

#[tokio::test]
async fn unmet_age_gate_skips_with_a_reason() {
    let store = sample_population();
    let will = sealed_will(vec![directive("e1", &["my red car"], &["Jane Doe"])]);
    let classifier = StubClassifier::always(RuleClassification {
        kind: RuleKind::AgeGated,
        eval: RuleEval::AgeRequirements {
            requirements: vec![probate_types::AgeRequirement {
                person: "Jane Doe".to_owned(),
                minimum_age: 21,
            }],
            sub: SubDivision::Equal,
        },
    });

    let report = devolve(&will, &store, &classifier, &ContainsJudge, &options())
        .await
        .unwrap();

    assert_eq!(report.executed_count(), 0);
    assert!(report.assets.is_empty());
    match &report.directives[0].status {
        DirectiveStatus::Skipped {
            reason: SkipReason::AgeRequirementUnmet { person, minimum_age },
        } => {
            assert_eq!(person, "Jane Doe");
            assert_eq!(*minimum_age, 21);
        }
        other => panic!("expected an age-gate skip, got {other:?}"),
    }
}

#[tokio::test]
async fn met_contingency_excludes_the_named_person() {
    let store = sample_population();
    let will = sealed_will(vec![directive(
        "e1",
        &["my red car"],
        &["Tom Doe", "Ann Doe", "Jack Doe"],
    )]);
    // "If Jack does not survive me, divide among the others."
    let classifier = StubClassifier::always(RuleClassification {
        kind: RuleKind::Contingent,
        eval: RuleEval::Contingency {
            unalive_people: vec!["Jack Doe".to_owned()],
            sub: SubDivision::Equal,
        },
    });

    let report = devolve(&will, &store, &classifier, &ContainsJudge, &options())
        .await
        .unwrap();

    let car = &report.assets["red car"];
    assert!((car.beneficiaries["Tom Doe"].share - 0.5).abs() < 1e-9);
    assert!((car.beneficiaries["Ann Doe"].share - 0.5).abs() < 1e-9);
    assert_eq!(car.beneficiaries.len(), 2);
}

#[tokio::test]
async fn minor_recipient_takes_through_a_custodian() {
    let store = sample_population();
    let will = sealed_will(vec![directive(
        "e1",
        &["my vacuum cleaner"],
        &["Ben Doe", "Tom Doe"],
    )]);

    let report = devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &options())
        .await
        .unwrap();

    let vacuum = &report.assets["vacuum cleaner"];
    assert!(vacuum.beneficiaries.contains_key("Ben Doe (through custodian)"));
    assert!(!vacuum.beneficiaries.contains_key("Ben Doe"));
    assert!((vacuum.beneficiaries["Tom Doe"].share - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn residue_expands_to_whatever_is_left() {
    let store = sample_population();
    let will = sealed_will(vec![
        directive("e1", &["my red car"], &["Tom Doe"]),
        directive("e2", &["all the rest of my property"], &["Ann Doe"]),
    ]);

    let report = devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &options())
        .await
        .unwrap();

    // The car is exhausted by e1, so the residue is just the vacuum.
    assert!((report.assets["red car"].beneficiaries["Tom Doe"].share - 1.0).abs() < 1e-9);
    let vacuum = &report.assets["vacuum cleaner"];
    assert!((vacuum.beneficiaries["Ann Doe"].share - 1.0).abs() < 1e-9);
    assert_eq!(vacuum.source_text.as_deref(), Some("all the rest of my property"));
    assert_eq!(report.executed_count(), 2);
}

#[tokio::test]
async fn unknown_beneficiary_skips_the_directive() {
    let store = sample_population();
    let will = sealed_will(vec![directive(
        "e1",
        &["my red car"],
        &["Nobody Known", "Tom Doe"],
    )]);

    let report = devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &options())
        .await
        .unwrap();

    // No partial execution: Tom gets nothing either.
    assert!(report.assets.is_empty());
    match &report.directives[0].status {
        DirectiveStatus::Skipped {
            reason: SkipReason::UnknownBeneficiary { name },
        } => assert_eq!(name, "Nobody Known"),
        other => panic!("expected an unknown-beneficiary skip, got {other:?}"),
    }
}

#[tokio::test]
async fn unmatched_assets_fall_back_to_a_placeholder() {
    let store = sample_population();
    let will = sealed_will(vec![directive("e1", &["the summer cottage"], &["Tom Doe"])]);

    let report = devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &options())
        .await
        .unwrap();

    // Nothing in the estate matches, so the award lands on a synthetic
    // asset named after the will's wording.
    let cottage = &report.assets["the summer cottage"];
    assert!((cottage.beneficiaries["Tom Doe"].share - 1.0).abs() < 1e-9);
    assert!((cottage.allocation - 1.0).abs() < 1e-9);
    assert_eq!(report.executed_count(), 1);
}

#[tokio::test]
async fn reports_are_byte_identical_across_runs() {
    let run = || async {
        let store = sample_population();
        let will = sealed_will(vec![
            directive("e1", &["my red car"], &["Tom Doe", "Jack Doe"]),
            directive("e2", &["all the rest of my property"], &["Ann Doe"]),
        ]);
        devolve(&will, &store, &StubClassifier::equal(), &ContainsJudge, &options())
            .await
            .unwrap()
            .to_json_pretty()
            .unwrap()
    };
    assert_eq!(run().await, run().await);
}

#[tokio::test]
async fn classifier_outage_skips_rather_than_aborts() {
    struct FailingClassifier;
    impl probate_oracle::DirectiveClassifier for FailingClassifier {
        fn classify<'a>(
            &'a self,
            _request: &'a probate_types::ClassifyRequest,
        ) -> probate_oracle::OracleFut<'a, RuleClassification> {
            Box::pin(async {
                Err(probate_oracle::OracleError::RetriesExhausted {
                    attempts: 3,
                    detail: "no parseable classification votes".to_owned(),
                })
            })
        }
    }

    let store = sample_population();
    let will = sealed_will(vec![
        directive("e1", &["my red car"], &["Tom Doe"]),
    ]);

    let report = devolve(&will, &store, &FailingClassifier, &ContainsJudge, &options())
        .await
        .unwrap();
    assert_eq!(report.executed_count(), 0);
    assert!(matches!(
        report.directives[0].status,
        DirectiveStatus::Skipped {
            reason: SkipReason::ClassificationFailed { .. }
        }
    ));
}
