//! Devolution: executing a will model against the population database.
//!
//! Directives run strictly in will order against a shared allocation ledger,
//! so an early bequest can exhaust an asset before a later one reaches it.
//! Every failure mode below the run level is a [`SkipReason`]: the directive
//! is recorded as skipped and the run continues. Only a missing (or, when
//! checked, still-living) testator and an enforced checksum failure abort
//! the run.

use probate_oracle::{DirectiveClassifier, MatchJudge};
use probate_types::{
    Asset, ClassifyRequest, DevolutionReport, Directive, DirectiveOutcome, DirectiveStatus,
    Person, SkipReason, WillModel, clean_name,
};

use crate::checksum::{ChecksumError, ChecksumPolicy, verify_checksum};
use crate::division::{Division, DivisionEngine};
use crate::ledger::AllocationLedger;
use crate::population::PopulationStore;
use crate::resolve::{ResolvedDirective, Resolver};

/// Options for one devolution run.
#[derive(Debug, Clone, Default)]
pub struct DevolveOptions {
    pub checksum_policy: ChecksumPolicy,
    /// Refuse to run while the testator is recorded as alive.
    pub testator_alive_check: bool,
}

/// Run-level failure. Anything directive-scoped is a [`SkipReason`] instead.
#[derive(Debug, thiserror::Error)]
pub enum DevolveError {
    #[error("testator '{name}' not found in the population database")]
    TestatorNotFound { name: String },

    #[error("testator '{name}' is recorded as alive; there is nothing to devolve")]
    TestatorAlive { name: String },

    #[error(transparent)]
    Checksum(#[from] ChecksumError),
}

/// Executes `will` and returns the full report.
pub async fn devolve(
    will: &WillModel,
    store: &PopulationStore,
    classifier: &dyn DirectiveClassifier,
    judge: &dyn MatchJudge,
    options: &DevolveOptions,
) -> Result<DevolutionReport, DevolveError> {
    verify_checksum(will, options.checksum_policy)?;

    let testator =
        store
            .find_by_name(&will.testator.name)
            .ok_or_else(|| DevolveError::TestatorNotFound {
                name: clean_name(&will.testator.name),
            })?;
    if options.testator_alive_check && testator.alive {
        return Err(DevolveError::TestatorAlive {
            name: testator.full_name.clone(),
        });
    }

    let children: Vec<String> = store
        .children_of(testator)
        .into_iter()
        .map(|p| p.full_name.clone())
        .collect();

    let mut ledger = AllocationLedger::seed(testator);
    let mut report = DevolutionReport::new(&testator.full_name);
    let resolver = Resolver::new(store, judge);
    let engine = DivisionEngine::new(store);

    tracing::info!(
        testator = %testator.full_name,
        directives = will.directives.len(),
        "Devolving will"
    );

    for directive in &will.directives {
        tracing::info!(
            directive = %directive.id,
            "Executing directive: {}",
            directive.serialized_text
        );
        let executed = execute_directive(
            directive,
            testator,
            &children,
            &resolver,
            &engine,
            classifier,
            &mut ledger,
        )
        .await;
        match executed {
            Ok(executed) => {
                record_execution(&mut report, directive, &executed);
            }
            Err(reason) => {
                tracing::warn!(directive = %directive.id, %reason, "Directive skipped");
                report.push_outcome(DirectiveOutcome {
                    directive_id: directive.id.to_string(),
                    serialized_text: directive.serialized_text.clone(),
                    status: DirectiveStatus::Skipped { reason },
                });
            }
        }
    }

    // Bring the per-asset totals in line with the ledger.
    let touched: Vec<String> = report.assets.keys().cloned().collect();
    for name in touched {
        report.set_allocation(&name, ledger.allocation_of(&name));
    }

    tracing::info!(
        executed = report.executed_count(),
        skipped = report.directives.len() - report.executed_count(),
        "Devolution finished"
    );
    Ok(report)
}

/// A directive that ran to completion.
struct ExecutedDirective {
    division: Division,
    /// Requested will wording per resolved asset name.
    sources: Vec<(String, String)>,
}

#[allow(clippy::too_many_arguments)]
async fn execute_directive(
    directive: &Directive,
    testator: &Person,
    children: &[String],
    resolver: &Resolver<'_>,
    engine: &DivisionEngine<'_>,
    classifier: &dyn DirectiveClassifier,
    ledger: &mut AllocationLedger,
) -> Result<ExecutedDirective, SkipReason> {
    let beneficiaries = resolver.resolve_beneficiaries(directive)?;
    let assets = resolver
        .resolve_assets(directive, testator, ledger)
        .await?;
    for asset in &assets {
        ledger.register(&Asset::named(&asset.name));
    }
    let sources: Vec<(String, String)> = assets
        .iter()
        .map(|a| (a.name.clone(), a.requested_text.clone()))
        .collect();

    let request = ClassifyRequest {
        directive_text: directive.serialized_text.clone(),
        testator: testator.full_name.clone(),
        assets: assets.iter().map(|a| a.name.clone()).collect(),
        beneficiaries: beneficiaries.iter().map(|p| p.full_name.clone()).collect(),
        children: children.to_vec(),
    };
    let classification = classifier
        .classify(&request)
        .await
        .map_err(|e| SkipReason::ClassificationFailed {
            detail: e.to_string(),
        })?;
    tracing::info!(
        directive = %directive.id,
        rule = classification.kind.id(),
        "Classified under rule: {}",
        classification.kind.description()
    );

    let resolved = ResolvedDirective {
        beneficiaries,
        assets,
    };
    let division = engine.divide(&resolved, &classification)?;
    ledger.commit(&division)?;

    for (asset, people) in division.shares() {
        for (person, share) in people {
            tracing::info!(
                directive = %directive.id,
                asset = %asset,
                person = %person,
                "Transferring {:.2}% of the asset",
                share * 100.0
            );
        }
    }

    Ok(ExecutedDirective { division, sources })
}

fn record_execution(
    report: &mut DevolutionReport,
    directive: &Directive,
    executed: &ExecutedDirective,
) {
    let conditions = directive.condition_texts();
    let rule = executed.division.rule;
    for (asset, people) in executed.division.shares() {
        let source = executed
            .sources
            .iter()
            .find(|(name, _)| name == asset)
            .map(|(_, requested)| requested.as_str());
        for (person, share) in people {
            report.record_award(asset, source, person, *share, rule, &conditions);
        }
    }
    report.push_outcome(DirectiveOutcome {
        directive_id: directive.id.to_string(),
        serialized_text: directive.serialized_text.clone(),
        status: DirectiveStatus::Executed {
            rule_id: rule.id(),
            rule_text: rule.description().to_owned(),
        },
    });
}
