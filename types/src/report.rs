//! The devolution report: the durable output of a will execution.
//!
//! Reports use `BTreeMap` throughout so that serialization is
//! deterministic; executing the same will against the same population
//! twice produces byte-identical output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rule::RuleKind;

/// Complete outcome of executing one will.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevolutionReport {
    /// Testator full name as resolved from the population database.
    pub testator: String,
    /// Final per-asset division, keyed by asset name.
    pub assets: BTreeMap<String, AssetReport>,
    /// Per-directive audit trail, in will order.
    pub directives: Vec<DirectiveOutcome>,
}

impl DevolutionReport {
    #[must_use]
    pub fn new(testator: impl Into<String>) -> Self {
        Self {
            testator: testator.into(),
            assets: BTreeMap::new(),
            directives: Vec::new(),
        }
    }

    /// Records one award. Repeated awards to the same person for the
    /// same asset accumulate; the rule fields reflect the most recent
    /// directive that touched the entry.
    pub fn record_award(
        &mut self,
        asset: &str,
        source_text: Option<&str>,
        person: &str,
        share: f64,
        rule: RuleKind,
        conditions: &[String],
    ) {
        let asset_report = self.assets.entry(asset.to_owned()).or_default();
        if let Some(text) = source_text {
            asset_report.source_text = Some(text.to_owned());
        }
        let award = asset_report
            .beneficiaries
            .entry(person.to_owned())
            .or_default();
        award.share += share;
        award.rule_id = rule.id();
        award.rule_applied_text = rule.description().to_owned();
        for condition in conditions {
            if !award.conditions.contains(condition) {
                award.conditions.push(condition.clone());
            }
        }
    }

    /// Syncs an asset's cumulative allocation from the ledger.
    pub fn set_allocation(&mut self, asset: &str, allocation: f64) {
        self.assets.entry(asset.to_owned()).or_default().allocation = allocation;
    }

    pub fn push_outcome(&mut self, outcome: DirectiveOutcome) {
        self.directives.push(outcome);
    }

    /// Count of directives that executed (possibly with an empty
    /// division) rather than being skipped.
    #[must_use]
    pub fn executed_count(&self) -> usize {
        self.directives
            .iter()
            .filter(|outcome| matches!(outcome.status, DirectiveStatus::Executed { .. }))
            .count()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Division state of a single asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetReport {
    /// The will's wording that reached this asset, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    /// Cumulative allocated fraction after all directives.
    pub allocation: f64,
    /// Awards keyed by recipient display name. Minors appear as
    /// "{name} (through custodian)".
    pub beneficiaries: BTreeMap<String, BeneficiaryAward>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryAward {
    pub share: f64,
    pub rule_id: u8,
    pub rule_applied_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

/// Audit record for one directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveOutcome {
    pub directive_id: String,
    pub serialized_text: String,
    #[serde(flatten)]
    pub status: DirectiveStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DirectiveStatus {
    /// The directive ran; its division (possibly empty) was committed.
    Executed { rule_id: u8, rule_text: String },
    /// The directive was not executed.
    Skipped { reason: SkipReason },
}

/// Why a directive was skipped. Every variant is a defined outcome,
/// not a crash: the run continues with the next directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    #[error("beneficiary '{name}' not found in the population database")]
    UnknownBeneficiary { name: String },
    #[error("directive names no {what}")]
    MissingParties { what: String },
    #[error("rule classification failed: {detail}")]
    ClassificationFailed { detail: String },
    #[error("rule proportions name a person or asset outside the directive")]
    ProportionsMismatch,
    #[error("directive is contingent on the death of {person}, who is still alive")]
    ContingencyUnmet { person: String },
    #[error("{person} has not reached the required age of {minimum_age}")]
    AgeRequirementUnmet { person: String, minimum_age: u32 },
    #[error("asset '{asset}' would be over-allocated at {attempted:.4}")]
    OverAllocation { asset: String, attempted: f64 },
    #[error("family tree problem: {detail}")]
    LineageError { detail: String },
}
