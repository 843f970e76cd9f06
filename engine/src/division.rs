//! Share computation for one classified directive.
//!
//! Given the resolved parties and a [`RuleClassification`], this module
//! produces a [`Division`]: the proposed fraction of each asset going to each
//! recipient. Divisions are proposals only; the allocation ledger decides
//! whether they commit. Deceased recipients never hold shares here, their
//! portion redirects through per-stirpes descent before the division is
//! returned.

use std::collections::{BTreeMap, BTreeSet};

use probate_types::{
    AgeRequirement, Person, RuleClassification, RuleEval, RuleKind, ShareTriple, SkipReason,
    SubDivision, same_person,
};

use crate::population::PopulationStore;
use crate::resolve::{ResolvedAsset, ResolvedDirective};
use crate::stirpes::divide_by_stirpes;

/// Label suffix applied to recipients below the age of majority.
pub const CUSTODIAN_SUFFIX: &str = " (through custodian)";

fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// The fraction each of `count` beneficiaries receives under an equal split.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn equal_share(count: usize) -> f64 {
    round5(1.0 / count as f64)
}

/// Proposed transfers for one directive: asset name to recipient to fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Division {
    pub rule: RuleKind,
    shares: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Division {
    #[must_use]
    pub fn new(rule: RuleKind) -> Self {
        Self {
            rule,
            shares: BTreeMap::new(),
        }
    }

    /// Accumulates into a recipient's share. A person can take through more
    /// than one route (named twice, or as heir to several branches); their
    /// slices add up.
    pub(crate) fn add(&mut self, asset: &str, person: &str, share: f64) {
        *self
            .shares
            .entry(asset.to_owned())
            .or_default()
            .entry(person.to_owned())
            .or_insert(0.0) += share;
    }

    #[must_use]
    pub fn shares(&self) -> &BTreeMap<String, BTreeMap<String, f64>> {
        &self.shares
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shares.values().all(BTreeMap::is_empty)
    }
}

/// Computes divisions against one population database.
pub struct DivisionEngine<'a> {
    store: &'a PopulationStore,
}

impl<'a> DivisionEngine<'a> {
    pub fn new(store: &'a PopulationStore) -> Self {
        Self { store }
    }

    /// Applies the classified rule to the resolved directive.
    pub fn divide(
        &self,
        resolved: &ResolvedDirective,
        classification: &RuleClassification,
    ) -> Result<Division, SkipReason> {
        let kind = classification.kind;
        let mut division = match (kind, &classification.eval) {
            (RuleKind::PerStirpes | RuleKind::Equal, _) => {
                self.divide_equally(&resolved.assets, &resolved.beneficiaries, kind)?
            }
            (RuleKind::Proportional | RuleKind::DefaultLaw, RuleEval::Proportions(triples)) => {
                self.divide_proportionally(resolved, triples, kind)?
            }
            (
                RuleKind::Contingent,
                RuleEval::Contingency {
                    unalive_people,
                    sub,
                },
            ) => {
                self.check_contingency(unalive_people)?;
                self.divide_sub(resolved, sub, unalive_people, kind)?
            }
            (
                RuleKind::AgeGated,
                RuleEval::AgeRequirements { requirements, sub },
            ) => {
                self.check_ages(requirements)?;
                self.divide_sub(resolved, sub, &[], kind)?
            }
            (kind, _) => {
                return Err(SkipReason::ClassificationFailed {
                    detail: format!("rule {} arrived without its required payload", kind.id()),
                });
            }
        };
        self.relabel_minors(&mut division);
        Ok(division)
    }

    // ===== EQUAL AND PER-STIRPES SPLITS =====

    fn divide_equally(
        &self,
        assets: &[ResolvedAsset],
        participants: &[Person],
        kind: RuleKind,
    ) -> Result<Division, SkipReason> {
        if participants.is_empty() {
            return Err(SkipReason::MissingParties {
                what: "eligible beneficiaries".to_owned(),
            });
        }
        let share = equal_share(participants.len());
        let mut division = Division::new(kind);
        for asset in assets {
            for person in participants {
                self.place_share(&mut division, &asset.name, person, share)?;
            }
        }
        Ok(division)
    }

    // ===== PROPORTIONAL SPLITS =====

    fn divide_proportionally(
        &self,
        resolved: &ResolvedDirective,
        triples: &[ShareTriple],
        kind: RuleKind,
    ) -> Result<Division, SkipReason> {
        let people: BTreeSet<&str> = resolved
            .beneficiaries
            .iter()
            .map(|p| p.full_name.as_str())
            .collect();
        let assets: BTreeSet<&str> = resolved.assets.iter().map(|a| a.name.as_str()).collect();

        // Validate the whole payload before distributing anything.
        for triple in triples {
            if !people.contains(triple.person.as_str()) || !assets.contains(triple.asset.as_str()) {
                tracing::warn!(
                    person = %triple.person,
                    asset = %triple.asset,
                    "Proportion row names a party outside the directive"
                );
                return Err(SkipReason::ProportionsMismatch);
            }
        }

        let mut division = Division::new(kind);
        for triple in triples {
            if let Some(person) = resolved
                .beneficiaries
                .iter()
                .find(|p| p.full_name == triple.person)
            {
                self.place_share(&mut division, &triple.asset, person, triple.fraction())?;
            }
        }
        Ok(division)
    }

    // ===== GATED RULES =====

    /// Every listed person must be dead (or absent from the database, in
    /// which case the will's claim stands unrebutted).
    fn check_contingency(&self, unalive_people: &[String]) -> Result<(), SkipReason> {
        for name in unalive_people {
            if let Some(person) = self.store.find_by_name(name) {
                if person.alive {
                    return Err(SkipReason::ContingencyUnmet {
                        person: person.full_name.clone(),
                    });
                }
            } else {
                tracing::debug!(
                    person = %name,
                    "Contingency person not in the database; treating as deceased"
                );
            }
        }
        Ok(())
    }

    fn check_ages(&self, requirements: &[AgeRequirement]) -> Result<(), SkipReason> {
        for req in requirements {
            if let Some(person) = self.store.find_by_name(&req.person) {
                if person.age < req.minimum_age {
                    return Err(SkipReason::AgeRequirementUnmet {
                        person: person.full_name.clone(),
                        minimum_age: req.minimum_age,
                    });
                }
            } else {
                tracing::debug!(
                    person = %req.person,
                    "Age-gated person not in the database; treating the gate as open"
                );
            }
        }
        Ok(())
    }

    /// Division for a gated rule once its gate holds. `excluded` people (the
    /// ones a contingency named) do not take part in an equal split.
    fn divide_sub(
        &self,
        resolved: &ResolvedDirective,
        sub: &SubDivision,
        excluded: &[String],
        kind: RuleKind,
    ) -> Result<Division, SkipReason> {
        match sub {
            SubDivision::Equal => {
                let eligible: Vec<Person> = resolved
                    .beneficiaries
                    .iter()
                    .filter(|p| !excluded.iter().any(|x| same_person(x, &p.full_name)))
                    .cloned()
                    .collect();
                self.divide_equally(&resolved.assets, &eligible, kind)
            }
            SubDivision::Proportional(triples) => {
                self.divide_proportionally(resolved, triples, kind)
            }
        }
    }

    // ===== SHARE PLACEMENT =====

    /// Places one share, redirecting through stirpes if the recipient is
    /// deceased.
    fn place_share(
        &self,
        division: &mut Division,
        asset: &str,
        person: &Person,
        share: f64,
    ) -> Result<(), SkipReason> {
        if person.alive {
            division.add(asset, &person.full_name, share);
            return Ok(());
        }
        tracing::info!(
            person = %person.full_name,
            asset,
            "Beneficiary predeceased the testator; dividing their share per stirpes"
        );
        let heirs = divide_by_stirpes(person, self.store, asset, share)
            .map_err(|e| SkipReason::LineageError {
                detail: e.to_string(),
            })?;
        for heir in heirs {
            division.add(&heir.asset, &heir.heir, heir.share);
        }
        Ok(())
    }

    /// Rewrites shares held by minors to flow through a custodian.
    fn relabel_minors(&self, division: &mut Division) {
        for people in division.shares.values_mut() {
            let minors: Vec<String> = people
                .keys()
                .filter(|name| {
                    self.store
                        .find_by_name(name)
                        .is_some_and(Person::is_minor)
                })
                .cloned()
                .collect();
            for name in minors {
                if let Some(share) = people.remove(&name) {
                    tracing::info!(
                        person = %name,
                        "Recipient is a minor; share held through a custodian"
                    );
                    people.insert(format!("{name}{CUSTODIAN_SUFFIX}"), share);
                }
            }
        }
    }
}
