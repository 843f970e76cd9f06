//! Resolution of a directive's parties and assets against live data.
//!
//! Beneficiaries must resolve exactly: a will that names someone outside the
//! population database is a drafting error and the directive is skipped.
//! Assets resolve fuzzily through a [`MatchJudge`], with two escape hatches:
//! a lone residuary phrase expands to every not-yet-exhausted estate asset,
//! and wording that matches nothing yields a synthetic placeholder so the
//! division is still recorded against something.

use probate_oracle::MatchJudge;
use probate_types::{Directive, Person, SkipReason, clean_name};

use crate::ledger::AllocationLedger;
use crate::population::PopulationStore;

/// How a resolved asset came to be in the directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetProvenance {
    /// The judge matched the will's wording to an estate asset.
    Matched,
    /// A residuary phrase expanded to this not-fully-allocated asset.
    Expanded,
    /// Nothing matched; this is a synthetic stand-in for the wording.
    Guessed,
}

/// An asset a directive will divide, keyed the way the ledger knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAsset {
    /// Ledger key: the estate asset's name, or the placeholder text.
    pub name: String,
    /// The will-side wording that produced this asset.
    pub requested_text: String,
    pub provenance: AssetProvenance,
}

/// A directive with every party and asset resolved and ready to divide.
#[derive(Debug, Clone)]
pub struct ResolvedDirective {
    pub beneficiaries: Vec<Person>,
    pub assets: Vec<ResolvedAsset>,
}

/// Resolves directive parties and assets for one devolution run.
pub struct Resolver<'a> {
    store: &'a PopulationStore,
    judge: &'a dyn MatchJudge,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a PopulationStore, judge: &'a dyn MatchJudge) -> Self {
        Self { store, judge }
    }

    /// Resolves every named beneficiary to a population record.
    ///
    /// Any name with no record fails the whole directive; a partial
    /// beneficiary list would silently redistribute the estate.
    pub fn resolve_beneficiaries(&self, directive: &Directive) -> Result<Vec<Person>, SkipReason> {
        if directive.beneficiaries.is_empty() {
            return Err(SkipReason::MissingParties {
                what: "beneficiaries".to_owned(),
            });
        }
        let mut people = Vec::with_capacity(directive.beneficiaries.len());
        for named in &directive.beneficiaries {
            match self.store.find_by_name(&named.name) {
                Some(person) => people.push(person.clone()),
                None => {
                    return Err(SkipReason::UnknownBeneficiary {
                        name: clean_name(&named.name),
                    });
                }
            }
        }
        Ok(people)
    }

    /// Resolves the directive's asset wording against the testator's estate.
    pub async fn resolve_assets(
        &self,
        directive: &Directive,
        testator: &Person,
        ledger: &AllocationLedger,
    ) -> Result<Vec<ResolvedAsset>, SkipReason> {
        if directive.assets.is_empty() {
            return Err(SkipReason::MissingParties {
                what: "assets".to_owned(),
            });
        }

        // A residuary clause stands alone; "my car and the rest" is not one.
        if let [only] = directive.assets.as_slice() {
            let residue = self
                .judge
                .is_residue(&only.name)
                .await
                .map_err(|e| SkipReason::ClassificationFailed { detail: e.to_string() })?;
            if residue {
                return Ok(self.expand_residue(&only.name, testator, ledger));
            }
        }

        let mut resolved: Vec<ResolvedAsset> = Vec::with_capacity(directive.assets.len());
        let mut unmatched = 0usize;
        for requested in &directive.assets {
            let mut matched = false;
            for candidate in &testator.assets {
                let hit = self
                    .judge
                    .is_match(&requested.name, &candidate.name)
                    .await
                    .map_err(|e| SkipReason::ClassificationFailed { detail: e.to_string() })?;
                if hit {
                    resolved.push(ResolvedAsset {
                        name: candidate.name.clone(),
                        requested_text: requested.name.clone(),
                        provenance: AssetProvenance::Matched,
                    });
                    matched = true;
                    break;
                }
            }
            if !matched {
                unmatched += 1;
                tracing::error!(
                    requested = %requested.name,
                    testator = %testator.full_name,
                    "Asset in will has no match in the estate (recoverable)"
                );
            }
        }

        if unmatched > 0 {
            let placeholder = directive
                .assets
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                placeholder = %placeholder,
                "Substituting a placeholder asset for unmatched will wording"
            );
            resolved.push(ResolvedAsset {
                name: placeholder.clone(),
                requested_text: placeholder,
                provenance: AssetProvenance::Guessed,
            });
        }

        Ok(resolved)
    }

    fn expand_residue(
        &self,
        wording: &str,
        testator: &Person,
        ledger: &AllocationLedger,
    ) -> Vec<ResolvedAsset> {
        let expanded: Vec<ResolvedAsset> = testator
            .assets
            .iter()
            .filter(|asset| ledger.allocation_of(&asset.name) < 1.0)
            .map(|asset| ResolvedAsset {
                name: asset.name.clone(),
                requested_text: wording.to_owned(),
                provenance: AssetProvenance::Expanded,
            })
            .collect();
        tracing::info!(
            wording,
            count = expanded.len(),
            "Residuary clause expanded to remaining estate assets"
        );
        expanded
    }
}
