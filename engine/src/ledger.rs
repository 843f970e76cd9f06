//! Run-scoped allocation accounting.
//!
//! The ledger tracks, per asset, how much of it earlier directives have
//! already given away. A division commits atomically: every affected asset is
//! staged and checked against [`OVER_ALLOCATION_TOLERANCE`] first, and a
//! single conflict rejects the whole division with the ledger untouched.

use std::collections::BTreeMap;

use probate_types::{Asset, Person, SkipReason};

use crate::division::Division;

/// Slack above a full allocation before a division is rejected. Wills
/// routinely hand out "half" three times with rounding in between; a couple
/// of percent of drift is tolerated, real double-gifting is not.
pub const OVER_ALLOCATION_TOLERANCE: f64 = 1.02;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Cumulative allocations for every asset touched during a devolution run.
#[derive(Debug, Clone, Default)]
pub struct AllocationLedger {
    accounts: BTreeMap<String, Asset>,
}

impl AllocationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an account for every asset on the testator's record, keeping
    /// any allocation already present in the database.
    #[must_use]
    pub fn seed(testator: &Person) -> Self {
        let mut ledger = Self::new();
        for asset in &testator.assets {
            ledger.register(asset);
        }
        ledger
    }

    /// Opens an account for `asset` if none exists. An existing account
    /// keeps its current allocation.
    pub fn register(&mut self, asset: &Asset) {
        self.accounts
            .entry(asset.name.clone())
            .or_insert_with(|| asset.clone());
    }

    /// Fraction of `name` already given away. Unknown assets read as zero.
    #[must_use]
    pub fn allocation_of(&self, name: &str) -> f64 {
        self.accounts.get(name).map_or(0.0, |a| a.allocation)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.accounts.contains_key(name)
    }

    /// All accounts, in asset-name order.
    pub fn accounts(&self) -> impl Iterator<Item = &Asset> {
        self.accounts.values()
    }

    /// Applies a division to the ledger, or rejects it in full.
    pub fn commit(&mut self, division: &Division) -> Result<(), SkipReason> {
        let mut staged: Vec<(String, f64)> = Vec::with_capacity(division.shares().len());
        for (asset_name, people) in division.shares() {
            let mut total = self.allocation_of(asset_name);
            for share in people.values() {
                total = round4(total + share);
            }
            if total > OVER_ALLOCATION_TOLERANCE {
                return Err(SkipReason::OverAllocation {
                    asset: asset_name.clone(),
                    attempted: total,
                });
            }
            staged.push((asset_name.clone(), total));
        }
        for (name, allocation) in staged {
            let account = self
                .accounts
                .entry(name.clone())
                .or_insert_with(|| Asset::named(&name));
            account.allocation = allocation;
            tracing::debug!(asset = %name, allocation, "Ledger updated");
        }
        Ok(())
    }
}
