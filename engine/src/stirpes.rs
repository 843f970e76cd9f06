//! Per-stirpes redistribution of a deceased beneficiary's share.
//!
//! A share destined for someone who predeceased the testator splits evenly
//! across their children; a deceased child's slice recurses into that child's
//! own children. Living heirs terminate their branch, a childless deceased
//! branch forfeits its slice, and descent deeper than [`MAX_DEPTH`]
//! generations is treated as a cycle in the family data.

use probate_types::{Person, PersonId};

use crate::population::PopulationStore;

/// Generation limit before descent is declared cyclic.
pub const MAX_DEPTH: usize = 64;

/// One heir's slice of a redistributed share.
#[derive(Debug, Clone, PartialEq)]
pub struct StirpesShare {
    pub heir: String,
    pub share: f64,
    pub asset: String,
}

/// Data-integrity failure while walking the family tree.
#[derive(Debug, thiserror::Error)]
pub enum StirpesError {
    #[error("person id {id} is listed as a child but is not in the population database")]
    MissingPerson { id: PersonId },

    #[error("family tree descends more than {MAX_DEPTH} generations; assuming a cycle")]
    DepthExceeded,
}

/// Splits `share` of `asset` among the living descendants of `deceased`.
///
/// The returned shares sum to `share` unless a branch dies out with no heirs,
/// in which case that branch's portion is forfeited. An empty result means no
/// living heir exists anywhere under `deceased`.
pub fn divide_by_stirpes(
    deceased: &Person,
    store: &PopulationStore,
    asset: &str,
    share: f64,
) -> Result<Vec<StirpesShare>, StirpesError> {
    let mut shares = Vec::new();
    descend(deceased, store, asset, share, 0, &mut shares)?;
    Ok(shares)
}

fn descend(
    person: &Person,
    store: &PopulationStore,
    asset: &str,
    share: f64,
    depth: usize,
    out: &mut Vec<StirpesShare>,
) -> Result<(), StirpesError> {
    if depth >= MAX_DEPTH {
        return Err(StirpesError::DepthExceeded);
    }
    if person.children_ids.is_empty() {
        tracing::debug!(
            person = %person.full_name,
            asset,
            "Deceased beneficiary has no heirs; their share is forfeited"
        );
        return Ok(());
    }

    #[allow(clippy::cast_precision_loss)]
    let slice = share / person.children_ids.len() as f64;
    for id in &person.children_ids {
        let child = store
            .find_by_id(*id)
            .ok_or(StirpesError::MissingPerson { id: *id })?;
        if child.alive {
            out.push(StirpesShare {
                heir: child.full_name.clone(),
                share: slice,
                asset: asset.to_owned(),
            });
        } else {
            descend(child, store, asset, slice, depth + 1, out)?;
        }
    }
    Ok(())
}
