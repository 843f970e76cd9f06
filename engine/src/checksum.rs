//! Integrity sealing for will models.
//!
//! A model's checksum is the SHA-256 of its canonical JSON serialization
//! with the `checksum` field unset. Builders stamp it once the model is
//! complete; the devolution entry point verifies it under a configurable
//! policy before executing anything.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use probate_types::WillModel;

/// What to do when a will model fails (or lacks) checksum verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumPolicy {
    /// Log and continue. Edited models are common during drafting.
    #[default]
    Warn,
    /// Refuse to execute a model that does not verify.
    Enforce,
}

#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("will model checksum mismatch: stored {stored}, computed {computed}")]
    Mismatch { stored: String, computed: String },

    #[error("will model carries no checksum")]
    Missing,

    #[error("will model could not be canonicalized: {0}")]
    Canonicalize(#[from] serde_json::Error),
}

/// Computes the checksum a sealed copy of `model` would carry.
pub fn compute_checksum(model: &WillModel) -> Result<String, serde_json::Error> {
    let mut unsealed = model.clone();
    unsealed.checksum = None;
    let bytes = serde_json::to_vec(&unsealed)?;
    let digest = Sha256::digest(&bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

/// Seals `model` by stamping its checksum.
pub fn stamp_checksum(model: &mut WillModel) -> Result<(), serde_json::Error> {
    model.checksum = Some(compute_checksum(model)?);
    Ok(())
}

/// Verifies the stored checksum under `policy`.
pub fn verify_checksum(model: &WillModel, policy: ChecksumPolicy) -> Result<(), ChecksumError> {
    let Some(stored) = model.checksum.as_deref() else {
        match policy {
            ChecksumPolicy::Warn => {
                tracing::warn!("Will model carries no checksum; executing it anyway");
                return Ok(());
            }
            ChecksumPolicy::Enforce => return Err(ChecksumError::Missing),
        }
    };

    let computed = compute_checksum(model)?;
    if stored == computed {
        tracing::debug!(checksum = %computed, "Will model checksum verified");
        return Ok(());
    }

    match policy {
        ChecksumPolicy::Warn => {
            tracing::warn!(
                stored,
                computed,
                "Will model checksum mismatch; the model was modified after sealing"
            );
            Ok(())
        }
        ChecksumPolicy::Enforce => Err(ChecksumError::Mismatch {
            stored: stored.to_owned(),
            computed,
        }),
    }
}
