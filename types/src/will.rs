//! The will model: the executable representation of a will.
//!
//! A will model is produced by the extraction builder and consumed by
//! the devolution engine. It is a plain serde document so that models
//! can be inspected, archived, and replayed; the `checksum` field seals
//! the rest of the document (see the engine's checksum module).

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// A person as named in the will text, before database resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WillPerson {
    pub id: EntityId,
    pub name: String,
    pub role: PartyRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl WillPerson {
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, role: PartyRole) -> Self {
        let name = name.into();
        Self {
            id,
            source_text: Some(name.clone()),
            name,
            role,
        }
    }

    #[must_use]
    pub fn beneficiary(id: EntityId, name: impl Into<String>) -> Self {
        Self::new(id, name, PartyRole::Beneficiary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Testator,
    Beneficiary,
    Executor,
}

/// An asset as named in the will text, before database resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WillAsset {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl WillAsset {
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            source_text: Some(name.clone()),
            name,
        }
    }
}

/// A condition attached to a directive, kept as free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: EntityId,
    pub text: String,
}

/// One bequest: assets, recipients, and any attached conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub id: EntityId,
    /// Event type from the extraction pipeline ("Bequest", "BequestAsset").
    #[serde(default)]
    pub kind: String,
    pub beneficiaries: Vec<WillPerson>,
    pub assets: Vec<WillAsset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executors: Vec<WillPerson>,
    /// Natural-language rendering of the directive, fed to the
    /// classification oracle.
    pub serialized_text: String,
}

impl Directive {
    /// Names of all attached conditions, in will order.
    #[must_use]
    pub fn condition_texts(&self) -> Vec<String> {
        self.conditions.iter().map(|c| c.text.clone()).collect()
    }
}

/// The complete executable will.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WillModel {
    /// Full text of the will as written.
    #[serde(default)]
    pub text: String,
    /// Date the will was made, as written in the source document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub testator: WillPerson,
    pub directives: Vec<Directive>,
    /// SHA-256 over the canonical serialization with this field unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}
