//! Text-extraction documents, the upstream input to the will builder.
//!
//! Extraction documents are produced by an NLP pipeline and are loosely
//! shaped: entity tables arrive as a list of maps, event references may
//! be a single id or a list, and the event type may be a string or a
//! list of strings. The deserializers here flatten those variations
//! into one typed form so the builder never touches raw JSON.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::EntityId;

/// A complete text-extractions document for one will.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionsDoc {
    pub extractions: Extractions,
    #[serde(default)]
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_will: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extractions {
    /// Entity tables. Pipelines emit a single-element list; later
    /// elements are merged in document order if present.
    pub entities: Vec<EntityTable>,
    #[serde(default)]
    pub events: Vec<ExtractionEvent>,
}

/// One table of extracted entities, keyed by entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityTable {
    #[serde(default, alias = "Testator", skip_serializing_if = "Option::is_none")]
    pub testator: Option<NamedEntity>,
    #[serde(default, alias = "Beneficiary", skip_serializing_if = "Vec::is_empty")]
    pub beneficiary: Vec<NamedEntity>,
    #[serde(default, alias = "Executor", skip_serializing_if = "Vec::is_empty")]
    pub executor: Vec<NamedEntity>,
    #[serde(default, alias = "Asset", skip_serializing_if = "Vec::is_empty")]
    pub asset: Vec<AssetEntity>,
    #[serde(default, alias = "Condition", skip_serializing_if = "Vec::is_empty")]
    pub condition: Vec<ConditionEntity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntity {
    pub id: EntityId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionEntity {
    pub id: EntityId,
    pub text: String,
}

/// One extracted event. Only bequest-typed events become directives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionEvent {
    pub id: EntityId,
    #[serde(rename = "type", deserialize_with = "de_event_kind")]
    pub kind: String,
    #[serde(rename = "Asset", alias = "asset", default, deserialize_with = "de_id_refs")]
    pub assets: Vec<EntityId>,
    #[serde(
        rename = "Beneficiary",
        alias = "beneficiary",
        default,
        deserialize_with = "de_id_refs"
    )]
    pub beneficiaries: Vec<EntityId>,
    #[serde(
        rename = "Condition",
        alias = "condition",
        default,
        deserialize_with = "de_id_refs"
    )]
    pub conditions: Vec<EntityId>,
    #[serde(
        rename = "Executor",
        alias = "executor",
        default,
        deserialize_with = "de_id_refs"
    )]
    pub executors: Vec<EntityId>,
}

impl ExtractionEvent {
    /// Event kinds that create a bequest directive.
    pub const BEQUEST_KINDS: [&'static str; 2] = ["BequestAsset", "Bequest"];

    #[must_use]
    pub fn is_bequest(&self) -> bool {
        Self::BEQUEST_KINDS.contains(&self.kind.as_str())
    }
}

/// Event type: a string, or a list of strings joined with commas.
fn de_event_kind<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct KindVisitor;

    impl<'de> Visitor<'de> for KindVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_owned())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut parts: Vec<String> = Vec::new();
            while let Some(part) = seq.next_element::<String>()? {
                parts.push(part);
            }
            Ok(parts.join(","))
        }
    }

    deserializer.deserialize_any(KindVisitor)
}

/// Entity reference: absent, null, a single id, or a list of ids.
fn de_id_refs<'de, D>(deserializer: D) -> Result<Vec<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdRefsVisitor;

    impl<'de> Visitor<'de> for IdRefsVisitor {
        type Value = Vec<EntityId>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an id, a list of ids, or null")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![EntityId::new(v)])
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(vec![EntityId::new(v.to_string())])
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(vec![EntityId::new(v.to_string())])
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut ids = Vec::new();
            while let Some(id) = seq.next_element::<EntityId>()? {
                ids.push(id);
            }
            Ok(ids)
        }
    }

    deserializer.deserialize_any(IdRefsVisitor)
}
