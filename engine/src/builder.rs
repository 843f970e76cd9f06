//! Builds an executable will model from a text-extractions document.
//!
//! Bequest-typed events become directives. An event that references missing
//! beneficiaries or assets is dropped with a diagnostic rather than failing
//! the build; a missing testator fails it, there is nobody to devolve from.
//! The finished model is sealed with its checksum before being returned.

use std::collections::HashMap;

use probate_types::{
    Condition, Directive, EntityId, ExtractionEvent, ExtractionsDoc, PartyRole, WillAsset,
    WillModel, WillPerson,
};

use crate::checksum::stamp_checksum;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("extractions document names no testator")]
    MissingTestator,

    #[error("will model could not be sealed: {0}")]
    Seal(#[from] serde_json::Error),
}

/// Entity lookup merged across every table in the document.
#[derive(Default)]
struct EntityIndex {
    testator: Option<WillPerson>,
    people: HashMap<EntityId, WillPerson>,
    executors: HashMap<EntityId, WillPerson>,
    assets: HashMap<EntityId, WillAsset>,
    conditions: HashMap<EntityId, Condition>,
}

impl EntityIndex {
    fn from_doc(doc: &ExtractionsDoc) -> Self {
        let mut index = Self::default();
        for table in &doc.extractions.entities {
            if index.testator.is_none() {
                if let Some(entity) = &table.testator {
                    index.testator = Some(WillPerson::new(
                        entity.id.clone(),
                        entity.name.clone(),
                        PartyRole::Testator,
                    ));
                }
            }
            for entity in &table.beneficiary {
                index.people.insert(
                    entity.id.clone(),
                    WillPerson::beneficiary(entity.id.clone(), entity.name.clone()),
                );
            }
            for entity in &table.executor {
                index.executors.insert(
                    entity.id.clone(),
                    WillPerson::new(entity.id.clone(), entity.name.clone(), PartyRole::Executor),
                );
            }
            for entity in &table.asset {
                index.assets.insert(
                    entity.id.clone(),
                    WillAsset::new(entity.id.clone(), entity.description.clone()),
                );
            }
            for entity in &table.condition {
                index.conditions.insert(
                    entity.id.clone(),
                    Condition {
                        id: entity.id.clone(),
                        text: entity.text.clone(),
                    },
                );
            }
        }
        index
    }
}

/// Converts an extractions document into a sealed [`WillModel`].
pub fn build_will_model(doc: &ExtractionsDoc) -> Result<WillModel, BuildError> {
    let index = EntityIndex::from_doc(doc);
    let testator = index.testator.clone().ok_or(BuildError::MissingTestator)?;

    let mut directives = Vec::new();
    for event in &doc.extractions.events {
        if !event.is_bequest() {
            tracing::debug!(event = %event.id, kind = %event.kind, "Skipping non-bequest event");
            continue;
        }
        if let Some(directive) = build_directive(event, &index) {
            directives.push(directive);
        }
    }

    let mut model = WillModel {
        text: doc.full_text.clone(),
        date: doc.date_of_will.clone(),
        testator,
        directives,
        checksum: None,
    };
    stamp_checksum(&mut model)?;
    tracing::info!(
        directives = model.directives.len(),
        "Will model built and sealed"
    );
    Ok(model)
}

fn build_directive(event: &ExtractionEvent, index: &EntityIndex) -> Option<Directive> {
    let beneficiaries = collect(&event.beneficiaries, &index.people);
    if beneficiaries.is_empty() {
        tracing::warn!(event = %event.id, "Bequest event references no known beneficiaries; dropped");
        return None;
    }
    let assets = collect(&event.assets, &index.assets);
    if assets.is_empty() {
        tracing::warn!(event = %event.id, "Bequest event references no known assets; dropped");
        return None;
    }
    let conditions = collect(&event.conditions, &index.conditions);
    let executors = collect(&event.executors, &index.executors);

    let serialized_text = serialize_directive(
        &join(assets.iter().map(|a| a.name.as_str())),
        &join(beneficiaries.iter().map(|b| b.name.as_str())),
        non_empty(join(conditions.iter().map(|c| c.text.as_str()))),
        non_empty(join(executors.iter().map(|e| e.name.as_str()))),
    );

    Some(Directive {
        id: event.id.clone(),
        kind: event.kind.clone(),
        beneficiaries,
        assets,
        conditions,
        executors,
        serialized_text,
    })
}

/// Renders a directive the way it is shown to people and to the classifier.
#[must_use]
pub fn serialize_directive(
    assets: &str,
    beneficiaries: &str,
    conditions: Option<String>,
    executor: Option<String>,
) -> String {
    let mut text = format!("Bequest asset/s '{assets}' to '{beneficiaries}'");
    if let Some(conditions) = conditions {
        text.push_str(&format!(" with following conditions: {conditions}"));
    }
    if let Some(executor) = executor {
        text.push_str(&format!(". The name of executor is {executor}"));
    }
    text.push('.');
    text
}

fn collect<T: Clone>(ids: &[EntityId], table: &HashMap<EntityId, T>) -> Vec<T> {
    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        match table.get(id) {
            Some(entity) => found.push(entity.clone()),
            None => tracing::warn!(entity = %id, "Event references an unknown entity id"),
        }
    }
    found
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.collect::<Vec<_>>().join(" and ")
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{ChecksumPolicy, verify_checksum};

    fn doc(json: &str) -> ExtractionsDoc {
        serde_json::from_str(json).unwrap()
    }

    const FULL_DOC: &str = r#"{
        "full_text": "I, John Doe, being of sound mind, leave my red car to Tom Doe and Jack Doe.",
        "date_of_will": "2023-09-14",
        "extractions": {
            "entities": [{
                "Testator": {"id": "t1", "name": "John Doe"},
                "Beneficiary": [
                    {"id": "b1", "name": "Tom Doe"},
                    {"id": "b2", "name": "Jack Doe"}
                ],
                "Asset": [{"id": "a1", "description": "my red car"}],
                "Condition": [{"id": "c1", "text": "provided they keep it in the family"}],
                "Executor": [{"id": "x1", "name": "Sara Li"}]
            }],
            "events": [
                {
                    "id": "e1",
                    "type": "BequestAsset",
                    "Asset": "a1",
                    "Beneficiary": ["b1", "b2"],
                    "Condition": ["c1"],
                    "Executor": "x1"
                },
                {"id": "e2", "type": "Marriage"}
            ]
        }
    }"#;

    #[test]
    fn builds_a_sealed_model() {
        let model = build_will_model(&doc(FULL_DOC)).unwrap();
        assert_eq!(model.testator.name, "John Doe");
        assert_eq!(model.directives.len(), 1);
        verify_checksum(&model, ChecksumPolicy::Enforce).unwrap();

        let directive = &model.directives[0];
        assert_eq!(directive.beneficiaries.len(), 2);
        assert_eq!(directive.assets[0].name, "my red car");
        assert_eq!(
            directive.serialized_text,
            "Bequest asset/s 'my red car' to 'Tom Doe and Jack Doe' \
             with following conditions: provided they keep it in the family. \
             The name of executor is Sara Li."
        );
    }

    #[test]
    fn events_with_missing_parties_are_dropped() {
        let json = r#"{
            "extractions": {
                "entities": [{
                    "Testator": {"id": "t1", "name": "John Doe"},
                    "Asset": [{"id": "a1", "description": "my red car"}]
                }],
                "events": [
                    {"id": "e1", "type": "Bequest", "Asset": "a1"},
                    {"id": "e2", "type": "Bequest", "Beneficiary": "b-missing", "Asset": "a1"}
                ]
            }
        }"#;
        let model = build_will_model(&doc(json)).unwrap();
        assert!(model.directives.is_empty());
        assert!(model.checksum.is_some());
    }

    #[test]
    fn missing_testator_fails_the_build() {
        let json = r#"{"extractions": {"entities": [{}], "events": []}}"#;
        let err = build_will_model(&doc(json)).unwrap_err();
        assert!(matches!(err, BuildError::MissingTestator));
    }

    #[test]
    fn serialization_omits_absent_sections() {
        let text = serialize_directive("red car", "Tom Doe", None, None);
        assert_eq!(text, "Bequest asset/s 'red car' to 'Tom Doe'.");

        let text = serialize_directive("red car", "Tom Doe", Some("if he outlives me".into()), None);
        assert_eq!(
            text,
            "Bequest asset/s 'red car' to 'Tom Doe' with following conditions: if he outlives me."
        );
    }

    #[test]
    fn entity_tables_merge_in_document_order() {
        let json = r#"{
            "extractions": {
                "entities": [
                    {"Testator": {"id": "t1", "name": "John Doe"}},
                    {"Beneficiary": [{"id": "b1", "name": "Tom Doe"}],
                     "Asset": [{"id": "a1", "description": "the boat"}]}
                ],
                "events": [{"id": "e1", "type": "Bequest", "Beneficiary": "b1", "Asset": "a1"}]
            }
        }"#;
        let model = build_will_model(&doc(json)).unwrap();
        assert_eq!(model.directives.len(), 1);
        assert_eq!(model.directives[0].serialized_text, "Bequest asset/s 'the boat' to 'Tom Doe'.");
    }
}
