//! Shared test utilities and fixtures
//!
//! A small fixed family, stub oracles, and wiremock helpers for the
//! integration suite.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use probate_engine::{PopulationStore, serialize_directive, stamp_checksum};
use probate_oracle::{DirectiveClassifier, MatchJudge, OracleFut};
use probate_types::{
    Asset, ClassifyRequest, Directive, EntityId, PartyRole, Person, PersonId, RuleClassification,
    RuleKind, WillAsset, WillModel, WillPerson,
};

// ===== POPULATION FIXTURE =====

pub fn person(id: u64, name: &str, alive: bool, age: u32, children: &[u64]) -> Person {
    Person {
        id: PersonId::new(id),
        full_name: name.to_owned(),
        alive,
        age,
        date_of_birth: None,
        children_ids: children.iter().copied().map(PersonId::new).collect(),
        assets: Vec::new(),
    }
}

/// John Doe's family: John is deceased with a red car and a vacuum
/// cleaner. Tom is his living son; Jack predeceased him leaving Ann;
/// Jane is 19; Ben is 9.
pub fn sample_population() -> PopulationStore {
    let mut john = person(1, "John Doe", false, 79, &[2, 3]);
    john.assets = vec![Asset::named("red car"), Asset::named("vacuum cleaner")];
    PopulationStore::from_people(vec![
        john,
        person(2, "Tom Doe", true, 44, &[]),
        person(3, "Jack Doe", false, 70, &[4]),
        person(4, "Ann Doe", true, 28, &[]),
        person(5, "Jane Doe", true, 19, &[]),
        person(6, "Ben Doe", true, 9, &[]),
    ])
}

// ===== WILL FIXTURES =====

pub fn directive(id: &str, assets: &[&str], beneficiaries: &[&str]) -> Directive {
    let asset_names = assets.join(" and ");
    let person_names = beneficiaries.join(" and ");
    Directive {
        id: EntityId::new(id),
        kind: "BequestAsset".to_owned(),
        beneficiaries: beneficiaries
            .iter()
            .enumerate()
            .map(|(i, name)| WillPerson::beneficiary(EntityId::new(format!("{id}-b{i}")), *name))
            .collect(),
        assets: assets
            .iter()
            .enumerate()
            .map(|(i, name)| WillAsset::new(EntityId::new(format!("{id}-a{i}")), *name))
            .collect(),
        conditions: Vec::new(),
        executors: Vec::new(),
        serialized_text: serialize_directive(&asset_names, &person_names, None, None),
    }
}

/// A sealed will model for John Doe over the given directives.
pub fn sealed_will(directives: Vec<Directive>) -> WillModel {
    let mut model = WillModel {
        text: "Last will and testament of John Doe.".to_owned(),
        date: Some("2023-09-14".to_owned()),
        testator: WillPerson::new(EntityId::new("t1"), "John Doe", PartyRole::Testator),
        directives,
        checksum: None,
    };
    stamp_checksum(&mut model).unwrap();
    model
}

// ===== STUB ORACLES =====

/// Classifier that replies from a queue, then falls back to a fixed
/// classification. No prompts, no network.
pub struct StubClassifier {
    queue: Mutex<VecDeque<RuleClassification>>,
    fallback: RuleClassification,
}

impl StubClassifier {
    pub fn always(fallback: RuleClassification) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    pub fn equal() -> Self {
        Self::always(RuleClassification::plain(RuleKind::Equal))
    }

    pub fn then(self, classification: RuleClassification) -> Self {
        self.queue.lock().unwrap().push_back(classification);
        self
    }
}

impl DirectiveClassifier for StubClassifier {
    fn classify<'a>(&'a self, _request: &'a ClassifyRequest) -> OracleFut<'a, RuleClassification> {
        let next = self
            .queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { Ok(next) })
    }
}

/// Judge that matches on case-insensitive containment in either
/// direction ("my red car" names "red car") and recognizes a fixed set
/// of residuary phrases.
pub struct ContainsJudge;

const RESIDUE_PHRASES: [&str; 3] = [
    "all the rest of my property",
    "the rest of my estate",
    "everything else",
];

impl MatchJudge for ContainsJudge {
    fn is_match<'a>(&'a self, requested: &'a str, candidate: &'a str) -> OracleFut<'a, bool> {
        Box::pin(async move {
            let requested = requested.to_lowercase();
            let candidate = candidate.to_lowercase();
            Ok(requested.contains(&candidate) || candidate.contains(&requested))
        })
    }

    fn is_residue<'a>(&'a self, requested: &'a str) -> OracleFut<'a, bool> {
        Box::pin(async move {
            let requested = requested.to_lowercase();
            Ok(RESIDUE_PHRASES.iter().any(|phrase| requested.contains(phrase)))
        })
    }
}

// ===== WIREMOCK HELPERS =====

/// Start a mock server that simulates an OpenAI-compatible chat endpoint.
pub async fn start_oracle_mock() -> MockServer {
    MockServer::start().await
}

/// Mount a chat-completions reply for requests whose prompt contains
/// `needle`. Mount more specific needles first.
pub async fn mount_chat_reply(server: &MockServer, needle: &str, reply: &str) {
    let body = serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "chatgpt-4o-latest",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": reply},
            "finish_reason": "stop"
        }]
    });
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(wiremock::matchers::body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
