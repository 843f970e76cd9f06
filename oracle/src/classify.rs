//! Rule classification by quorum vote.
//!
//! A single oracle completion is too unreliable to hang a legal
//! division on: the same directive can classify differently across
//! calls, and replies are free text that may or may not contain the
//! JSON they were asked for. [`RuleClassifier`] therefore queries the
//! oracle several times in parallel, tallies the rule ids that come
//! back, and picks the majority. Ties go to the highest-valued rule id
//! that is actually applicable on the directive's surface language,
//! because higher ids name more specific rules.
//!
//! Replies that fail to parse are dropped from the vote. If the winning
//! rule needs structured data (proportions, contingency names, age
//! gates) and no vote carried a usable payload, the classifier re-asks
//! with a narrower prompt a bounded number of times before giving up.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Deserialize;

use probate_types::rule::{
    AgeRequirement, ClassifyRequest, RuleClassification, RuleEval, RuleKind, ShareTriple,
    SubDivision,
};

use crate::{Oracle, OracleError, OracleFut};

/// Pluggable classification capability consumed by the engine.
pub trait DirectiveClassifier: Send + Sync {
    fn classify<'a>(&'a self, request: &'a ClassifyRequest) -> OracleFut<'a, RuleClassification>;
}

/// Majority-vote classifier over a raw [`Oracle`].
pub struct RuleClassifier {
    oracle: Arc<dyn Oracle>,
    quorum: usize,
    parse_retries: u32,
    /// Governing region for default-law division.
    region: String,
}

impl RuleClassifier {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            quorum: 5,
            parse_retries: 3,
            region: "AZ".to_owned(),
        }
    }

    #[must_use]
    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum.max(1);
        self
    }

    #[must_use]
    pub fn with_parse_retries(mut self, parse_retries: u32) -> Self {
        self.parse_retries = parse_retries;
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    async fn classify_inner(
        &self,
        request: &ClassifyRequest,
    ) -> Result<RuleClassification, OracleError> {
        let prompt = classification_prompt(request);
        let replies = join_all((0..self.quorum).map(|_| self.oracle.complete(&prompt))).await;

        let mut votes: Vec<RawReply> = Vec::with_capacity(self.quorum);
        for reply in replies {
            match reply {
                Ok(text) => match parse_reply(&text) {
                    Some(raw) => votes.push(raw),
                    None => {
                        tracing::warn!(
                            oracle = self.oracle.name(),
                            "Dropping unparseable classification vote"
                        );
                    }
                },
                Err(err) => {
                    tracing::warn!(oracle = self.oracle.name(), error = %err, "Classification query failed");
                }
            }
        }

        if votes.is_empty() {
            return Err(OracleError::RetriesExhausted {
                attempts: self.quorum as u32,
                detail: "no parseable classification votes".to_owned(),
            });
        }

        let mut tally: BTreeMap<RuleKind, usize> = BTreeMap::new();
        for vote in &votes {
            // One vote per kind per reply, however many ids it listed.
            let kinds: BTreeSet<RuleKind> = vote
                .rule_ids
                .iter()
                .filter_map(|&id| match RuleKind::try_from_id(id) {
                    Ok(kind) => Some(kind),
                    Err(err) => {
                        tracing::debug!(%err, "Ignoring out-of-catalog rule id in vote");
                        None
                    }
                })
                .collect();
            for kind in kinds {
                *tally.entry(kind).or_insert(0) += 1;
            }
        }

        let Some(top_count) = tally.values().copied().max() else {
            return Err(OracleError::RetriesExhausted {
                attempts: self.quorum as u32,
                detail: "votes named no rule in the catalog".to_owned(),
            });
        };
        let leaders: Vec<RuleKind> = tally
            .iter()
            .filter(|&(_, &count)| count == top_count)
            .map(|(&kind, _)| kind)
            .collect();
        let winner = break_tie(&leaders, &request.directive_text);

        tracing::info!(
            rule = winner.as_str(),
            rule_id = winner.id(),
            votes = top_count,
            quorum = self.quorum,
            "Classified directive"
        );

        if let Some(eval) = votes.iter().find_map(|vote| payload_for(winner, vote)) {
            return Ok(RuleClassification { kind: winner, eval });
        }

        self.refine_payload(winner, request).await
    }

    /// Re-asks for the winning rule's structured payload with a
    /// narrower prompt.
    async fn refine_payload(
        &self,
        winner: RuleKind,
        request: &ClassifyRequest,
    ) -> Result<RuleClassification, OracleError> {
        let prompt = refinement_prompt(winner, request, &self.region);
        for attempt in 0..self.parse_retries {
            match self.oracle.complete(&prompt).await {
                Ok(text) => {
                    if let Some(eval) = parse_reply(&text).and_then(|raw| payload_for(winner, &raw))
                    {
                        return Ok(RuleClassification { kind: winner, eval });
                    }
                    tracing::warn!(
                        rule = winner.as_str(),
                        attempt = attempt + 1,
                        "Refinement reply carried no usable payload"
                    );
                }
                Err(err) => {
                    tracing::warn!(rule = winner.as_str(), attempt = attempt + 1, error = %err, "Refinement query failed");
                }
            }
        }
        Err(OracleError::RetriesExhausted {
            attempts: self.parse_retries,
            detail: format!(
                "no usable payload for rule {} ({})",
                winner.id(),
                winner.as_str()
            ),
        })
    }
}

impl DirectiveClassifier for RuleClassifier {
    fn classify<'a>(&'a self, request: &'a ClassifyRequest) -> OracleFut<'a, RuleClassification> {
        Box::pin(self.classify_inner(request))
    }
}

// ===== TIE BREAKING =====

const AGE_CUES: [&str; 6] = ["age", "years old", "older than", "turns", "reaches", "minor"];
const DEATH_CUES: [&str; 8] = [
    "dead",
    "deceased",
    "predecease",
    "not alive",
    "no longer living",
    "survive",
    "dies",
    "passed away",
];

/// Deterministic tie-break: keep the candidates whose gating language
/// actually appears in the directive, then take the highest rule id.
fn break_tie(leaders: &[RuleKind], directive_text: &str) -> RuleKind {
    let text = directive_text.to_lowercase();
    let applicable = |kind: RuleKind| match kind {
        RuleKind::AgeGated => AGE_CUES.iter().any(|cue| text.contains(cue)),
        RuleKind::Contingent => DEATH_CUES.iter().any(|cue| text.contains(cue)),
        _ => true,
    };

    let filtered: Vec<RuleKind> = leaders.iter().copied().filter(|&k| applicable(k)).collect();
    let pool = if filtered.is_empty() { leaders } else { &filtered };
    pool.iter().copied().max().unwrap_or(RuleKind::Equal)
}

// ===== PROMPTS =====

fn rule_catalog() -> String {
    let mut catalog = String::new();
    for kind in RuleKind::all() {
        let _ = writeln!(catalog, "- {}: {}", kind.id(), kind.description());
    }
    catalog
}

fn classification_prompt(request: &ClassifyRequest) -> String {
    format!(
        "You are a probate rule classifier. Given one directive from a will, \
identify which devolution rule(s) from the catalog apply and extract the \
rule's structured data.\n\n\
Rule catalog:\n{catalog}\n\
Directive: {directive}\n\
Testator: {testator}\n\
Assets involved: {assets}\n\
Beneficiaries: {beneficiaries}\n\
Testator's children: {children}\n\n\
Answer with a single JSON object and nothing else:\n\
{{\"rule_ids\": [<applicable rule ids>], \
\"proportions\": [[\"person name\", \"asset name\", share], ...], \
\"unalive_people\": [\"person name\", ...], \
\"age_requirements\": [[\"person name\", minimum_age], ...], \
\"sub_division\": \"equal\" or \"proportional\"}}\n\
Include only the fields the applicable rules need. Shares may be \
fractions or percentages.",
        catalog = rule_catalog(),
        directive = request.directive_text,
        testator = request.testator,
        assets = request.assets.join(", "),
        beneficiaries = request.beneficiaries.join(", "),
        children = request.children.join(", "),
    )
}

fn refinement_prompt(winner: RuleKind, request: &ClassifyRequest, region: &str) -> String {
    let needed = match winner {
        RuleKind::Proportional => {
            "\"proportions\": [[\"person name\", \"asset name\", share], ...]".to_owned()
        }
        RuleKind::DefaultLaw => format!(
            "\"proportions\": [[\"person name\", \"asset name\", share], ...] \
per the intestate succession law of {region}"
        ),
        RuleKind::Contingent => {
            "\"unalive_people\": [\"person name\", ...] and, when the directive states \
explicit shares, \"proportions\" and \"sub_division\""
                .to_owned()
        }
        RuleKind::AgeGated => {
            "\"age_requirements\": [[\"person name\", minimum_age], ...] and, when the \
directive states explicit shares, \"proportions\" and \"sub_division\""
                .to_owned()
        }
        RuleKind::PerStirpes | RuleKind::Equal => "\"rule_ids\": [<rule id>]".to_owned(),
    };
    format!(
        "A will directive has been classified under rule {id} ({description}).\n\
Directive: {directive}\n\
Beneficiaries: {beneficiaries}\n\
Assets involved: {assets}\n\n\
Extract exactly {needed}. Answer with a single JSON object and nothing else.",
        id = winner.id(),
        description = winner.description(),
        directive = request.directive_text,
        beneficiaries = request.beneficiaries.join(", "),
        assets = request.assets.join(", "),
    )
}

// ===== REPLY PARSING =====

#[derive(Debug, Default, Deserialize)]
struct RawReply {
    #[serde(default)]
    rule_ids: Vec<u8>,
    #[serde(default)]
    proportions: Vec<(String, String, f64)>,
    #[serde(default)]
    unalive_people: Vec<String>,
    #[serde(default)]
    age_requirements: Vec<(String, u32)>,
    #[serde(default)]
    sub_division: Option<String>,
}

/// Pulls the JSON object out of a free-text reply. Oracles wrap their
/// answers in prose and code fences often enough that this cannot be a
/// plain `from_str`.
fn parse_reply(text: &str) -> Option<RawReply> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn triples(raw: &[(String, String, f64)]) -> Vec<ShareTriple> {
    raw.iter()
        .map(|(person, asset, share)| ShareTriple {
            person: person.clone(),
            asset: asset.clone(),
            share: *share,
        })
        .collect()
}

fn sub_division_of(raw: &RawReply) -> SubDivision {
    match raw.sub_division.as_deref() {
        Some(s) if s.eq_ignore_ascii_case("equal") => SubDivision::Equal,
        Some(s) if s.eq_ignore_ascii_case("proportional") && !raw.proportions.is_empty() => {
            SubDivision::Proportional(triples(&raw.proportions))
        }
        _ if !raw.proportions.is_empty() => SubDivision::Proportional(triples(&raw.proportions)),
        _ => SubDivision::Equal,
    }
}

/// Extracts the payload the winning rule needs from one vote, or
/// `None` when the vote did not carry it.
fn payload_for(winner: RuleKind, raw: &RawReply) -> Option<RuleEval> {
    match winner {
        RuleKind::PerStirpes | RuleKind::Equal => Some(RuleEval::None),
        RuleKind::Proportional | RuleKind::DefaultLaw => {
            if raw.proportions.is_empty() {
                None
            } else {
                Some(RuleEval::Proportions(triples(&raw.proportions)))
            }
        }
        RuleKind::Contingent => {
            if raw.unalive_people.is_empty() {
                None
            } else {
                Some(RuleEval::Contingency {
                    unalive_people: raw.unalive_people.clone(),
                    sub: sub_division_of(raw),
                })
            }
        }
        RuleKind::AgeGated => {
            if raw.age_requirements.is_empty() {
                None
            } else {
                Some(RuleEval::AgeRequirements {
                    requirements: raw
                        .age_requirements
                        .iter()
                        .map(|(person, minimum_age)| AgeRequirement {
                            person: person.clone(),
                            minimum_age: *minimum_age,
                        })
                        .collect(),
                    sub: sub_division_of(raw),
                })
            }
        }
    }
}
