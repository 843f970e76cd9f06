//! The closed catalog of devolution rules and classifier output types.
//!
//! Rule identifiers are wire values shared with the external
//! classification oracle and recorded verbatim in reports, so the
//! numbering is sparse and stable. New rules are added by extending
//! [`RuleKind`], never by renumbering.

use serde::{Deserialize, Serialize};

/// A devolution rule the classifier can assign to a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Rule 0: division per stirpes through deceased beneficiaries.
    PerStirpes,
    /// Rule 1: equal division among the named beneficiaries.
    Equal,
    /// Rule 3: division by explicit proportions stated in the will.
    Proportional,
    /// Rule 5: reallocation contingent on named persons being dead.
    Contingent,
    /// Rule 6: division defaulted to the governing region's intestacy law.
    DefaultLaw,
    /// Rule 11: division gated on minimum-age requirements.
    AgeGated,
}

impl RuleKind {
    /// The wire identifier used by the oracle and in reports.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::PerStirpes => 0,
            Self::Equal => 1,
            Self::Proportional => 3,
            Self::Contingent => 5,
            Self::DefaultLaw => 6,
            Self::AgeGated => 11,
        }
    }

    pub fn try_from_id(id: u8) -> Result<Self, UnknownRuleId> {
        match id {
            0 => Ok(Self::PerStirpes),
            1 => Ok(Self::Equal),
            3 => Ok(Self::Proportional),
            5 => Ok(Self::Contingent),
            6 => Ok(Self::DefaultLaw),
            11 => Ok(Self::AgeGated),
            other => Err(UnknownRuleId(other)),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PerStirpes => "per-stirpes",
            Self::Equal => "equal",
            Self::Proportional => "proportional",
            Self::Contingent => "contingent",
            Self::DefaultLaw => "default-law",
            Self::AgeGated => "age-gated",
        }
    }

    /// The statute line recorded in reports when this rule is applied.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::PerStirpes => {
                "Division per stirpes among the named beneficiaries and their descendants."
            }
            Self::Equal => "Equal division among the named beneficiaries.",
            Self::Proportional => "Division by the explicit proportions stated in the directive.",
            Self::Contingent => "Reallocation contingent on the death of named persons.",
            Self::DefaultLaw => "Division under the default law of the governing region.",
            Self::AgeGated => "Division subject to minimum-age requirements.",
        }
    }

    /// Whether this rule carries an explicit proportion payload.
    #[must_use]
    pub const fn wants_proportions(self) -> bool {
        matches!(self, Self::Proportional | Self::DefaultLaw)
    }

    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::PerStirpes,
            Self::Equal,
            Self::Proportional,
            Self::Contingent,
            Self::DefaultLaw,
            Self::AgeGated,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown rule id: {0}")]
pub struct UnknownRuleId(pub u8);

/// One row of an explicit proportion payload: who gets how much of what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareTriple {
    pub person: String,
    pub asset: String,
    pub share: f64,
}

impl ShareTriple {
    /// Share as a fraction in `[0, 1]`. Oracles frequently answer in
    /// percent; anything above 1 is treated as a percentage.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.share > 1.0 {
            self.share / 100.0
        } else {
            self.share
        }
    }
}

/// A minimum-age gate on a named person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRequirement {
    pub person: String,
    pub minimum_age: u32,
}

/// How a gated rule divides the asset once its gate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubDivision {
    /// Equal split among the eligible beneficiaries.
    Equal,
    /// Explicit proportions, validated like rule 3.
    Proportional(Vec<ShareTriple>),
}

/// Rule-specific payload attached to a classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleEval {
    /// Rules 0 and 1 need no payload.
    None,
    /// Rules 3 and 6: explicit proportion rows.
    Proportions(Vec<ShareTriple>),
    /// Rule 5: persons who must be dead, plus the sub-division to apply.
    Contingency {
        unalive_people: Vec<String>,
        sub: SubDivision,
    },
    /// Rule 11: age gates, plus the sub-division to apply.
    AgeRequirements {
        requirements: Vec<AgeRequirement>,
        sub: SubDivision,
    },
}

/// Final classifier verdict for one directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleClassification {
    pub kind: RuleKind,
    pub eval: RuleEval,
}

impl RuleClassification {
    #[must_use]
    pub fn plain(kind: RuleKind) -> Self {
        Self {
            kind,
            eval: RuleEval::None,
        }
    }
}

/// Everything the classifier is given about one directive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// The directive's serialized text from the will model.
    pub directive_text: String,
    /// Testator full name, for pronoun resolution in the prompt.
    pub testator: String,
    /// Resolved asset names the directive touches.
    pub assets: Vec<String>,
    /// Resolved beneficiary full names.
    pub beneficiaries: Vec<String>,
    /// Full names of the testator's children, for stirpes phrasing.
    pub children: Vec<String>,
}
