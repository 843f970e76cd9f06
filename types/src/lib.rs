//! Core domain types for the will devolution engine.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! # Architecture
//!
//! - [`ids`]: newtype identifiers for people and extracted entities
//! - [`name`]: person-name canonicalization for database matching
//! - [`person`]: population-database records
//! - [`rule`]: the closed rule catalog and classifier output types
//! - [`will`]: the executable will model
//! - [`extractions`]: upstream text-extraction documents
//! - [`report`]: the devolution report and per-directive outcomes

pub mod extractions;
pub mod ids;
pub mod name;
pub mod person;
pub mod report;
pub mod rule;
pub mod will;

pub use extractions::{
    AssetEntity, ConditionEntity, EntityTable, ExtractionEvent, Extractions, ExtractionsDoc,
    NamedEntity,
};
pub use ids::{EntityId, PersonId};
pub use name::{clean_name, same_person};
pub use person::{AGE_OF_MAJORITY, Asset, Person};
pub use report::{
    AssetReport, BeneficiaryAward, DevolutionReport, DirectiveOutcome, DirectiveStatus, SkipReason,
};
pub use rule::{
    AgeRequirement, ClassifyRequest, RuleClassification, RuleEval, RuleKind, ShareTriple,
    SubDivision, UnknownRuleId,
};
pub use will::{Condition, Directive, PartyRole, WillAsset, WillModel, WillPerson};
