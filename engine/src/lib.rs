//! Core devolution engine for Probate - rule execution and accounting.
//!
//! # Architecture
//!
//! ```text
//! WillModel ----> devolve() ----> DevolutionReport
//!                    |
//!         +----------+-----------+
//!         |          |           |
//!     Resolver   DivisionEngine  AllocationLedger
//!         |          |
//!    MatchJudge  DirectiveClassifier     (oracle-backed, injected)
//! ```
//!
//! The engine is oracle-agnostic: anything implementing the classifier and
//! judge traits from `probate-oracle` can drive it, which is how the tests
//! run without a network. All rule arithmetic, ledger accounting, and
//! stirpes descent live here; nothing in this crate performs I/O beyond
//! loading the population database.

pub mod builder;
pub mod checksum;
pub mod devolve;
pub mod division;
pub mod ledger;
pub mod population;
pub mod resolve;
pub mod stirpes;

pub use builder::{BuildError, build_will_model, serialize_directive};
pub use checksum::{
    ChecksumError, ChecksumPolicy, compute_checksum, stamp_checksum, verify_checksum,
};
pub use devolve::{DevolveError, DevolveOptions, devolve};
pub use division::{CUSTODIAN_SUFFIX, Division, DivisionEngine, equal_share};
pub use ledger::{AllocationLedger, OVER_ALLOCATION_TOLERANCE};
pub use population::{PopulationError, PopulationStore};
pub use resolve::{AssetProvenance, ResolvedAsset, ResolvedDirective, Resolver};
pub use stirpes::{MAX_DEPTH, StirpesError, StirpesShare, divide_by_stirpes};
