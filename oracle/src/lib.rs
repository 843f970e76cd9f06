//! Oracle adapters for the devolution engine.
//!
//! Two pieces of the devolution pipeline delegate judgment to an
//! external language-model oracle: rule classification of directives
//! and yes/no similarity questions during asset resolution. The oracle
//! is unreliable by nature, so everything in this crate is built
//! around that fact: HTTP transport retries with backoff, answers are
//! re-asked until they parse, and classification runs as a quorum vote.
//!
//! # Architecture
//!
//! - [`Oracle`]: the raw completion capability (one prompt, one reply)
//! - [`http`]: [`HttpOracle`], a chat-completions client with retries
//! - [`scripted`]: [`ScriptedOracle`], a deterministic stand-in for tests
//! - [`classify`]: [`RuleClassifier`], quorum voting over rule ids
//! - [`judge`]: [`SimilarityJudge`], bounded yes/no questioning
//!
//! The engine consumes the [`classify::DirectiveClassifier`] and
//! [`judge::MatchJudge`] traits, never a concrete oracle, so test
//! suites can substitute scripted implementations.

pub mod classify;
pub mod http;
pub mod judge;
pub mod retry;
pub mod scripted;

use std::future::Future;
use std::pin::Pin;

pub use classify::{DirectiveClassifier, RuleClassifier};
pub use http::HttpOracle;
pub use judge::{MatchJudge, SimilarityJudge};
pub use retry::{RetryConfig, RetryOutcome, send_with_retry};
pub use scripted::ScriptedOracle;

/// Oracle completion future type alias.
pub type OracleFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, OracleError>> + Send + 'a>>;

/// The raw oracle capability: one prompt in, one free-text reply out.
///
/// Implementations must be safe to query concurrently; the classifier
/// fires its quorum of queries in parallel.
pub trait Oracle: Send + Sync {
    fn complete<'a>(&'a self, prompt: &'a str) -> OracleFut<'a, String>;

    /// Short label for log lines.
    fn name(&self) -> &'static str {
        "oracle"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle endpoint returned HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    #[error("could not reach the oracle endpoint after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("oracle request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("oracle reply was not in the expected shape: {detail}")]
    MalformedReply { detail: String },

    #[error("no usable oracle reply after {attempts} attempts: {detail}")]
    RetriesExhausted { attempts: u32, detail: String },

    #[error("no API key available; set {var} or configure the oracle api_key")]
    MissingApiKey { var: String },

    #[error("scripted oracle has no reply for prompt starting {prompt_head:?}")]
    ScriptExhausted { prompt_head: String },
}
