//! Yes/no similarity judgments for asset resolution.
//!
//! Asset names in a will rarely match database records verbatim ("my
//! beloved red automobile" vs "red car"), and one directive phrasing
//! ("all the rest of my property") quietly refers to everything not yet
//! given away. Both judgments are delegated to the oracle as strict
//! yes/no questions.
//!
//! The oracle does not always answer in the demanded format. Replies
//! that are not recognizably "yes" or "no" are re-asked a bounded
//! number of times; if every reply stays unusable the judge answers
//! "no", which downstream means "treat as unmatched" rather than
//! aborting the directive.

use std::sync::Arc;

use crate::{Oracle, OracleError, OracleFut};

/// Pluggable boolean-judgment capability consumed by the engine.
pub trait MatchJudge: Send + Sync {
    /// Does the will's wording (`requested`) name the database asset
    /// (`candidate`)?
    fn is_match<'a>(&'a self, requested: &'a str, candidate: &'a str) -> OracleFut<'a, bool>;

    /// Does the wording mean "all the rest of the property"?
    fn is_residue<'a>(&'a self, requested: &'a str) -> OracleFut<'a, bool>;
}

/// Oracle-backed judge with bounded re-asking.
pub struct SimilarityJudge {
    oracle: Arc<dyn Oracle>,
    parse_retries: u32,
}

impl SimilarityJudge {
    #[must_use]
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            parse_retries: 3,
        }
    }

    #[must_use]
    pub fn with_parse_retries(mut self, parse_retries: u32) -> Self {
        self.parse_retries = parse_retries;
        self
    }

    async fn ask_yes_no(&self, prompt: String) -> Result<bool, OracleError> {
        let mut saw_reply = false;
        let mut last_err: Option<OracleError> = None;

        for attempt in 0..self.parse_retries.max(1) {
            match self.oracle.complete(&prompt).await {
                Ok(text) => {
                    saw_reply = true;
                    if let Some(verdict) = parse_verdict(&text) {
                        return Ok(verdict);
                    }
                    tracing::debug!(
                        attempt = attempt + 1,
                        reply = %text.chars().take(60).collect::<String>(),
                        "Discarding non-boolean judge reply"
                    );
                }
                Err(err) => {
                    tracing::warn!(attempt = attempt + 1, error = %err, "Judge query failed");
                    last_err = Some(err);
                }
            }
        }

        match (saw_reply, last_err) {
            // The oracle never answered at all: that is an outage, not
            // an undecided question.
            (false, Some(err)) => Err(err),
            _ => {
                tracing::warn!("Judge gave no usable yes/no answer; treating as no");
                Ok(false)
            }
        }
    }
}

impl MatchJudge for SimilarityJudge {
    fn is_match<'a>(&'a self, requested: &'a str, candidate: &'a str) -> OracleFut<'a, bool> {
        let prompt = format!(
            "Give a boolean answer yes or no ONLY in lowercase. Evaluate whether the \
asset name \"{requested}\" matches with the following asset (it does not have \
to be an exact spelling match): \"{candidate}\"?"
        );
        Box::pin(self.ask_yes_no(prompt))
    }

    fn is_residue<'a>(&'a self, requested: &'a str) -> OracleFut<'a, bool> {
        let prompt = format!(
            "Give a boolean answer yes or no ONLY in lowercase. Evaluate whether the \
asset name \"{requested}\" means ALL the rest of the property?"
        );
        Box::pin(self.ask_yes_no(prompt))
    }
}

fn parse_verdict(text: &str) -> Option<bool> {
    let normalized = text.trim().to_lowercase();
    let normalized = normalized.trim_matches(|c: char| !c.is_alphanumeric());
    match normalized {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchJudge, SimilarityJudge, parse_verdict};
    use crate::ScriptedOracle;
    use std::sync::Arc;

    fn judge(oracle: ScriptedOracle) -> SimilarityJudge {
        SimilarityJudge::new(Arc::new(oracle)).with_parse_retries(3)
    }

    #[test]
    fn verdict_parsing_tolerates_case_and_punctuation() {
        assert_eq!(parse_verdict("yes"), Some(true));
        assert_eq!(parse_verdict(" Yes.\n"), Some(true));
        assert_eq!(parse_verdict("NO!"), Some(false));
        assert_eq!(parse_verdict("maybe"), None);
        assert_eq!(parse_verdict("yes and no"), None);
    }

    #[tokio::test]
    async fn matches_resolve_to_booleans() {
        let oracle = ScriptedOracle::new()
            .on("\"my red automobile\" matches", ["yes"])
            .on("\"the boat\" matches", ["no"]);
        let judge = judge(oracle);

        assert!(judge.is_match("my red automobile", "red car").await.unwrap());
        assert!(!judge.is_match("the boat", "red car").await.unwrap());
    }

    #[tokio::test]
    async fn garbled_replies_are_re_asked() {
        let oracle = ScriptedOracle::new().on("ALL the rest", ["it is everything, truly", "yes"]);
        let judge = judge(oracle);

        assert!(judge.is_residue("all the rest of my property").await.unwrap());
    }

    #[tokio::test]
    async fn exhaustion_defaults_to_no() {
        let oracle = ScriptedOracle::new().on("ALL the rest", ["hmm"]);
        let judge = judge(oracle);

        assert!(!judge.is_residue("the vacuum cleaner").await.unwrap());
    }
}
