//! A deterministic oracle for tests and offline replay.
//!
//! Rules map a prompt fragment to a queue of canned replies. The first
//! rule whose fragment appears in the prompt answers; replies are
//! consumed in order and the final one repeats, which makes scripting a
//! five-vote quorum a single entry. Prompts no rule matches fall back
//! to the `otherwise` reply, or fail loudly so a test never passes on
//! an accidental answer.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{Oracle, OracleError, OracleFut};

#[derive(Default)]
pub struct ScriptedOracle {
    rules: Mutex<Vec<ScriptRule>>,
    fallback: Option<String>,
}

struct ScriptRule {
    needle: String,
    replies: VecDeque<String>,
}

impl ScriptedOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for prompts containing `needle`. Earlier rules win
    /// when several match; the last reply in the queue repeats forever.
    #[must_use]
    pub fn on<S: Into<String>>(self, needle: impl Into<String>, replies: impl IntoIterator<Item = S>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(ScriptRule {
                needle: needle.into(),
                replies: replies.into_iter().map(Into::into).collect(),
            });
        }
        self
    }

    /// Reply for prompts no rule matches.
    #[must_use]
    pub fn otherwise(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    fn answer(&self, prompt: &str) -> Result<String, OracleError> {
        if let Ok(mut rules) = self.rules.lock() {
            for rule in rules.iter_mut() {
                if !prompt.contains(&rule.needle) {
                    continue;
                }
                return match rule.replies.len() {
                    0 => break,
                    1 => Ok(rule.replies[0].clone()),
                    _ => Ok(rule.replies.pop_front().unwrap_or_default()),
                };
            }
        }
        if let Some(fallback) = &self.fallback {
            return Ok(fallback.clone());
        }
        Err(OracleError::ScriptExhausted {
            prompt_head: prompt.chars().take(80).collect(),
        })
    }
}

impl Oracle for ScriptedOracle {
    fn complete<'a>(&'a self, prompt: &'a str) -> OracleFut<'a, String> {
        let result = self.answer(prompt);
        Box::pin(async move { result })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
