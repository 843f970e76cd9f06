//! Integration test suite modules.

mod pipeline;
mod scenarios;
