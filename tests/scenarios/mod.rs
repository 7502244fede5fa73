//! Scenario-based tests for qtpack

mod cancellation;
mod failure_handling;
mod manifest_copy;
