//! Integration tests for Sumi-Mirror
//!
//! These tests run complete mirrors against wiremock servers and inspect
//! what lands in temporary directories.

mod mirror_tests;
