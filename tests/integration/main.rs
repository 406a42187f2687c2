//! Integration tests for Paper-Ingest
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetcher and the work driver end-to-end against real files.

mod driver_tests;
mod fetcher_tests;
