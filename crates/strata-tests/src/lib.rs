//! Integration tests for strata crates.
//!
//! End-to-end checks that run scene files through document construction,
//! projection and merging. Buffer identity is compared with SHA-256
//! digests of the stored samples.
