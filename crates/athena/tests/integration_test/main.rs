//! Integration tests for qrun-athena.
//!
//! These drive the executor against a scripted query service and a real
//! `BlobStore` backed by in-memory object stores, without AWS credentials.

mod common;
mod lifecycle;
mod batch;
