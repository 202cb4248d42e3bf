//! vrpc CLI library — the command implementations behind the `vrpc` binary.
//!
//! Exposed as a library so the integration tests exercise the same code
//! paths as the binary.

pub mod commands;
