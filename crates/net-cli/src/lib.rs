//! Netplan CLI
//!
//! Command-line entry point of the reconciliation engine. Requests arrive
//! as JSON on stdin or from a file; stdout carries only the response.

pub mod cli;
pub mod commands;
