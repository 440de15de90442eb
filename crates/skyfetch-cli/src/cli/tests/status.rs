//! Tests for the status subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand, DEFAULT_OUTPUT_DIR};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_status_default_output() {
    match parse(&["skyfetch", "status"]) {
        CliCommand::Status { output } => assert_eq!(output, Path::new(DEFAULT_OUTPUT_DIR)),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_output() {
    match parse(&["skyfetch", "status", "--output", "out"]) {
        CliCommand::Status { output } => assert_eq!(output, Path::new("out")),
        _ => panic!("expected Status with --output"),
    }
}

#[test]
fn cli_rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["skyfetch", "add", "https://example.com"]).is_err());
}
