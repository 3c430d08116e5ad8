//! Tests for stats, clear, reconcile, sweep.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_stats() {
    match parse(&["mtap", "stats"]) {
        CliCommand::Stats => {}
        _ => panic!("expected Stats"),
    }
}

#[test]
fn cli_parse_clear_one() {
    match parse(&["mtap", "clear", "12"]) {
        CliCommand::Clear { context, others } => {
            assert_eq!(context, Some(12));
            assert!(others.is_none());
        }
        _ => panic!("expected Clear"),
    }
}

#[test]
fn cli_parse_clear_others() {
    match parse(&["mtap", "clear", "--others", "4"]) {
        CliCommand::Clear { context, others } => {
            assert!(context.is_none());
            assert_eq!(others, Some(4));
        }
        _ => panic!("expected Clear"),
    }
}

#[test]
fn cli_clear_rejects_both_forms() {
    assert!(Cli::try_parse_from(["mtap", "clear", "1", "--others", "2"]).is_err());
}

#[test]
fn cli_parse_reconcile() {
    match parse(&["mtap", "reconcile", "1", "3"]) {
        CliCommand::Reconcile { live } => assert_eq!(live, vec![1, 3]),
        _ => panic!("expected Reconcile"),
    }
    match parse(&["mtap", "reconcile"]) {
        CliCommand::Reconcile { live } => assert!(live.is_empty()),
        _ => panic!("expected Reconcile"),
    }
}

#[test]
fn cli_parse_sweep() {
    match parse(&["mtap", "sweep"]) {
        CliCommand::Sweep { max_age_hours } => assert!(max_age_hours.is_none()),
        _ => panic!("expected Sweep"),
    }
    match parse(&["mtap", "sweep", "--max-age-hours", "6"]) {
        CliCommand::Sweep { max_age_hours } => assert_eq!(max_age_hours, Some(6)),
        _ => panic!("expected Sweep"),
    }
}
