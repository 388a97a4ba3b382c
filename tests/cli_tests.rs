use anyhow::Result;
use clap::Parser;
use dbretry::cli::{Cli, Commands};
use dbretry::config::StrategyKind;
use dbretry::reason::RetryReason;
use dbretry::request::Service;
use dbretry::timeouts::TimeoutOverrides;

#[test]
fn test_cli_timeouts_command() -> Result<()> {
    let cli = Cli::try_parse_from(["dbretry", "timeouts"])?;

    assert!(matches!(cli.command, Commands::Timeouts));
    assert!(cli.config.is_none());
    assert!(cli.strategy.is_none());
    assert_eq!(cli.concurrent_requests, 16); // Default value
    assert_eq!(cli.timeouts.to_overrides(), TimeoutOverrides::default());
    Ok(())
}

#[test]
fn test_cli_plan_command() -> Result<()> {
    let cli = Cli::try_parse_from([
        "dbretry",
        "plan",
        "--reason",
        "kv_not_my_vbucket",
        "--non-idempotent",
        "--attempts",
        "6",
    ])?;

    match &cli.command {
        Commands::Plan {
            reason,
            service,
            non_idempotent,
            attempts,
        } => {
            assert_eq!(*reason, RetryReason::KvNotMyVbucket);
            assert_eq!(*service, Service::KeyValue);
            assert!(*non_idempotent);
            assert_eq!(*attempts, 6);
        }
        _ => panic!("Expected Plan command"),
    }
    Ok(())
}

#[test]
fn test_cli_simulate_command() -> Result<()> {
    let cli = Cli::try_parse_from([
        "dbretry",
        "simulate",
        "--service",
        "query",
        "--reason",
        "query_index_not_found",
        "--failures",
        "2",
        "--requests",
        "10",
        "--timeout-ms",
        "1500",
    ])?;

    match &cli.command {
        Commands::Simulate {
            service,
            operation,
            reason,
            failures,
            requests,
            non_idempotent,
            latency_ms,
            timeout_ms,
        } => {
            assert_eq!(*service, Service::Query);
            assert_eq!(operation, "get");
            assert_eq!(*reason, RetryReason::QueryIndexNotFound);
            assert_eq!(*failures, 2);
            assert_eq!(*requests, 10);
            assert!(!*non_idempotent);
            assert_eq!(*latency_ms, 1);
            assert_eq!(*timeout_ms, Some(1500));
        }
        _ => panic!("Expected Simulate command"),
    }
    Ok(())
}

#[test]
fn test_cli_global_overrides_after_subcommand() -> Result<()> {
    let cli = Cli::try_parse_from([
        "dbretry",
        "timeouts",
        "--kv-timeout-ms",
        "7000",
        "--bucket-management-timeout-ms",
        "90000",
        "--strategy",
        "fail_fast",
        "--backoff-cap-ms",
        "25",
    ])?;

    let overrides = cli.timeouts.to_overrides();
    assert_eq!(overrides.key_value_timeout_ms, Some(7000));
    assert_eq!(overrides.bucket_management_timeout_ms, Some(90000));
    assert_eq!(overrides.query_timeout_ms, None);
    assert_eq!(cli.strategy, Some(StrategyKind::FailFast));
    assert_eq!(cli.backoff_cap_ms, Some(25));
    Ok(())
}

#[test]
fn test_cli_rejects_unknown_reason() {
    let result = Cli::try_parse_from(["dbretry", "plan", "--reason", "cosmic_rays"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_rejects_unknown_service() {
    let result = Cli::try_parse_from([
        "dbretry",
        "simulate",
        "--service",
        "eventing",
        "--reason",
        "kv_locked",
    ]);
    assert!(result.is_err());
}
