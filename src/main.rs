use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tokio::runtime::Builder;
use tracing::{debug, info};

use dbretry::cli::{Cli, Commands};
use dbretry::config::ClientConfig;
use dbretry::request::Service;
use dbretry::simulation::{SimulationSpec, Simulator};
use dbretry::timeouts::duration_to_millis;

fn main() -> Result<()> {
    let num_cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    // Sleep-heavy workload; a few threads past the core count is enough
    let worker_threads = std::cmp::min(num_cpus + 2, 16);

    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => ClientConfig::load(path).await?,
        None => ClientConfig::default(),
    };
    let config = base.with_overrides(&cli.timeouts.to_overrides(), cli.strategy, cli.backoff_cap_ms)?;
    debug!("Effective configuration: {:?}", config);

    let simulator = Simulator::new(&config, cli.concurrent_requests);

    match &cli.command {
        Commands::Timeouts => {
            let table: serde_json::Map<String, serde_json::Value> = Service::ALL
                .iter()
                .map(|service| {
                    let ms = duration_to_millis(simulator.timeouts().timeout_for_service(*service));
                    (service.to_string(), ms.into())
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Commands::Plan {
            reason,
            service,
            non_idempotent,
            attempts,
        } => {
            info!("Planning {} decisions for {}", attempts, reason);
            for step in simulator.plan(*service, *reason, !non_idempotent, *attempts) {
                println!("{}", serde_json::to_string(&step)?);
            }
        }
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
            let spec = SimulationSpec {
                service: *service,
                operation: operation.clone(),
                reason: *reason,
                failures: *failures,
                requests: *requests,
                idempotent: !non_idempotent,
                latency: Duration::from_millis(*latency_ms),
                timeout: timeout_ms.map(Duration::from_millis),
            };
            for result in simulator.simulate(&spec).await {
                println!("{}", serde_json::to_string(&result)?);
            }
        }
    }

    Ok(())
}
