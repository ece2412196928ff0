//! Burst command - Push a burst of calls through the request governor
//!
//! Every call is first checked against the per-endpoint guard and the global
//! window. Admitted calls go through the bounded queue; with `--send` they
//! are issued as GET requests, otherwise they only occupy a queue slot for
//! `--hold-ms`.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use dashkit_core::{config::Config, domain::Endpoint};
use dashkit_governor::RequestGovernor;
use serde_json::Value;
use tracing::{debug, info};

use super::build_client;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct BurstCommand {
    /// Endpoint the calls target, e.g. /analytics/revenue
    endpoint: Endpoint,

    /// Number of calls to attempt
    #[arg(short = 'n', long, default_value_t = 20)]
    count: u32,

    /// Pause between attempts, in milliseconds
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Issue admitted calls as real GET requests
    #[arg(long)]
    send: bool,

    /// How long a simulated call occupies its queue slot, in milliseconds
    #[arg(long, default_value_t = 50)]
    hold_ms: u64,
}

#[derive(Debug, Default)]
struct BurstReport {
    admitted: u32,
    denied: u32,
    succeeded: u32,
    failed: u32,
}

impl BurstCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format == OutputFormat::Json);
        let governor = RequestGovernor::from_config(&config.rate_limiting);
        let client = if self.send {
            Some(build_client(config)?.0)
        } else {
            None
        };

        info!(endpoint = %self.endpoint, count = self.count, send = self.send, "Starting burst");

        let mut report = BurstReport::default();
        let mut queued = Vec::new();

        for attempt in 0..self.count {
            if attempt > 0 && self.interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.interval_ms)).await;
            }

            if !governor.check_rate_limit(&self.endpoint) {
                report.denied += 1;
                debug!(attempt, "Call denied by governor");
                continue;
            }
            report.admitted += 1;

            let endpoint = self.endpoint.clone();
            let client = client.clone();
            let hold = Duration::from_millis(self.hold_ms);
            queued.push(governor.queue_request(move || async move {
                match client {
                    Some(client) => client.get::<Value>(endpoint.as_str()).await.map(|_| ()),
                    None => {
                        tokio::time::sleep(hold).await;
                        Ok(())
                    }
                }
            }));
        }

        for handle in queued {
            match handle.await {
                Ok(Ok(())) => report.succeeded += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    debug!(error = %e, "Queued call failed");
                }
                Err(e) => {
                    report.failed += 1;
                    debug!(error = %e, "Queued call dropped");
                }
            }
        }

        let remaining = governor.remaining_requests();
        let next_available = governor.next_available_in();

        if format == OutputFormat::Json {
            fmt.print_json(&serde_json::json!({
                "endpoint": self.endpoint.as_str(),
                "attempted": self.count,
                "admitted": report.admitted,
                "denied": report.denied,
                "succeeded": report.succeeded,
                "failed": report.failed,
                "remaining_requests": remaining,
                "next_available_ms": u64::try_from(next_available.as_millis()).unwrap_or(u64::MAX),
            }));
            return Ok(());
        }

        fmt.success(&format!(
            "Burst of {} call{} to {}",
            self.count,
            if self.count == 1 { "" } else { "s" },
            self.endpoint
        ));
        fmt.field("Admitted", &report.admitted.to_string());
        fmt.field("Denied", &report.denied.to_string());
        fmt.field("Succeeded", &report.succeeded.to_string());
        if report.failed > 0 {
            fmt.field("Failed", &report.failed.to_string());
        }
        fmt.field("Window remaining", &remaining.to_string());
        fmt.field(
            "Next slot in",
            &format!("{} ms", next_available.as_millis()),
        );
        Ok(())
    }
}
