//! HTTP client commands against a running registry.

use anyhow::{bail, Context};

use svcwatch_api::{ConfigureServiceRequest, ServiceStatusReport, ServicesStatusResponse};
use svcwatch_protocols::{Service, ServicePatch, ServiceType};

/// Configuration flags collected from the command line.
#[derive(Debug, Default)]
pub(crate) struct PatchArgs {
    pub service_type: Option<String>,
    pub expected_period: Option<u64>,
    pub dead_after: Option<u64>,
    pub alerts: bool,
    pub no_alerts: bool,
    pub display_name: Option<String>,
    pub group: Option<String>,
}

pub(crate) fn build_patch(args: PatchArgs) -> anyhow::Result<ServicePatch> {
    let service_type = match args.service_type.as_deref() {
        Some(value) => match ServiceType::parse(value) {
            Some(service_type) => Some(service_type),
            None => bail!("unknown service type '{}' (expected cloud_service or local_job)", value),
        },
        None => None,
    };

    let alerts_enabled = match (args.alerts, args.no_alerts) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };

    Ok(ServicePatch {
        service_type,
        expected_period: args.expected_period,
        dead_after: args.dead_after,
        alerts_enabled,
        display_name: args.display_name,
        service_group: args.group,
        metadata: None,
    })
}

/// One table line, e.g. `api    | Status: alive   | Last seen: 42s        ago | Count: 12, interval: 60.0s`.
pub(crate) fn format_status_line(key: &str, report: &ServiceStatusReport) -> String {
    let status = report.status.map(|s| s.as_str()).unwrap_or("unknown");
    let interval = report
        .median_interval
        .map(|secs| format!(", interval: {:.1}s", secs))
        .unwrap_or_default();
    format!(
        "{:30} | Status: {:7} | Last seen: {:10} ago | Count: {}{}",
        key, status, report.time_since_last_heartbeat_readable, report.heartbeat_count, interval
    )
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Fetch `/status` and print a table.
pub(crate) async fn print_status(url: &str) -> anyhow::Result<()> {
    let response = reqwest::get(endpoint(url, "status"))
        .await
        .with_context(|| format!("requesting status from {}", url))?
        .error_for_status()?;
    let status: ServicesStatusResponse = response.json().await?;

    println!("\nServices Status:");
    println!("{}", "-".repeat(80));
    if status.services.is_empty() {
        println!("No services have reported in the last 7 days.");
        return Ok(());
    }
    for (key, report) in &status.services {
        println!("{}", format_status_line(key, report));
    }
    Ok(())
}

/// Send a configuration request and print the updated service.
pub(crate) async fn configure(url: &str, service_key: &str, patch: ServicePatch) -> anyhow::Result<()> {
    let request = ConfigureServiceRequest {
        service_key: service_key.to_string(),
        patch,
    };
    let response = reqwest::Client::new()
        .post(endpoint(url, "configure-service"))
        .json(&request)
        .send()
        .await
        .with_context(|| format!("sending configuration to {}", url))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("configuration rejected ({}): {}", status, body);
    }

    let service: Service = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&service)?);
    Ok(())
}
